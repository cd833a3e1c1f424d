// SPDX-License-Identifier: CC0-1.0

//! Key expressions
//!
//! The key half of the descriptor grammar: raw public keys, x-only keys
//! (inside `tr`), WIF private keys and BIP32 extended keys, each optionally
//! prefixed with `[fingerprint/path]` origin information and, for extended
//! keys, suffixed with a derivation path whose final component may be a
//! wildcard.

use std::fmt;
use std::str::FromStr;

use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpriv, Xpub};
use bitcoin::hex::FromHex;
use bitcoin::key::{PrivateKey, PublicKey, XOnlyPublicKey};
use bitcoin::secp256k1::{All, Parity, Secp256k1};

use crate::slip132::{self, Bip32Format};
use crate::Error;

/// The kind of a parsed key expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DescriptorKeyType {
    /// A full public key, parsed from hex or recovered from a WIF private key.
    Public,
    /// An x-only public key, allowed only under `tr`.
    Schnorr,
    /// A BIP32 extended public key.
    Bip32Pub,
    /// A BIP32 extended private key.
    Bip32Priv,
}

/// Whether a key expression ends in a wildcard path component.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Wildcard {
    /// No wildcard.
    None,
    /// Unhardened wildcard, e.g. `*`.
    Unhardened,
    /// Hardened wildcard, e.g. `*'` or `*h`; valid for private keys only.
    Hardened,
}

/// An extended key with origin information and a fixed derivation prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorXKey<K> {
    /// Origin information, from the `[fingerprint/path]` prefix.
    pub origin: Option<(Fingerprint, DerivationPath)>,
    /// The undecorated extended key the expression started from.
    pub xkey: K,
    /// The fixed (wildcard-free) derivation path suffix.
    pub derivation_path: DerivationPath,
    /// The trailing wildcard, if any.
    pub wildcard: Wildcard,
    /// Script application signalled by the key's SLIP-132 version bytes.
    pub format: Bip32Format,
}

/// A parsed key expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorKey {
    /// A single full public key.
    Single {
        /// Origin information, if any.
        origin: Option<(Fingerprint, DerivationPath)>,
        /// The key itself; `compressed` reflects the source text or WIF flag.
        key: PublicKey,
    },
    /// A single x-only public key.
    Schnorr {
        /// Origin information, if any.
        origin: Option<(Fingerprint, DerivationPath)>,
        /// The key itself.
        key: XOnlyPublicKey,
    },
    /// An extended public key with derivation metadata.
    XPub(DescriptorXKey<Xpub>),
    /// An extended private key with derivation metadata.
    XPrv(DescriptorXKey<Xpriv>),
}

/// A wildcard argument as seen by key derivation.
#[derive(Copy, Clone, Debug)]
pub(crate) enum DeriveArg<'a> {
    /// The key has no wildcard; nothing to consume.
    None,
    /// The `"base"` sentinel: resolve to the undecorated base key.
    Base,
    /// A caller-supplied child index or sub-path.
    Index(&'a str),
}

impl DescriptorKey {
    /// Parses a key expression. `under_tr` must be set when the enclosing
    /// script context is `tr`, where keys are x-only.
    pub(crate) fn parse(s: &str, under_tr: bool, secp: &Secp256k1<All>) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::InvalidKey("empty key expression".to_owned()));
        }
        let (origin, key_part) = parse_origin(s)?;

        // BIP32 keys are recognized by their `pub`/`prv` infix before any
        // expensive decoding is attempted.
        let hdkey_top = if key_part.len() > 4 {
            key_part.get(1..4).unwrap_or("")
        } else {
            ""
        };
        if hdkey_top == "pub" || hdkey_top == "prv" {
            return Self::parse_bip32(origin, key_part, secp);
        }

        if let Ok(bytes) = Vec::<u8>::from_hex(key_part) {
            match bytes.len() {
                33 | 65 => {
                    if under_tr {
                        return Err(Error::InvalidKey(
                            "taproot accepts x-only public keys only".to_owned(),
                        ));
                    }
                    let key = PublicKey::from_slice(&bytes)
                        .map_err(|_| Error::InvalidKey(format!("invalid public key '{}'", key_part)))?;
                    return Ok(DescriptorKey::Single { origin, key });
                }
                32 if under_tr => {
                    let key = XOnlyPublicKey::from_slice(&bytes)
                        .map_err(|_| Error::InvalidKey(format!("invalid x-only key '{}'", key_part)))?;
                    return Ok(DescriptorKey::Schnorr { origin, key });
                }
                _ => {}
            }
        }

        // Not hex: the remaining possibility is a WIF private key.
        let privkey = PrivateKey::from_wif(key_part)
            .map_err(|_| Error::InvalidKey(format!("unrecognized key expression '{}'", key_part)))?;
        let key = privkey.public_key(secp);
        Ok(DescriptorKey::Single { origin, key })
    }

    fn parse_bip32(
        origin: Option<(Fingerprint, DerivationPath)>,
        key_part: &str,
        secp: &Secp256k1<All>,
    ) -> Result<Self, Error> {
        let mut segments = key_part.split('/');
        let base = segments.next().expect("split yields at least one element");

        let mut wildcard = Wildcard::None;
        let path = segments
            .filter_map(|seg| {
                if wildcard != Wildcard::None {
                    Some(Err(Error::WildcardMisuse(
                        "'*' may only appear as the final derivation step",
                    )))
                } else if seg == "*" {
                    wildcard = Wildcard::Unhardened;
                    None
                } else if seg == "*'" || seg == "*h" {
                    wildcard = Wildcard::Hardened;
                    None
                } else {
                    Some(ChildNumber::from_str(seg).map_err(|_| {
                        Error::Syntax(format!("invalid derivation step '{}'", seg))
                    }))
                }
            })
            .collect::<Result<DerivationPath, Error>>()?;

        let decoded = slip132::decode_xkey(base)?;
        if decoded.is_private {
            let xkey = Xpriv::decode(&decoded.data)?;
            // Validate the fixed prefix right away; a bad path should fail
            // at parse time, not at first evaluation.
            xkey.derive_priv(secp, &path)?;
            Ok(DescriptorKey::XPrv(DescriptorXKey {
                origin,
                xkey,
                derivation_path: path,
                wildcard,
                format: decoded.format,
            }))
        } else {
            if wildcard == Wildcard::Hardened {
                return Err(Error::WildcardMisuse(
                    "hardened wildcard requires an extended private key",
                ));
            }
            let xkey = Xpub::decode(&decoded.data)?;
            xkey.derive_pub(secp, &path)?;
            Ok(DescriptorKey::XPub(DescriptorXKey {
                origin,
                xkey,
                derivation_path: path,
                wildcard,
                format: decoded.format,
            }))
        }
    }

    /// The kind tag of this key.
    pub fn key_type(&self) -> DescriptorKeyType {
        match self {
            DescriptorKey::Single { .. } => DescriptorKeyType::Public,
            DescriptorKey::Schnorr { .. } => DescriptorKeyType::Schnorr,
            DescriptorKey::XPub(..) => DescriptorKeyType::Bip32Pub,
            DescriptorKey::XPrv(..) => DescriptorKeyType::Bip32Priv,
        }
    }

    /// Whether this key expression ends in a wildcard and therefore consumes
    /// one evaluation argument.
    pub fn has_wildcard(&self) -> bool {
        match self {
            DescriptorKey::Single { .. } | DescriptorKey::Schnorr { .. } => false,
            DescriptorKey::XPub(xk) => xk.wildcard != Wildcard::None,
            DescriptorKey::XPrv(xk) => xk.wildcard != Wildcard::None,
        }
    }

    /// Whether the key is an uncompressed public key. Witness and taproot
    /// scopes refuse descriptors containing one.
    pub fn is_uncompressed(&self) -> bool {
        match self {
            DescriptorKey::Single { key, .. } => !key.compressed,
            _ => false,
        }
    }

    /// The SLIP-132 format of the underlying extended key, `Normal` for
    /// single keys.
    pub fn format(&self) -> Bip32Format {
        match self {
            DescriptorKey::XPub(xk) => xk.format,
            DescriptorKey::XPrv(xk) => xk.format,
            _ => Bip32Format::Normal,
        }
    }

    /// Resolves this key to a concrete public key, consuming the supplied
    /// wildcard argument if the expression carries one.
    pub(crate) fn derive(&self, arg: DeriveArg, secp: &Secp256k1<All>) -> Result<KeyReference, Error> {
        match self {
            DescriptorKey::Single { origin, key } => Ok(KeyReference {
                kind: DescriptorKeyType::Public,
                pubkey: *key,
                format: Bip32Format::Normal,
                key_data: Some(KeyData {
                    fingerprint: origin.as_ref().map(|(fp, _)| *fp),
                    path: origin
                        .as_ref()
                        .map(|(_, p)| p.clone())
                        .unwrap_or_else(DerivationPath::master),
                    pubkey: *key,
                }),
            }),
            DescriptorKey::Schnorr { origin, key } => {
                let pubkey = PublicKey::new(key.public_key(Parity::Even));
                Ok(KeyReference {
                    kind: DescriptorKeyType::Schnorr,
                    pubkey,
                    format: Bip32Format::Normal,
                    key_data: Some(KeyData {
                        fingerprint: origin.as_ref().map(|(fp, _)| *fp),
                        path: origin
                            .as_ref()
                            .map(|(_, p)| p.clone())
                            .unwrap_or_else(DerivationPath::master),
                        pubkey,
                    }),
                })
            }
            DescriptorKey::XPub(xk) => {
                let (path, arg_had_subpath, is_base) = resolve_path(xk.derivation_path.clone(), xk.wildcard, arg)?;
                let derived = xk.xkey.derive_pub(secp, &path)?;
                let pubkey = PublicKey::new(derived.public_key);
                Ok(KeyReference {
                    kind: DescriptorKeyType::Bip32Pub,
                    pubkey,
                    format: xk.format,
                    key_data: key_data_for(&xk.origin, xk.xkey.fingerprint(), &path, pubkey, arg_had_subpath, is_base),
                })
            }
            DescriptorKey::XPrv(xk) => {
                let (path, arg_had_subpath, is_base) = resolve_path(xk.derivation_path.clone(), xk.wildcard, arg)?;
                let derived = xk.xkey.derive_priv(secp, &path)?;
                let xpub = Xpub::from_priv(secp, &derived);
                let pubkey = PublicKey::new(xpub.public_key);
                Ok(KeyReference {
                    kind: DescriptorKeyType::Bip32Priv,
                    pubkey,
                    format: xk.format,
                    key_data: key_data_for(&xk.origin, xk.xkey.fingerprint(secp), &path, pubkey, arg_had_subpath, is_base),
                })
            }
        }
    }
}

/// Computes the fixed-plus-argument derivation path for an extended key.
///
/// Returns the path to derive, whether the argument contained a sub-path
/// (`/`-separated) and whether the `"base"` sentinel was used.
fn resolve_path(
    fixed: DerivationPath,
    wildcard: Wildcard,
    arg: DeriveArg,
) -> Result<(DerivationPath, bool, bool), Error> {
    match arg {
        DeriveArg::None => Ok((fixed, false, false)),
        DeriveArg::Base => Ok((DerivationPath::master(), false, true)),
        DeriveArg::Index(s) => {
            let mut steps: Vec<ChildNumber> = fixed.into();
            let had_subpath = s.contains('/');
            for seg in s.split('/') {
                let step = if wildcard == Wildcard::Hardened && !had_subpath {
                    // A plain index fills a hardened wildcard as a hardened
                    // child; explicit markers are honored either way.
                    match seg.parse::<u32>() {
                        Ok(n) => ChildNumber::from_hardened_idx(n)
                            .map_err(|_| Error::ArgumentMalformed(seg.to_owned()))?,
                        Err(_) => ChildNumber::from_str(seg)
                            .map_err(|_| Error::ArgumentMalformed(seg.to_owned()))?,
                    }
                } else {
                    ChildNumber::from_str(seg)
                        .map_err(|_| Error::ArgumentMalformed(seg.to_owned()))?
                };
                steps.push(step);
            }
            Ok((steps.into(), had_subpath, false))
        }
    }
}

fn key_data_for(
    origin: &Option<(Fingerprint, DerivationPath)>,
    own_fingerprint: Fingerprint,
    derived_path: &DerivationPath,
    pubkey: PublicKey,
    arg_had_subpath: bool,
    is_base: bool,
) -> Option<KeyData> {
    // A sub-path argument or the base sentinel cannot be folded into a
    // single child number, so no key data is reported for them.
    if arg_had_subpath || is_base {
        return None;
    }
    let (fingerprint, full_path) = match origin {
        Some((fp, origin_path)) => (*fp, origin_path.extend(derived_path)),
        None => (own_fingerprint, derived_path.clone()),
    };
    Some(KeyData { fingerprint: Some(fingerprint), path: full_path, pubkey })
}

/// A key resolved during evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyReference {
    kind: DescriptorKeyType,
    pubkey: PublicKey,
    format: Bip32Format,
    key_data: Option<KeyData>,
}

impl KeyReference {
    /// The kind of key expression this reference was resolved from.
    pub fn key_type(&self) -> DescriptorKeyType { self.kind }

    /// The resolved public key.
    pub fn public_key(&self) -> &PublicKey { &self.pubkey }

    /// The x-only form of the resolved key, as used in taproot outputs.
    pub fn x_only_public_key(&self) -> XOnlyPublicKey { XOnlyPublicKey::from(self.pubkey.inner) }

    /// The SLIP-132 format of the source extended key.
    pub fn format(&self) -> Bip32Format { self.format }

    /// Origin and derivation data, when the resolution is expressible as a
    /// master fingerprint plus a concrete path.
    pub fn key_data(&self) -> Option<&KeyData> { self.key_data.as_ref() }
}

/// A resolved key together with its provenance: master fingerprint and the
/// full derivation path from that master.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyData {
    fingerprint: Option<Fingerprint>,
    path: DerivationPath,
    pubkey: PublicKey,
}

impl KeyData {
    /// The master fingerprint, if one is known.
    pub fn master_fingerprint(&self) -> Option<Fingerprint> { self.fingerprint }

    /// Full derivation path from the master key.
    pub fn full_derivation_path(&self) -> &DerivationPath { &self.path }

    /// The derived public key.
    pub fn public_key(&self) -> &PublicKey { &self.pubkey }
}

/// Splits the `[fingerprint/path]` origin prefix off a key expression.
fn parse_origin(s: &str) -> Result<(Option<(Fingerprint, DerivationPath)>, &str), Error> {
    if !s.starts_with('[') {
        return Ok((None, s));
    }
    let close = s
        .find(']')
        .ok_or_else(|| Error::Syntax("unclosed '[' in key origin".to_owned()))?;
    let rest = &s[close + 1..];
    if rest.contains(']') {
        return Err(Error::Syntax("multiple ']' in key expression".to_owned()));
    }

    let mut parts = s[1..close].split('/');
    let fingerprint_hex = parts.next().unwrap_or("");
    if fingerprint_hex.len() != 8 {
        return Err(Error::Syntax(
            "origin fingerprint must be 8 hex characters".to_owned(),
        ));
    }
    let fingerprint = Fingerprint::from_str(fingerprint_hex)
        .map_err(|_| Error::Syntax("malformed origin fingerprint".to_owned()))?;
    let path = parts
        .map(ChildNumber::from_str)
        .collect::<Result<DerivationPath, _>>()
        .map_err(|_| Error::Syntax("malformed origin derivation path".to_owned()))?;

    Ok((Some((fingerprint, path)), rest))
}

fn fmt_origin(
    f: &mut fmt::Formatter,
    origin: &Option<(Fingerprint, DerivationPath)>,
) -> fmt::Result {
    if let Some((fingerprint, path)) = origin {
        write!(f, "[{}", fingerprint)?;
        for child in path {
            write!(f, "/{}", child)?;
        }
        f.write_str("]")?;
    }
    Ok(())
}

impl fmt::Display for DescriptorKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DescriptorKey::Single { origin, key } => {
                fmt_origin(f, origin)?;
                key.fmt(f)
            }
            DescriptorKey::Schnorr { origin, key } => {
                fmt_origin(f, origin)?;
                key.fmt(f)
            }
            DescriptorKey::XPub(xk) => {
                fmt_origin(f, &xk.origin)?;
                xk.xkey.fmt(f)?;
                for child in &xk.derivation_path {
                    write!(f, "/{}", child)?;
                }
                match xk.wildcard {
                    Wildcard::None => Ok(()),
                    Wildcard::Unhardened => f.write_str("/*"),
                    Wildcard::Hardened => f.write_str("/*h"),
                }
            }
            DescriptorKey::XPrv(xk) => {
                fmt_origin(f, &xk.origin)?;
                xk.xkey.fmt(f)?;
                for child in &xk.derivation_path {
                    write!(f, "/{}", child)?;
                }
                match xk.wildcard {
                    Wildcard::None => Ok(()),
                    Wildcard::Unhardened => f.write_str("/*"),
                    Wildcard::Hardened => f.write_str("/*h"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secp() -> Secp256k1<All> { Secp256k1::new() }

    #[test]
    fn parse_raw_pubkey() {
        let key = DescriptorKey::parse(
            "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
            false,
            &secp(),
        )
        .unwrap();
        assert_eq!(key.key_type(), DescriptorKeyType::Public);
        assert!(!key.is_uncompressed());
        assert!(!key.has_wildcard());
    }

    #[test]
    fn parse_uncompressed_pubkey() {
        let key = DescriptorKey::parse(
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
            false,
            &secp(),
        )
        .unwrap();
        assert!(key.is_uncompressed());
    }

    #[test]
    fn xonly_needs_taproot_scope() {
        let hex = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";
        assert!(DescriptorKey::parse(hex, true, &secp()).is_ok());
        assert!(DescriptorKey::parse(hex, false, &secp()).is_err());
    }

    #[test]
    fn full_key_rejected_under_taproot() {
        let err = DescriptorKey::parse(
            "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
            true,
            &secp(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn parse_xpub_with_origin_and_wildcard() {
        let key = DescriptorKey::parse(
            "[d34db33f/44'/0'/0']xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/1/*",
            false,
            &secp(),
        )
        .unwrap();
        assert_eq!(key.key_type(), DescriptorKeyType::Bip32Pub);
        assert!(key.has_wildcard());
        assert_eq!(key.format(), Bip32Format::Normal);
    }

    #[test]
    fn wildcard_must_be_terminal() {
        let err = DescriptorKey::parse(
            "xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/1/*/44",
            false,
            &secp(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WildcardMisuse(_)));
    }

    #[test]
    fn hardened_wildcard_is_private_only() {
        let err = DescriptorKey::parse(
            "xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/1/*h",
            false,
            &secp(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::WildcardMisuse(_)));

        assert!(DescriptorKey::parse(
            "tprv8ZgxMBicQKsPcwcD4gSnMti126ZiETsuX7qwrtMypr6FBwAP65puFn4v6c3jrN9VwtMRMph6nyT63NrfUL4C3nBzPcduzVSuHD7zbX2JKVc/0'/*'",
            false,
            &secp(),
        )
        .is_ok());
    }

    #[test]
    fn hardened_path_on_xpub_fails_at_parse() {
        let err = DescriptorKey::parse(
            "xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/1'/2",
            false,
            &secp(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Bip32(_)));
    }

    #[test]
    fn malformed_origins() {
        let secp = secp();
        for bad in [
            "[NonHexor]xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL",
            "[78412e3a]]03f28773c2d975288bc7d1d205c3748651b075fbc6610e58cddeeddf8f19405aa8",
            "[78412e3a/44'/0'/0'03f28773c2d975288bc7d1d205c3748651b075fbc6610e58cddeeddf8f19405aa8",
        ] {
            let err = DescriptorKey::parse(bad, false, &secp).unwrap_err();
            assert!(matches!(err, Error::Syntax(_)), "{}: {:?}", bad, err);
        }
    }

    #[test]
    fn wif_key_resolves_to_pubkey() {
        let key = DescriptorKey::parse(
            "L4rK1yDtCWekvXuE6oXD9jCYfFNV2cWRpVuPLBcCU2z8TrisoyY1",
            false,
            &secp(),
        )
        .unwrap();
        assert_eq!(key.key_type(), DescriptorKeyType::Public);
        assert!(!key.is_uncompressed());
    }

    #[test]
    fn wildcard_derivation_order() {
        let secp = secp();
        let key = DescriptorKey::parse(
            "xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/0/*",
            false,
            &secp,
        )
        .unwrap();

        let at_one = key.derive(DeriveArg::Index("1"), &secp).unwrap();
        let data = at_one.key_data().unwrap();
        let expected: DerivationPath = vec![
            ChildNumber::from_normal_idx(0).unwrap(),
            ChildNumber::from_normal_idx(1).unwrap(),
        ]
        .into();
        assert_eq!(data.full_derivation_path(), &expected);

        // Sub-path arguments derive but report no single-child key data.
        let sub = key.derive(DeriveArg::Index("1/2"), &secp).unwrap();
        assert!(sub.key_data().is_none());

        // The base sentinel skips the fixed prefix entirely.
        let base = key.derive(DeriveArg::Base, &secp).unwrap();
        assert!(base.key_data().is_none());
        assert_ne!(base.public_key(), at_one.public_key());
    }

    #[test]
    fn slip132_key_reports_format() {
        let key = DescriptorKey::parse(
            "zpub6qUQGY8YyN3ZztQBDdN8gUrFNvgCdTdFyTNorQ79VfkfkmhMR6D4cHBZ4EnXdFog1e2ugyCJqTcyDE4ZpTGqcMiCEnyPEyJFKbPVL9knhKU",
            false,
            &secp(),
        )
        .unwrap();
        assert_eq!(key.format(), Bip32Format::Bip84);
    }
}
