// SPDX-License-Identifier: CC0-1.0

//! SLIP-132 extended key versions
//!
//! Wallets serialize BIP32 extended keys under alternative version bytes to
//! signal the intended script type: `ypub`/`upub` for P2WPKH-in-P2SH (BIP49)
//! and `zpub`/`vpub` for native P2WPKH (BIP84), with private twins. The
//! descriptor engine accepts all of them, remembers the signalled format and
//! re-encodes to the standard BIP32 version bytes before decoding.

use bitcoin::base58;
use bitcoin::NetworkKind;

use crate::Error;

/// Version bytes for xpub: mainnet public key, legacy scripts.
pub const VERSION_MAGIC_XPUB: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
/// Version bytes for xprv: mainnet private key, legacy scripts.
pub const VERSION_MAGIC_XPRV: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
/// Version bytes for ypub: mainnet public key for P2WPKH in P2SH.
pub const VERSION_MAGIC_YPUB: [u8; 4] = [0x04, 0x9D, 0x7C, 0xB2];
/// Version bytes for yprv: mainnet private key for P2WPKH in P2SH.
pub const VERSION_MAGIC_YPRV: [u8; 4] = [0x04, 0x9D, 0x78, 0x78];
/// Version bytes for zpub: mainnet public key for P2WPKH.
pub const VERSION_MAGIC_ZPUB: [u8; 4] = [0x04, 0xB2, 0x47, 0x46];
/// Version bytes for zprv: mainnet private key for P2WPKH.
pub const VERSION_MAGIC_ZPRV: [u8; 4] = [0x04, 0xB2, 0x43, 0x0C];
/// Version bytes for tpub: testnet/regtest public key, legacy scripts.
pub const VERSION_MAGIC_TPUB: [u8; 4] = [0x04, 0x35, 0x87, 0xCF];
/// Version bytes for tprv: testnet/regtest private key, legacy scripts.
pub const VERSION_MAGIC_TPRV: [u8; 4] = [0x04, 0x35, 0x83, 0x94];
/// Version bytes for upub: testnet/regtest public key for P2WPKH in P2SH.
pub const VERSION_MAGIC_UPUB: [u8; 4] = [0x04, 0x4A, 0x52, 0x62];
/// Version bytes for uprv: testnet/regtest private key for P2WPKH in P2SH.
pub const VERSION_MAGIC_UPRV: [u8; 4] = [0x04, 0x4A, 0x4E, 0x28];
/// Version bytes for vpub: testnet/regtest public key for P2WPKH.
pub const VERSION_MAGIC_VPUB: [u8; 4] = [0x04, 0x5F, 0x1C, 0xF6];
/// Version bytes for vprv: testnet/regtest private key for P2WPKH.
pub const VERSION_MAGIC_VPRV: [u8; 4] = [0x04, 0x5F, 0x18, 0xBC];

/// The script application signalled by an extended key's version bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bip32Format {
    /// `xpub`/`xprv`/`tpub`/`tprv`: no script restriction.
    Normal,
    /// `ypub`/`yprv`/`upub`/`uprv`: P2WPKH nested in P2SH.
    Bip49,
    /// `zpub`/`zprv`/`vpub`/`vprv`: native P2WPKH.
    Bip84,
}

/// A SLIP-132 decoded extended key, re-encoded under standard version bytes.
pub(crate) struct DecodedXKey {
    /// 78 raw bytes with the standard BIP32 version bytes substituted in.
    pub data: Vec<u8>,
    /// The format signalled by the original version bytes.
    pub format: Bip32Format,
    /// Whether this is a private extended key.
    pub is_private: bool,
}

/// Decodes a base58 extended key of any recognized SLIP-132 flavor.
pub(crate) fn decode_xkey(s: &str) -> Result<DecodedXKey, Error> {
    let mut data = base58::decode_check(s)
        .map_err(|_| Error::InvalidKey(format!("malformed extended key '{}'", s)))?;
    if data.len() != 78 {
        return Err(Error::InvalidKey(format!(
            "extended key of {} bytes, expected 78",
            data.len()
        )));
    }

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&data[..4]);
    let (network, format, is_private) = match magic {
        VERSION_MAGIC_XPUB => (NetworkKind::Main, Bip32Format::Normal, false),
        VERSION_MAGIC_XPRV => (NetworkKind::Main, Bip32Format::Normal, true),
        VERSION_MAGIC_YPUB => (NetworkKind::Main, Bip32Format::Bip49, false),
        VERSION_MAGIC_YPRV => (NetworkKind::Main, Bip32Format::Bip49, true),
        VERSION_MAGIC_ZPUB => (NetworkKind::Main, Bip32Format::Bip84, false),
        VERSION_MAGIC_ZPRV => (NetworkKind::Main, Bip32Format::Bip84, true),
        VERSION_MAGIC_TPUB => (NetworkKind::Test, Bip32Format::Normal, false),
        VERSION_MAGIC_TPRV => (NetworkKind::Test, Bip32Format::Normal, true),
        VERSION_MAGIC_UPUB => (NetworkKind::Test, Bip32Format::Bip49, false),
        VERSION_MAGIC_UPRV => (NetworkKind::Test, Bip32Format::Bip49, true),
        VERSION_MAGIC_VPUB => (NetworkKind::Test, Bip32Format::Bip84, false),
        VERSION_MAGIC_VPRV => (NetworkKind::Test, Bip32Format::Bip84, true),
        _ => {
            return Err(Error::InvalidKey(format!(
                "unknown extended key version bytes {:02x}{:02x}{:02x}{:02x}",
                magic[0], magic[1], magic[2], magic[3]
            )))
        }
    };

    let standard = match (network, is_private) {
        (NetworkKind::Main, false) => VERSION_MAGIC_XPUB,
        (NetworkKind::Main, true) => VERSION_MAGIC_XPRV,
        (NetworkKind::Test, false) => VERSION_MAGIC_TPUB,
        (NetworkKind::Test, true) => VERSION_MAGIC_TPRV,
    };
    data[..4].copy_from_slice(&standard);

    Ok(DecodedXKey { data, format, is_private })
}
