// SPDX-License-Identifier: CC0-1.0

//! # Bitcoin Output Descriptors
//!
//! A parser and evaluator for the output-descriptor language used by
//! Bitcoin Core and BIP-380..386 to describe scriptPubKeys in a compact,
//! checksummed, human-readable form, e.g.
//! `wsh(multi(2,xpub.../0/*,xpub.../0/*))#checksum`.
//!
//! A descriptor string parses into a [`Descriptor`], which evaluates into
//! concrete locking scripts, addresses, resolved keys and structural
//! reflection (redeem scripts, required-signature counts, taproot script
//! trees). BIP32 wildcards (`/*`) are resolved at evaluation time from
//! caller-supplied child indices, consumed in left-to-right descriptor
//! order.
//!
//! ```
//! use bitcoin_descriptor::Descriptor;
//!
//! let desc = Descriptor::parse(
//!     "wpkh(02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9)",
//! )?;
//! assert_eq!(desc.need_argument_num(), 0);
//! assert!(desc.locking_script()?.is_p2wpkh());
//! # Ok::<(), bitcoin_descriptor::Error>(())
//! ```
//!
//! Elliptic-curve operations, BIP32 derivation and script primitives come
//! from the [`bitcoin`] crate; the descriptor checksum engine and address
//! encoding build on [`bech32`]; miniscript fragments inside `wsh`/`sh`/`tr`
//! are compiled by the [`miniscript`] crate.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// Coding conventions
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::{error, fmt};

use bitcoin::bip32;
use bitcoin::secp256k1;

pub mod address;
pub mod checksum;
mod compiler;
pub mod descriptor;
pub mod key;
mod node;
mod reference;
pub mod slip132;
mod taptree;

pub use crate::address::{AddressParams, AddressType};
pub use crate::descriptor::Descriptor;
pub use crate::key::{
    DescriptorKey, DescriptorKeyType, DescriptorXKey, KeyData, KeyReference, Wildcard,
};
pub use crate::node::ScriptType;
pub use crate::reference::ScriptReference;
pub use crate::slip132::Bip32Format;
pub use crate::taptree::TapTreeInfo;

/// Argument sentinel: resolve every BIP32 key to its undecorated base
/// extended key, skipping both argument consumption and derivation.
pub const ARGUMENT_BASE_EXTKEY: &str = "base";

/// Descriptor parsing or evaluation error.
#[derive(Debug)]
pub enum Error {
    /// Missing or extra `#`, wrong checksum length, or a character outside
    /// the descriptor alphabet.
    ChecksumFormat(String),
    /// The supplied checksum does not match the computed one.
    ChecksumMismatch {
        /// The checksum computed over the descriptor body.
        expected: String,
        /// The checksum found in the input.
        found: String,
    },
    /// Unbalanced brackets, empty bodies, malformed origins and the like.
    Syntax(String),
    /// A name which is neither a script operator nor an acceptable
    /// miniscript fragment.
    UnknownOperator(String),
    /// A placement rule violation, e.g. `wsh` under `pkh`.
    InvalidComposition(String),
    /// Not a public key, x-only key, WIF key, xpub or xprv.
    InvalidKey(String),
    /// A non-terminal wildcard, or a hardened wildcard on an xpub.
    WildcardMisuse(&'static str),
    /// An uncompressed public key inside a witness or taproot scope.
    UncompressedInWitness,
    /// A BIP49/BIP84 extended key used in an incompatible script form.
    BipFormatMismatch(&'static str),
    /// A redeem script or multisig key count over its limit.
    SizeExceeded {
        /// The offending size.
        size: usize,
        /// The applicable limit.
        limit: usize,
    },
    /// A wildcard is present but no argument was supplied for it.
    ArgumentMissing,
    /// A malformed evaluation argument, e.g. a sub-path where a plain child
    /// index is required.
    ArgumentMalformed(String),
    /// An address that cannot be decoded or rendered under the descriptor's
    /// prefix table.
    Address(String),
    /// BIP32 derivation failure.
    Bip32(bip32::Error),
    /// Invalid key material.
    Secp(secp256k1::Error),
    /// The external miniscript compiler rejected a fragment.
    Miniscript(miniscript::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ChecksumFormat(ref s) => write!(f, "checksum format: {}", s),
            Error::ChecksumMismatch { ref expected, ref found } => {
                write!(f, "invalid checksum '{}', expected '{}'", found, expected)
            }
            Error::Syntax(ref s) => write!(f, "syntax error: {}", s),
            Error::UnknownOperator(ref s) => write!(f, "unknown script operator '{}'", s),
            Error::InvalidComposition(ref s) => write!(f, "invalid composition: {}", s),
            Error::InvalidKey(ref s) => write!(f, "invalid key: {}", s),
            Error::WildcardMisuse(s) => write!(f, "wildcard misuse: {}", s),
            Error::UncompressedInWitness => {
                f.write_str("uncompressed public keys are unavailable in witness scripts")
            }
            Error::BipFormatMismatch(s) => write!(f, "bip32 format mismatch: {}", s),
            Error::SizeExceeded { size, limit } => {
                write!(f, "size {} exceeds limit {}", size, limit)
            }
            Error::ArgumentMissing => f.write_str("missing argument for wildcard"),
            Error::ArgumentMalformed(ref s) => write!(f, "malformed argument '{}'", s),
            Error::Address(ref s) => write!(f, "address error: {}", s),
            Error::Bip32(ref e) => fmt::Display::fmt(e, f),
            Error::Secp(ref e) => fmt::Display::fmt(e, f),
            Error::Miniscript(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Bip32(ref e) => Some(e),
            Error::Secp(ref e) => Some(e),
            Error::Miniscript(ref e) => Some(e),
            _ => None,
        }
    }
}

#[doc(hidden)]
impl From<bip32::Error> for Error {
    fn from(e: bip32::Error) -> Error { Error::Bip32(e) }
}

#[doc(hidden)]
impl From<secp256k1::Error> for Error {
    fn from(e: secp256k1::Error) -> Error { Error::Secp(e) }
}

#[doc(hidden)]
impl From<miniscript::Error> for Error {
    fn from(e: miniscript::Error) -> Error { Error::Miniscript(e) }
}
