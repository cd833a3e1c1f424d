// SPDX-License-Identifier: CC0-1.0

//! Address prefixes and rendering
//!
//! Descriptors do not need addresses to parse, but `addr(...)` bodies must
//! be decoded against some network and every script reference can render an
//! address form. Rather than hardcoding the bitcoin networks, the engine
//! carries a small prefix table so the same logic serves Elements/Liquid
//! descriptors (`Descriptor::parse_elements`).

use core::fmt;

use bech32::{segwit, Fe32, Hrp};
use bitcoin::base58;
use bitcoin::blockdata::opcodes;
use bitcoin::blockdata::script::{Script, ScriptBuf};
use bitcoin::hashes::Hash;
use bitcoin::{PubkeyHash, ScriptHash, WitnessProgram, WitnessVersion};

use crate::Error;

/// Address prefixes for one network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AddressParams {
    /// Base58 version byte for P2PKH addresses.
    pub p2pkh_prefix: u8,
    /// Base58 version byte for P2SH addresses.
    pub p2sh_prefix: u8,
    /// Bech32 human-readable part for witness addresses.
    pub bech32_hrp: &'static str,
}

impl AddressParams {
    /// Bitcoin mainnet.
    pub const BITCOIN: AddressParams =
        AddressParams { p2pkh_prefix: 0x00, p2sh_prefix: 0x05, bech32_hrp: "bc" };
    /// Bitcoin testnet and signet.
    pub const TESTNET: AddressParams =
        AddressParams { p2pkh_prefix: 0x6f, p2sh_prefix: 0xc4, bech32_hrp: "tb" };
    /// Bitcoin regtest.
    pub const REGTEST: AddressParams =
        AddressParams { p2pkh_prefix: 0x6f, p2sh_prefix: 0xc4, bech32_hrp: "bcrt" };
    /// The Liquid production network.
    pub const LIQUID_V1: AddressParams =
        AddressParams { p2pkh_prefix: 57, p2sh_prefix: 39, bech32_hrp: "ex" };
    /// Elements regtest.
    pub const ELEMENTS_REGTEST: AddressParams =
        AddressParams { p2pkh_prefix: 235, p2sh_prefix: 75, bech32_hrp: "ert" };
}

/// The address family a script reference resolves to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// Pay to pubkey hash.
    P2pkh,
    /// Pay to script hash.
    P2sh,
    /// P2WPKH nested in P2SH.
    P2shP2wpkh,
    /// P2WSH nested in P2SH.
    P2shP2wsh,
    /// Native pay to witness pubkey hash.
    P2wpkh,
    /// Native pay to witness script hash.
    P2wsh,
    /// Taproot (witness v1).
    Taproot,
    /// A bare script (pay-to-pubkey or bare multisig) with no address form.
    Bare,
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            AddressType::P2pkh => "p2pkh",
            AddressType::P2sh => "p2sh",
            AddressType::P2shP2wpkh => "p2sh-p2wpkh",
            AddressType::P2shP2wsh => "p2sh-p2wsh",
            AddressType::P2wpkh => "p2wpkh",
            AddressType::P2wsh => "p2wsh",
            AddressType::Taproot => "p2tr",
            AddressType::Bare => "bare",
        })
    }
}

/// Classifies a locking script by shape, without redeem script knowledge.
pub(crate) fn classify(script: &Script) -> Option<AddressType> {
    if script.is_p2pkh() {
        Some(AddressType::P2pkh)
    } else if script.is_p2sh() {
        Some(AddressType::P2sh)
    } else if script.is_p2wpkh() {
        Some(AddressType::P2wpkh)
    } else if script.is_p2wsh() {
        Some(AddressType::P2wsh)
    } else if script.is_p2tr() {
        Some(AddressType::Taproot)
    } else if is_bare(script) {
        Some(AddressType::Bare)
    } else {
        None
    }
}

/// Whether the script is a bare pay-to-pubkey or bare multisig, which have
/// no address form.
pub(crate) fn is_bare(script: &Script) -> bool {
    script.is_p2pk()
        || script.as_bytes().last() == Some(&opcodes::all::OP_CHECKMULTISIG.to_u8())
}

/// Renders the address of a locking script under the given prefix table.
pub(crate) fn encode(script: &Script, params: &AddressParams) -> Result<String, Error> {
    let bytes = script.as_bytes();
    if script.is_p2pkh() {
        let mut payload = [0u8; 21];
        payload[0] = params.p2pkh_prefix;
        payload[1..].copy_from_slice(&bytes[3..23]);
        Ok(base58::encode_check(&payload))
    } else if script.is_p2sh() {
        let mut payload = [0u8; 21];
        payload[0] = params.p2sh_prefix;
        payload[1..].copy_from_slice(&bytes[2..22]);
        Ok(base58::encode_check(&payload))
    } else if let Some(version) = script.witness_version() {
        let hrp = Hrp::parse(params.bech32_hrp)
            .map_err(|_| Error::Address("invalid bech32 prefix".to_owned()))?;
        let fe = Fe32::try_from(version.to_num()).expect("witness version is 0..=16");
        segwit::encode(hrp, fe, &bytes[2..])
            .map_err(|_| Error::Address("invalid witness program length".to_owned()))
    } else {
        Err(Error::Address(
            "locking script has no address form".to_owned(),
        ))
    }
}

/// Parses an address into its locking script, verifying the prefix table.
pub(crate) fn decode(s: &str, params: &AddressParams) -> Result<ScriptBuf, Error> {
    if let Ok((hrp, version, program)) = segwit::decode(s) {
        let expected = Hrp::parse(params.bech32_hrp)
            .map_err(|_| Error::Address("invalid bech32 prefix".to_owned()))?;
        if hrp != expected {
            return Err(Error::Address(format!(
                "address '{}' is for another network",
                s
            )));
        }
        let version = WitnessVersion::try_from(version.to_u8())
            .map_err(|_| Error::Address(format!("bad witness version in '{}'", s)))?;
        let program = WitnessProgram::new(version, &program)
            .map_err(|_| Error::Address(format!("bad witness program in '{}'", s)))?;
        return Ok(ScriptBuf::new_witness_program(&program));
    }

    let payload = base58::decode_check(s)
        .map_err(|_| Error::Address(format!("unparseable address '{}'", s)))?;
    if payload.len() != 21 {
        return Err(Error::Address(format!("unparseable address '{}'", s)));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    if payload[0] == params.p2pkh_prefix {
        Ok(ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(hash)))
    } else if payload[0] == params.p2sh_prefix {
        Ok(ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(hash)))
    } else {
        Err(Error::Address(format!(
            "address '{}' is for another network",
            s
        )))
    }
}
