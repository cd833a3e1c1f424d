// SPDX-License-Identifier: CC0-1.0

//! Output descriptors
//!
//! The public face of the engine: parse a descriptor string (with optional
//! checksum) into a [`Descriptor`], then evaluate it into locking scripts,
//! script references and key data. A parsed descriptor is immutable and may
//! be shared freely across threads; every evaluation owns its own argument
//! cursor.

use std::fmt;
use std::str::FromStr;

use bitcoin::secp256k1::Secp256k1;
use bitcoin::ScriptBuf;

use crate::address::AddressParams;
use crate::key::KeyData;
use crate::node::{self, DescriptorNode, ScriptType};
use crate::reference::{self, ArgMode, ScriptReference};
use crate::{checksum, Error};

/// A parsed output descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    root: DescriptorNode,
    params: AddressParams,
}

impl Descriptor {
    /// Parses a descriptor string against the bitcoin mainnet prefix table.
    ///
    /// A trailing `#checksum` is verified when present; parsing also runs a
    /// full probe evaluation so that every invalid descriptor is rejected
    /// here rather than at first use.
    pub fn parse(descriptor: &str) -> Result<Descriptor, Error> {
        Descriptor::parse_with_params(descriptor, AddressParams::BITCOIN)
    }

    /// Parses a descriptor string against an explicit prefix table.
    pub fn parse_with_params(
        descriptor: &str,
        params: AddressParams,
    ) -> Result<Descriptor, Error> {
        let secp = Secp256k1::new();
        let body = checksum::verify_checksum(descriptor)?;
        let root = DescriptorNode::parse(body, &params, &secp)?;
        Ok(Descriptor { root, params })
    }

    /// Parses a descriptor string against the Liquid v1 prefix table.
    pub fn parse_elements(descriptor: &str) -> Result<Descriptor, Error> {
        Descriptor::parse_with_params(descriptor, AddressParams::LIQUID_V1)
    }

    /// Builds a descriptor programmatically from a wrap list and key
    /// expressions, by forming the text and re-parsing it, so exactly the
    /// same invariants apply.
    ///
    /// `types` is ordered outermost first (e.g. `[Sh, Wsh, Multi]` for
    /// `sh(wsh(multi(...)))`); `require_num` is the multisig threshold.
    pub fn create(
        types: &[ScriptType],
        keys: &[String],
        require_num: u32,
        params: AddressParams,
    ) -> Result<Descriptor, Error> {
        if types.is_empty() {
            return Err(Error::Syntax("script type list is empty".to_owned()));
        }

        let mut text = String::new();
        for script_type in types.iter().rev() {
            let name = node::operator_name(*script_type).ok_or_else(|| {
                Error::InvalidComposition(format!(
                    "{:?} cannot be built programmatically",
                    script_type
                ))
            })?;

            let key_text = if text.is_empty() { keys.join(",") } else { String::new() };
            match script_type {
                ScriptType::Pk
                | ScriptType::Pkh
                | ScriptType::Wpkh
                | ScriptType::Combo
                | ScriptType::Multi
                | ScriptType::SortedMulti => {
                    if !text.is_empty() {
                        return Err(Error::InvalidComposition(
                            "key script forms are innermost only".to_owned(),
                        ));
                    }
                    if key_text.is_empty() {
                        return Err(Error::Syntax("key list is empty".to_owned()));
                    }
                    if !node::is_multisig_type(*script_type) && keys.len() > 1 {
                        return Err(Error::InvalidComposition(
                            "multiple keys require a multisig form".to_owned(),
                        ));
                    }
                }
                ScriptType::Sh | ScriptType::Wsh => {
                    if text.is_empty() {
                        return Err(Error::InvalidComposition(
                            "script-hash forms wrap another script".to_owned(),
                        ));
                    }
                }
                _ => {
                    return Err(Error::InvalidComposition(format!(
                        "{:?} cannot be built programmatically",
                        script_type
                    )));
                }
            }

            text = if key_text.is_empty() {
                format!("{}({})", name, text)
            } else if node::is_multisig_type(*script_type) {
                format!("{}({},{})", name, require_num, key_text)
            } else {
                format!("{}({})", name, key_text)
            };
        }

        Descriptor::parse_with_params(&text, params)
    }

    /// The number of wildcard arguments an evaluation consumes, in
    /// left-to-right descriptor order.
    pub fn need_argument_num(&self) -> usize { self.root.need_argument_num() }

    /// The script form of the root operator.
    pub fn script_type(&self) -> ScriptType {
        self.root.script_type.expect("parse always resolves the root type")
    }

    /// Whether this is a `combo(...)` descriptor, which evaluates to several
    /// locking scripts.
    pub fn is_combo(&self) -> bool { self.script_type() == ScriptType::Combo }

    /// The prefix table used for address rendering.
    pub fn address_params(&self) -> &AddressParams { &self.params }

    /// The locking script of a descriptor without wildcards.
    pub fn locking_script(&self) -> Result<ScriptBuf, Error> {
        if self.need_argument_num() != 0 {
            return Err(Error::ArgumentMissing);
        }
        self.locking_script_with_args(&[])
    }

    /// The locking script, resolving wildcards with the given arguments.
    pub fn locking_script_with_args(&self, args: &[&str]) -> Result<ScriptBuf, Error> {
        Ok(self
            .locking_scripts_all(args)?
            .into_iter()
            .next()
            .expect("evaluation yields at least one reference"))
    }

    /// The locking script with every wildcard resolved to the same argument.
    pub fn locking_script_derived(&self, argument: &str) -> Result<ScriptBuf, Error> {
        let args = vec![argument; self.need_argument_num()];
        self.locking_script_with_args(&args)
    }

    /// Every locking script this descriptor evaluates to; only `combo`
    /// yields more than one.
    pub fn locking_scripts_all(&self, args: &[&str]) -> Result<Vec<ScriptBuf>, Error> {
        Ok(self
            .references_all(args)?
            .into_iter()
            .map(|reference| reference.locking_script().to_owned())
            .collect())
    }

    /// The first script reference (keys, redeem script, child references,
    /// addresses) of an evaluation.
    pub fn reference(&self, args: &[&str]) -> Result<ScriptReference, Error> {
        Ok(self
            .references_all(args)?
            .into_iter()
            .next()
            .expect("evaluation yields at least one reference"))
    }

    /// Every script reference of an evaluation.
    pub fn references_all(&self, args: &[&str]) -> Result<Vec<ScriptReference>, Error> {
        let secp = Secp256k1::new();
        reference::eval(&self.root, ArgMode::from_args(args), &self.params, &secp)
    }

    /// The first resolved key's origin data, if any.
    pub fn key_data(&self, args: &[&str]) -> Result<Option<KeyData>, Error> {
        Ok(self.key_data_all(args)?.into_iter().next())
    }

    /// Origin data of every resolved key, flattened over nested scripts.
    pub fn key_data_all(&self, args: &[&str]) -> Result<Vec<KeyData>, Error> {
        let references = self.references_all(args)?;
        let mut result = Vec::new();
        for reference in &references {
            let mut current = Some(reference);
            while let Some(script_data) = current {
                for key in script_data.keys() {
                    if let Some(data) = key.key_data() {
                        result.push(data.clone());
                    }
                }
                current = script_data.child();
            }
        }
        Ok(result)
    }

    /// Renders the descriptor, optionally with a freshly computed checksum.
    pub fn to_string_with_checksum(&self, append_checksum: bool) -> String {
        if append_checksum {
            format!("{}", self)
        } else {
            format!("{:#}", self)
        }
    }
}

impl fmt::Display for Descriptor {
    /// Renders the canonical descriptor text with its checksum; alternate
    /// format (`{:#}`) omits the checksum.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use fmt::Write;
        let mut wrapped_f = checksum::Formatter::new(f);
        write!(wrapped_f, "{}", self.root)?;
        wrapped_f.write_checksum_if_not_alt()
    }
}

impl FromStr for Descriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Descriptor, Error> { Descriptor::parse(s) }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Descriptor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Descriptor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Descriptor::parse(&s).map_err(serde::de::Error::custom)
    }
}
