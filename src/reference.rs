// SPDX-License-Identifier: CC0-1.0

//! Script references
//!
//! Evaluating a descriptor resolves its wildcards, derives every key and
//! assembles concrete locking scripts. The result is a [`ScriptReference`]
//! per emitted script (only `combo` emits more than one), which also exposes
//! the redeem script, the inner reference of a wrapped script, the resolved
//! keys, and taproot spending data.

use bitcoin::blockdata::opcodes;
use bitcoin::blockdata::script::{Builder, Script, ScriptBuf};
use bitcoin::hex::FromHex;
use bitcoin::key::PublicKey;
use bitcoin::secp256k1::{All, Secp256k1};
use bitcoin::hashes::Hash;
use bitcoin::taproot::TapNodeHash;

use crate::address::{self, AddressParams, AddressType};
use crate::compiler::{self, CompileCtx};
use crate::key::{DescriptorKey, DeriveArg, KeyReference};
use crate::node::{DescriptorNode, NodeKind, ScriptType};
use crate::slip132::Bip32Format;
use crate::taptree::{ResolvedNode, TapTreeInfo, TreeExpr};
use crate::{Error, ARGUMENT_BASE_EXTKEY};

/// The source of wildcard arguments for one evaluation.
enum ArgSource<'a> {
    /// Parse-time probing: every wildcard resolves to `"0"`.
    Probe,
    /// Caller-supplied arguments, consumed left to right.
    Forward(&'a [&'a str]),
}

/// A forward cursor over wildcard arguments.
///
/// Wildcards consume arguments in left-to-right descriptor order. When the
/// first argument is the [`ARGUMENT_BASE_EXTKEY`] sentinel, every BIP32 key
/// resolves to its undecorated base key and nothing is consumed.
pub(crate) struct ArgMode<'a> {
    source: ArgSource<'a>,
    index: usize,
    base: bool,
}

impl<'a> ArgMode<'a> {
    /// A cursor which yields `"0"` for every wildcard.
    pub(crate) fn probe() -> ArgMode<'static> {
        ArgMode { source: ArgSource::Probe, index: 0, base: false }
    }

    /// A cursor over caller-supplied arguments.
    pub(crate) fn from_args(args: &'a [&'a str]) -> ArgMode<'a> {
        let base = args.first() == Some(&ARGUMENT_BASE_EXTKEY);
        ArgMode { source: ArgSource::Forward(args), index: 0, base }
    }

    fn next(&mut self) -> Result<&'a str, Error> {
        match self.source {
            ArgSource::Probe => Ok("0"),
            ArgSource::Forward(args) => {
                let value = args.get(self.index).ok_or(Error::ArgumentMissing)?;
                self.index += 1;
                Ok(value)
            }
        }
    }

    fn key_arg(&mut self, key: &DescriptorKey) -> Result<DeriveArg<'a>, Error> {
        if !key.has_wildcard() {
            Ok(DeriveArg::None)
        } else if self.base {
            Ok(DeriveArg::Base)
        } else {
            Ok(DeriveArg::Index(self.next()?))
        }
    }
}

/// Derives a key with a dummy `"0"` argument, for analysis-time checks.
pub(crate) fn probe_key(
    key: &DescriptorKey,
    secp: &Secp256k1<All>,
) -> Result<KeyReference, Error> {
    let arg = if key.has_wildcard() { DeriveArg::Index("0") } else { DeriveArg::None };
    key.derive(arg, secp)
}

/// One concrete script produced by evaluating a descriptor.
#[derive(Clone, Debug)]
pub struct ScriptReference {
    script_type: ScriptType,
    locking_script: ScriptBuf,
    redeem_script: Option<ScriptBuf>,
    child: Option<Box<ScriptReference>>,
    keys: Vec<KeyReference>,
    req_num: Option<u32>,
    tap_info: Option<TapTreeInfo>,
    params: AddressParams,
}

impl ScriptReference {
    fn new(script_type: ScriptType, locking_script: ScriptBuf, params: AddressParams) -> Self {
        ScriptReference {
            script_type,
            locking_script,
            redeem_script: None,
            child: None,
            keys: Vec::new(),
            req_num: None,
            tap_info: None,
            params,
        }
    }

    /// The script form this reference was produced by.
    pub fn script_type(&self) -> ScriptType { self.script_type }

    /// The scriptPubKey.
    pub fn locking_script(&self) -> &Script { &self.locking_script }

    /// Whether a redeem (or witness) script underlies this reference.
    pub fn has_redeem_script(&self) -> bool { self.redeem_script.is_some() }

    /// The redeem script of `sh(...)`, the witness script of `wsh(...)`.
    pub fn redeem_script(&self) -> Option<&Script> { self.redeem_script.as_deref() }

    /// Whether a wrapped inner reference exists.
    pub fn has_child(&self) -> bool { self.child.is_some() }

    /// The inner reference of a wrapping script.
    pub fn child(&self) -> Option<&ScriptReference> { self.child.as_deref() }

    /// The keys resolved while assembling this script.
    pub fn keys(&self) -> &[KeyReference] { &self.keys }

    /// Whether this is a multisig with a required-signature count.
    pub fn has_req_num(&self) -> bool { self.req_num.is_some() }

    /// The required-signature count of a multisig.
    pub fn req_num(&self) -> Option<u32> { self.req_num }

    /// Taproot spending data, present on `tr` references.
    pub fn tap_info(&self) -> Option<&TapTreeInfo> { self.tap_info.as_ref() }

    /// Whether the locking script has an address form.
    pub fn has_address(&self) -> bool {
        address::classify(&self.locking_script)
            .map_or(false, |ty| ty != AddressType::Bare)
    }

    /// Renders the address of the locking script under the descriptor's
    /// prefix table. Bare scripts (pay-to-pubkey, bare multisig) have none.
    pub fn address(&self) -> Result<String, Error> {
        address::encode(&self.locking_script, &self.params)
    }

    /// The address family of this reference, taking the redeem script into
    /// account for nested segwit.
    pub fn address_type(&self) -> Result<AddressType, Error> {
        if self.locking_script.is_p2sh() {
            if let Some(redeem) = self.redeem_script.as_deref() {
                if redeem.is_p2wpkh() {
                    return Ok(AddressType::P2shP2wpkh);
                }
                if redeem.is_p2wsh() {
                    return Ok(AddressType::P2shP2wsh);
                }
            }
            return Ok(AddressType::P2sh);
        }
        address::classify(&self.locking_script)
            .ok_or_else(|| Error::Address("unknown address type".to_owned()))
    }
}

/// Evaluates a script node into its references.
pub(crate) fn eval(
    node: &DescriptorNode,
    mut args: ArgMode,
    params: &AddressParams,
    secp: &Secp256k1<All>,
) -> Result<Vec<ScriptReference>, Error> {
    eval_node(node, &mut args, None, params, secp)
}

fn eval_node(
    node: &DescriptorNode,
    args: &mut ArgMode,
    parent: Option<&DescriptorNode>,
    params: &AddressParams,
    secp: &Secp256k1<All>,
) -> Result<Vec<ScriptReference>, Error> {
    let script_type = node.script_type.expect("evaluation runs on analyzed trees");
    match script_type {
        ScriptType::Raw => {
            let bytes = Vec::<u8>::from_hex(&node.value)
                .map_err(|_| Error::Syntax(format!("'{}' is not a hex script", node.value)))?;
            Ok(vec![ScriptReference::new(script_type, ScriptBuf::from(bytes), *params)])
        }
        ScriptType::Addr => {
            let locking_script = address::decode(&node.value, params)?;
            Ok(vec![ScriptReference::new(script_type, locking_script, *params)])
        }
        ScriptType::Miniscript => {
            let child_num = if !node.miniscript_wildcard || args.base {
                0
            } else {
                let arg = args.next()?;
                if arg.contains('/') {
                    return Err(Error::ArgumentMalformed(
                        "miniscript takes a single child index".to_owned(),
                    ));
                }
                arg.parse::<u32>()
                    .map_err(|_| Error::ArgumentMalformed(arg.to_owned()))?
            };
            let ctx = if node.in_tr_scope {
                CompileCtx::Tapscript
            } else {
                CompileCtx::WitnessScript
            };
            let locking_script = compiler::compile(&node.value, child_num, ctx)?;
            Ok(vec![ScriptReference::new(script_type, locking_script, *params)])
        }
        ScriptType::Multi | ScriptType::SortedMulti => {
            let req_num = node.children[0].number;
            let mut keys = Vec::with_capacity(node.children.len() - 1);
            for child in &node.children[1..] {
                keys.push(key_reference(child, args, secp)?);
            }
            let mut pubkeys: Vec<PublicKey> = keys.iter().map(|k| *k.public_key()).collect();
            if script_type == ScriptType::SortedMulti {
                pubkeys.sort_by(|a, b| b.to_bytes().cmp(&a.to_bytes()));
            }
            let locking_script = multisig_script(req_num, &pubkeys);
            let mut reference = ScriptReference::new(script_type, locking_script, *params);
            reference.keys = keys;
            reference.req_num = Some(req_num);
            Ok(vec![reference])
        }
        ScriptType::Sh | ScriptType::Wsh => {
            let inner = eval_node(&node.children[0], args, Some(node), params, secp)?
                .into_iter()
                .next()
                .expect("every script form yields a reference");
            let inner_script = inner.locking_script.clone();
            let locking_script = if script_type == ScriptType::Wsh {
                ScriptBuf::new_p2wsh(&inner_script.wscript_hash())
            } else {
                ScriptBuf::new_p2sh(&inner_script.script_hash())
            };
            let mut reference = ScriptReference::new(script_type, locking_script, *params);
            reference.redeem_script = Some(inner_script);
            reference.child = Some(Box::new(inner));
            Ok(vec![reference])
        }
        ScriptType::Taproot => {
            let internal = key_reference(&node.children[0], args, secp)?;
            let resolved = match node.children.get(1) {
                Some(tree_child) => Some(resolve_tree(tree_child, args, params, secp)?),
                None => None,
            };
            let info = TapTreeInfo::new(internal.x_only_public_key(), resolved.as_ref(), secp);
            let locking_script =
                ScriptBuf::new_p2tr(secp, internal.x_only_public_key(), info.merkle_root());
            let mut reference = ScriptReference::new(script_type, locking_script, *params);
            reference.keys = vec![internal];
            reference.tap_info = Some(info);
            Ok(vec![reference])
        }
        ScriptType::Combo => {
            let key = key_reference(&node.children[0], args, secp)?;
            Ok(eval_combo(key, params))
        }
        ScriptType::Pk | ScriptType::Pkh | ScriptType::Wpkh => {
            let key = key_reference(&node.children[0], args, secp)?;
            let locking_script = single_key_script(script_type, &key, node, parent)?;
            let mut reference = ScriptReference::new(script_type, locking_script, *params);
            reference.keys = vec![key];
            Ok(vec![reference])
        }
    }
}

fn single_key_script(
    script_type: ScriptType,
    key: &KeyReference,
    node: &DescriptorNode,
    parent: Option<&DescriptorNode>,
) -> Result<ScriptBuf, Error> {
    let format = key.format();
    match script_type {
        ScriptType::Pk => {
            if format != Bip32Format::Normal {
                return Err(Error::BipFormatMismatch(
                    "pk takes normal-format extended keys only",
                ));
            }
            let builder = if node.in_tr_scope {
                Builder::new().push_x_only_key(&key.x_only_public_key())
            } else {
                Builder::new().push_key(key.public_key())
            };
            Ok(builder.push_opcode(opcodes::all::OP_CHECKSIG).into_script())
        }
        ScriptType::Pkh => {
            if format != Bip32Format::Normal {
                return Err(Error::BipFormatMismatch(
                    "pkh takes normal-format extended keys only",
                ));
            }
            Ok(ScriptBuf::new_p2pkh(&key.public_key().pubkey_hash()))
        }
        ScriptType::Wpkh => {
            let under_sh =
                parent.map_or(false, |p| p.script_type == Some(ScriptType::Sh));
            if format == Bip32Format::Bip49 && !under_sh {
                return Err(Error::BipFormatMismatch(
                    "bip49 keys belong in sh(wpkh(...))",
                ));
            }
            if format == Bip32Format::Bip84 && parent.is_some() {
                return Err(Error::BipFormatMismatch(
                    "bip84 keys belong in top-level wpkh(...)",
                ));
            }
            let hash = key
                .public_key()
                .wpubkey_hash()
                .map_err(|_| Error::UncompressedInWitness)?;
            Ok(ScriptBuf::new_p2wpkh(&hash))
        }
        _ => unreachable!("single_key_script is called for single-key forms only"),
    }
}

/// `combo(KEY)` yields every standard script for the key, subject to its
/// BIP32 format: P2WPKH, P2SH-P2WPKH, P2PKH and bare P2PK, in that order.
fn eval_combo(key: KeyReference, params: &AddressParams) -> Vec<ScriptReference> {
    let mut result = Vec::with_capacity(4);
    let format = key.format();
    let pubkey = *key.public_key();

    if let Ok(wpkh_hash) = pubkey.wpubkey_hash() {
        let wpkh_script = ScriptBuf::new_p2wpkh(&wpkh_hash);

        if format != Bip32Format::Bip49 {
            let mut reference =
                ScriptReference::new(ScriptType::Combo, wpkh_script.clone(), *params);
            reference.keys = vec![key.clone()];
            result.push(reference);
        }

        if format != Bip32Format::Bip84 {
            let mut inner =
                ScriptReference::new(ScriptType::Wpkh, wpkh_script.clone(), *params);
            inner.keys = vec![key.clone()];
            let mut reference = ScriptReference::new(
                ScriptType::Combo,
                ScriptBuf::new_p2sh(&wpkh_script.script_hash()),
                *params,
            );
            reference.redeem_script = Some(wpkh_script);
            reference.child = Some(Box::new(inner));
            result.push(reference);
        }
    }

    if format == Bip32Format::Normal {
        let mut reference = ScriptReference::new(
            ScriptType::Combo,
            ScriptBuf::new_p2pkh(&pubkey.pubkey_hash()),
            *params,
        );
        reference.keys = vec![key.clone()];
        result.push(reference);

        let p2pk = Builder::new()
            .push_key(&pubkey)
            .push_opcode(opcodes::all::OP_CHECKSIG)
            .into_script();
        let mut reference = ScriptReference::new(ScriptType::Combo, p2pk, *params);
        reference.keys = vec![key];
        result.push(reference);
    }
    result
}

fn key_reference(
    node: &DescriptorNode,
    args: &mut ArgMode,
    secp: &Secp256k1<All>,
) -> Result<KeyReference, Error> {
    let key = node.key.as_ref().expect("key nodes are analyzed");
    let arg = args.key_arg(key)?;
    key.derive(arg, secp)
}

fn multisig_script(req_num: u32, pubkeys: &[PublicKey]) -> ScriptBuf {
    let mut builder = Builder::new().push_int(req_num as i64);
    for pubkey in pubkeys {
        builder = builder.push_key(pubkey);
    }
    builder
        .push_int(pubkeys.len() as i64)
        .push_opcode(opcodes::all::OP_CHECKMULTISIG)
        .into_script()
}

/// Resolves the script tree held by the second child of a `tr` node,
/// consuming wildcard arguments in leaf order.
fn resolve_tree(
    tree_node: &DescriptorNode,
    args: &mut ArgMode,
    params: &AddressParams,
    secp: &Secp256k1<All>,
) -> Result<ResolvedNode, Error> {
    let expr = tree_node.tree.as_ref().expect("tr trees are analyzed");
    resolve_expr(expr, tree_node, args, params, secp)
}

fn resolve_expr(
    expr: &TreeExpr,
    tree_node: &DescriptorNode,
    args: &mut ArgMode,
    params: &AddressParams,
    secp: &Secp256k1<All>,
) -> Result<ResolvedNode, Error> {
    match expr {
        TreeExpr::Branch(left, right) => {
            let left = resolve_expr(left, tree_node, args, params, secp)?;
            let right = resolve_expr(right, tree_node, args, params, secp)?;
            Ok(ResolvedNode::Branch(Box::new(left), Box::new(right)))
        }
        TreeExpr::Leaf(index) => {
            let leaf = &tree_node.children[*index];
            if leaf.kind == NodeKind::Key {
                // A bare 32-byte leaf stands for a node known only by its
                // hash; the bytes double as an x-only key for validation.
                let key = key_reference(leaf, args, secp)?;
                Ok(ResolvedNode::Hidden(TapNodeHash::from_byte_array(
                    key.x_only_public_key().serialize(),
                )))
            } else {
                let reference = eval_node(leaf, args, None, params, secp)?
                    .into_iter()
                    .next()
                    .expect("every script form yields a reference");
                Ok(ResolvedNode::Script(reference.locking_script))
            }
        }
    }
}
