// SPDX-License-Identifier: CC0-1.0

//! Descriptor AST
//!
//! A descriptor string parses into a tree of [`DescriptorNode`]s in two
//! phases. The structural scan splits each `name(...)` call into a name, a
//! raw value and child nodes by tracking parenthesis depth; the analysis
//! pass then classifies keys, resolves script types against the operator
//! table and enforces every compositional rule. After analysis the tree is
//! immutable; evaluation (in [`crate::reference`]) only reads it.

use std::fmt;

use bitcoin::hex::FromHex;
use bitcoin::secp256k1::{All, Secp256k1};

use crate::address::AddressParams;
use crate::compiler::{self, CompileCtx};
use crate::key::DescriptorKey;
use crate::reference::{self, ArgMode};
use crate::taptree::{self, TreeExpr, TreeText};
use crate::{address, Error};

/// Serialized P2SH redeem scripts are limited to 520 bytes.
pub(crate) const MAX_REDEEM_SCRIPT_SIZE: usize = 520;
/// Multisig key-count limit outside witness scripts.
const MAX_MULTISIG_KEYS_LEGACY: usize = 16;
/// Multisig key-count limit inside `wsh`.
const MAX_MULTISIG_KEYS_WITNESS: usize = 20;

/// The kind of a descriptor AST node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// A script-building operator with children.
    Script,
    /// A key expression.
    Key,
    /// The threshold number of `multi`/`sortedmulti`.
    Number,
}

/// The script form a descriptor operator resolves to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScriptType {
    /// `sh(...)`: pay to script hash.
    Sh,
    /// `wsh(...)`: pay to witness script hash.
    Wsh,
    /// `pk(KEY)`: bare pay to pubkey.
    Pk,
    /// `pkh(KEY)`: pay to pubkey hash.
    Pkh,
    /// `wpkh(KEY)`: pay to witness pubkey hash.
    Wpkh,
    /// `combo(KEY)`: every standard single-key form.
    Combo,
    /// `multi(k,...)`: bare or wrapped multisig.
    Multi,
    /// `sortedmulti(k,...)`: multisig with canonically ordered keys.
    SortedMulti,
    /// `addr(ADDR)`: a fixed address.
    Addr,
    /// `raw(HEX)`: a fixed locking script.
    Raw,
    /// A miniscript fragment compiled by the external compiler.
    Miniscript,
    /// `tr(KEY)` / `tr(KEY,TREE)`: taproot.
    Taproot,
}

struct OperatorInfo {
    name: &'static str,
    script_type: ScriptType,
    top_only: bool,
    has_child: bool,
    multisig: bool,
}

#[rustfmt::skip]
static OPERATOR_TABLE: [OperatorInfo; 11] = [
    OperatorInfo { name: "sh",          script_type: ScriptType::Sh,          top_only: true,  has_child: true,  multisig: false },
    OperatorInfo { name: "combo",       script_type: ScriptType::Combo,       top_only: true,  has_child: true,  multisig: false },
    OperatorInfo { name: "wsh",         script_type: ScriptType::Wsh,         top_only: false, has_child: true,  multisig: false },
    OperatorInfo { name: "pk",          script_type: ScriptType::Pk,          top_only: false, has_child: true,  multisig: false },
    OperatorInfo { name: "pkh",         script_type: ScriptType::Pkh,         top_only: false, has_child: true,  multisig: false },
    OperatorInfo { name: "wpkh",        script_type: ScriptType::Wpkh,        top_only: false, has_child: true,  multisig: false },
    OperatorInfo { name: "multi",       script_type: ScriptType::Multi,       top_only: false, has_child: true,  multisig: true  },
    OperatorInfo { name: "sortedmulti", script_type: ScriptType::SortedMulti, top_only: false, has_child: true,  multisig: true  },
    OperatorInfo { name: "addr",        script_type: ScriptType::Addr,        top_only: true,  has_child: false, multisig: false },
    OperatorInfo { name: "raw",         script_type: ScriptType::Raw,         top_only: true,  has_child: false, multisig: false },
    OperatorInfo { name: "tr",          script_type: ScriptType::Taproot,     top_only: true,  has_child: true,  multisig: false },
];

fn lookup_operator(name: &str) -> Option<&'static OperatorInfo> {
    OPERATOR_TABLE.iter().find(|op| op.name == name)
}

/// Maps a script type back to its operator name, for the programmatic
/// constructor.
pub(crate) fn operator_name(script_type: ScriptType) -> Option<&'static str> {
    OPERATOR_TABLE
        .iter()
        .find(|op| op.script_type == script_type)
        .map(|op| op.name)
}

pub(crate) fn is_multisig_type(script_type: ScriptType) -> bool {
    matches!(script_type, ScriptType::Multi | ScriptType::SortedMulti)
}

/// One node of a parsed descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DescriptorNode {
    pub(crate) name: String,
    pub(crate) value: String,
    pub(crate) kind: NodeKind,
    pub(crate) script_type: Option<ScriptType>,
    pub(crate) depth: u32,
    /// Set on every node inside a `tr` scope; keys are x-only there.
    pub(crate) in_tr_scope: bool,
    /// The threshold for a `Number` node.
    pub(crate) number: u32,
    pub(crate) children: Vec<DescriptorNode>,
    pub(crate) key: Option<DescriptorKey>,
    /// The parsed script tree, on the second child of `tr` only.
    pub(crate) tree: Option<TreeExpr>,
    /// Whether a miniscript fragment contains a wildcard.
    pub(crate) miniscript_wildcard: bool,
}

impl DescriptorNode {
    fn empty(kind: NodeKind, in_tr_scope: bool) -> DescriptorNode {
        DescriptorNode {
            name: String::new(),
            value: String::new(),
            kind,
            script_type: None,
            depth: 0,
            in_tr_scope,
            number: 0,
            children: Vec::new(),
            key: None,
            tree: None,
            miniscript_wildcard: false,
        }
    }

    /// Parses and fully analyzes a descriptor body (without checksum).
    pub(crate) fn parse(
        body: &str,
        params: &AddressParams,
        secp: &Secp256k1<All>,
    ) -> Result<DescriptorNode, Error> {
        let mut node = DescriptorNode::empty(NodeKind::Script, false);
        node.scan(body, 0)?;
        node.analyze_all("", params, secp)?;

        // Probe every evaluation path once with dummy arguments, so that a
        // descriptor which cannot produce a script fails at parse time.
        reference::eval(&node, ArgMode::probe(), params, secp)?;
        Ok(node)
    }

    /// The structural scan: splits `name(...)` into name, value and children
    /// by tracking parenthesis depth relative to this node.
    fn scan(&mut self, descriptor: &str, depth: u32) -> Result<(), Error> {
        self.depth = depth;
        let mut offset = 0usize;
        let mut depth_work = depth;
        let mut exist_child = false;
        let mut terminated = false;

        for (idx, ch) in descriptor.char_indices() {
            if terminated {
                if ch == ' ' {
                    continue;
                }
                if depth == 0 {
                    return Err(Error::Syntax(format!(
                        "unexpected '{}' after closing parenthesis",
                        ch
                    )));
                }
                // Inside a nested body this is a miniscript fragment, not an
                // operator call; keep scanning, analysis rewrites the node.
                terminated = false;
            }
            match ch {
                ' ' => {
                    if offset == idx {
                        offset = idx + 1;
                    }
                }
                '(' => {
                    if depth_work == depth {
                        self.name = descriptor[offset..idx].to_owned();
                        offset = idx + 1;
                    } else {
                        exist_child = true;
                    }
                    depth_work += 1;
                }
                ')' => {
                    if depth_work == depth {
                        return Err(Error::Syntax("unbalanced parentheses".to_owned()));
                    }
                    depth_work -= 1;
                    if depth_work == depth {
                        self.value = descriptor[offset..idx].to_owned();
                        terminated = true;
                        offset = idx + 1;
                        if self.name == "addr" || self.name == "raw" {
                            // leaf operators keep their body as the value
                        } else if self.name == "tr" {
                            let mut node = DescriptorNode::empty(NodeKind::Script, self.in_tr_scope);
                            node.value = self.value.clone();
                            node.depth = depth + 1;
                            self.children.push(node);
                        } else if exist_child {
                            let mut node = DescriptorNode::empty(NodeKind::Script, self.in_tr_scope);
                            node.scan(&self.value, depth + 1)?;
                            self.children.push(node);
                            exist_child = false;
                        } else {
                            let mut node = DescriptorNode::empty(NodeKind::Key, self.in_tr_scope);
                            node.value = self.value.clone();
                            node.depth = depth + 1;
                            self.children.push(node);
                        }
                    }
                }
                ',' => {
                    if exist_child || depth_work != depth + 1 {
                        // belongs to a nested call; the child scan sees it
                    } else if self.name == "multi" || self.name == "sortedmulti" {
                        let segment = &descriptor[offset..idx];
                        let mut node = if self.children.is_empty() {
                            let mut node = DescriptorNode::empty(NodeKind::Number, self.in_tr_scope);
                            node.number = segment.parse::<u32>().map_err(|_| {
                                Error::Syntax(format!(
                                    "multisig threshold '{}' is not a number",
                                    segment
                                ))
                            })?;
                            node
                        } else {
                            DescriptorNode::empty(NodeKind::Key, self.in_tr_scope)
                        };
                        node.value = segment.to_owned();
                        node.depth = depth + 1;
                        self.children.push(node);
                        offset = idx + 1;
                    } else if self.name == "tr" && self.children.is_empty() {
                        let mut node = DescriptorNode::empty(NodeKind::Key, self.in_tr_scope);
                        node.value = descriptor[offset..idx].to_owned();
                        node.depth = depth + 1;
                        self.children.push(node);
                        offset = idx + 1;
                    }
                    // any other comma belongs to a miniscript fragment body
                }
                _ => {}
            }
        }

        if depth_work != depth {
            return Err(Error::Syntax("unbalanced parentheses".to_owned()));
        }
        Ok(())
    }

    /// Validates the node against the operator table and recurses into its
    /// children, resolving script types and key expressions on the way.
    pub(crate) fn analyze_all(
        &mut self,
        parent_name: &str,
        params: &AddressParams,
        secp: &Secp256k1<All>,
    ) -> Result<(), Error> {
        match self.kind {
            NodeKind::Number => return Ok(()),
            NodeKind::Key => {
                self.key = Some(DescriptorKey::parse(&self.value, self.in_tr_scope, secp)?);
                return Ok(());
            }
            NodeKind::Script => {}
        }

        if self.name.is_empty() {
            return Err(Error::Syntax("expected a script operator".to_owned()));
        }

        let op = match lookup_operator(&self.name) {
            Some(op) => op,
            None => {
                if parent_name == "wsh" || parent_name == "sh" || parent_name == "tr" {
                    let fragment = format!("{}({})", self.name, self.value);
                    let ctx = if parent_name == "tr" {
                        CompileCtx::Tapscript
                    } else {
                        CompileCtx::WitnessScript
                    };
                    compiler::check(&fragment, ctx)?;
                    self.miniscript_wildcard = fragment.contains('*');
                    self.script_type = Some(ScriptType::Miniscript);
                    self.value = fragment;
                    self.name = "miniscript".to_owned();
                    self.children.clear();
                    return Ok(());
                }
                return Err(Error::UnknownOperator(self.name.clone()));
            }
        };

        if op.top_only && self.depth != 0 {
            return Err(Error::InvalidComposition(format!(
                "'{}' may appear at the top level only",
                self.name
            )));
        }
        if op.has_child && self.children.is_empty() {
            return Err(Error::Syntax(format!("'{}' has an empty body", self.name)));
        }

        if op.multisig {
            self.analyze_multisig(op, parent_name, params, secp)?;
        } else if op.script_type == ScriptType::Addr {
            address::decode(&self.value, params)?;
            self.script_type = Some(ScriptType::Addr);
        } else if op.script_type == ScriptType::Raw {
            Vec::<u8>::from_hex(&self.value)
                .map_err(|_| Error::Syntax(format!("'{}' is not a hex script", self.value)))?;
            self.script_type = Some(ScriptType::Raw);
        } else if op.script_type == ScriptType::Taproot {
            self.analyze_taproot(params, secp)?;
        } else {
            self.analyze_wrapper(op, parent_name, params, secp)?;
        }
        Ok(())
    }

    fn analyze_multisig(
        &mut self,
        op: &'static OperatorInfo,
        parent_name: &str,
        params: &AddressParams,
        secp: &Secp256k1<All>,
    ) -> Result<(), Error> {
        if self.in_tr_scope {
            return Err(Error::InvalidComposition(
                "multisig is unavailable under taproot".to_owned(),
            ));
        }
        if self.children.len() < 2 {
            return Err(Error::Syntax(
                "multisig requires a threshold and at least one key".to_owned(),
            ));
        }
        if self.children[0].kind != NodeKind::Number {
            return Err(Error::Syntax(
                "multisig threshold must be a number".to_owned(),
            ));
        }
        let k = self.children[0].number as usize;
        let n = self.children.len() - 1;
        if k == 0 || n < k {
            return Err(Error::Syntax(format!(
                "multisig requires 1 <= k <= n, got {} of {}",
                k, n
            )));
        }
        let max_keys = if parent_name == "wsh" {
            MAX_MULTISIG_KEYS_WITNESS
        } else {
            MAX_MULTISIG_KEYS_LEGACY
        };
        if n > max_keys {
            return Err(Error::SizeExceeded { size: n, limit: max_keys });
        }

        let name = self.name.clone();
        for child in &mut self.children {
            child.analyze_all(&name, params, secp)?;
        }
        self.script_type = Some(op.script_type);

        if parent_name == "sh" {
            // Probe-build the redeem script; the 520-byte P2SH limit is only
            // reachable with uncompressed keys, which are legal here.
            let refs = reference::eval(self, ArgMode::probe(), params, secp)?;
            let size = refs[0].locking_script().len();
            if size + 3 > MAX_REDEEM_SCRIPT_SIZE {
                return Err(Error::SizeExceeded { size: size + 3, limit: MAX_REDEEM_SCRIPT_SIZE });
            }
        } else if parent_name == "wsh" {
            for child in &self.children {
                if child.kind == NodeKind::Key {
                    let key = child.key.as_ref().expect("analyzed above");
                    let probe = reference::probe_key(key, secp)?;
                    if !probe.public_key().compressed {
                        return Err(Error::UncompressedInWitness);
                    }
                }
            }
        }
        Ok(())
    }

    fn analyze_taproot(
        &mut self,
        params: &AddressParams,
        secp: &Secp256k1<All>,
    ) -> Result<(), Error> {
        if self.children.len() > 2 {
            return Err(Error::Syntax(
                "tr takes an internal key and at most one script tree".to_owned(),
            ));
        }
        self.children[0].kind = NodeKind::Key;
        self.children[0].in_tr_scope = true;
        self.children[0].analyze_all("tr", params, secp)?;
        if self.children[0].key.as_ref().expect("just analyzed").is_uncompressed() {
            return Err(Error::UncompressedInWitness);
        }

        if self.children.len() == 2 {
            self.children[1].in_tr_scope = true;
            self.children[1].analyze_tree(params, secp)?;
        }
        self.script_type = Some(ScriptType::Taproot);
        Ok(())
    }

    /// Parses and validates the script-tree text held by the second child of
    /// a `tr` node.
    fn analyze_tree(&mut self, params: &AddressParams, secp: &Secp256k1<All>) -> Result<(), Error> {
        let text = std::mem::take(&mut self.value);
        let shape = taptree::parse_tree(&text)?;
        let mut leaves = Vec::new();
        let tree = build_tree(&shape, &mut leaves, params, secp)?;
        self.value = text;
        self.children = leaves;
        self.tree = Some(tree);
        Ok(())
    }

    fn analyze_wrapper(
        &mut self,
        op: &'static OperatorInfo,
        parent_name: &str,
        params: &AddressParams,
        secp: &Secp256k1<All>,
    ) -> Result<(), Error> {
        if self.children.len() != 1 {
            return Err(Error::Syntax(format!(
                "'{}' takes exactly one argument",
                self.name
            )));
        }
        let is_script_hash = matches!(op.script_type, ScriptType::Sh | ScriptType::Wsh);
        if matches!(op.script_type, ScriptType::Wsh | ScriptType::Wpkh)
            && !parent_name.is_empty()
            && parent_name != "sh"
        {
            return Err(Error::InvalidComposition(format!(
                "'{}' may appear at the top level or under sh only",
                self.name
            )));
        }
        if is_script_hash && self.children[0].kind != NodeKind::Script {
            return Err(Error::InvalidComposition(format!(
                "'{}' requires a script argument",
                self.name
            )));
        }
        if !is_script_hash && self.children[0].kind != NodeKind::Key {
            return Err(Error::InvalidComposition(format!(
                "'{}' requires a key argument",
                self.name
            )));
        }
        if parent_name == "tr" && op.script_type == ScriptType::Pkh {
            return Err(Error::InvalidComposition(
                "pkh is unavailable under taproot".to_owned(),
            ));
        }

        let name = self.name.clone();
        self.children[0].analyze_all(&name, params, secp)?;

        if matches!(op.script_type, ScriptType::Wsh | ScriptType::Wpkh)
            && self.contains_uncompressed_key()
        {
            return Err(Error::UncompressedInWitness);
        }
        self.script_type = Some(op.script_type);
        Ok(())
    }

    fn contains_uncompressed_key(&self) -> bool {
        if self.key.as_ref().map_or(false, DescriptorKey::is_uncompressed) {
            return true;
        }
        self.children.iter().any(DescriptorNode::contains_uncompressed_key)
    }

    /// The number of wildcard arguments an evaluation of this subtree
    /// consumes, in left-to-right order.
    pub(crate) fn need_argument_num(&self) -> usize {
        let own = match self.kind {
            NodeKind::Key => self.key.as_ref().map_or(0, |k| k.has_wildcard() as usize),
            NodeKind::Script if self.script_type == Some(ScriptType::Miniscript) => {
                self.miniscript_wildcard as usize
            }
            _ => 0,
        };
        own + self.children.iter().map(DescriptorNode::need_argument_num).sum::<usize>()
    }
}

/// Recursively materializes a textual tree shape, validating each leaf and
/// appending it to the ordered leaf list.
fn build_tree(
    shape: &TreeText,
    leaves: &mut Vec<DescriptorNode>,
    params: &AddressParams,
    secp: &Secp256k1<All>,
) -> Result<TreeExpr, Error> {
    match shape {
        TreeText::Branch(left, right) => {
            let left = build_tree(left, leaves, params, secp)?;
            let right = build_tree(right, leaves, params, secp)?;
            Ok(TreeExpr::Branch(Box::new(left), Box::new(right)))
        }
        TreeText::Leaf(text) => {
            let mut node = DescriptorNode::empty(NodeKind::Script, true);
            node.depth = 1;
            if let Some(inner) = text.strip_prefix("tl(").and_then(|t| t.strip_suffix(')')) {
                // `tl(...)` marks a tapleaf; it wraps either a raw script in
                // hex or a full script expression.
                if inner.contains('(') {
                    node.scan(inner, 2)?;
                    node.analyze_all("tr", params, secp)?;
                } else {
                    Vec::<u8>::from_hex(inner).map_err(|_| {
                        Error::Syntax(format!("'{}' is not a hex tapscript", inner))
                    })?;
                    node.name = "tl".to_owned();
                    node.value = inner.to_owned();
                    node.script_type = Some(ScriptType::Raw);
                }
            } else if text.contains('(') {
                node.scan(text, 2)?;
                node.analyze_all("tr", params, secp)?;
            } else if text.len() == 64 {
                node.kind = NodeKind::Key;
                node.value = (*text).to_owned();
                node.analyze_all("tr", params, secp)?;
            } else {
                return Err(Error::Syntax(format!(
                    "'{}' is not a valid taproot leaf",
                    text
                )));
            }
            leaves.push(node);
            Ok(TreeExpr::Leaf(leaves.len() - 1))
        }
    }
}

impl fmt::Display for DescriptorNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.name.is_empty() || self.name == "miniscript" {
            f.write_str(&self.value)
        } else if self.children.is_empty() {
            write!(f, "{}({})", self.name, self.value)
        } else {
            write!(f, "{}(", self.name)?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                child.fmt(f)?;
            }
            f.write_str(")")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressParams;

    fn parse(s: &str) -> Result<DescriptorNode, Error> {
        DescriptorNode::parse(s, &AddressParams::BITCOIN, &Secp256k1::new())
    }

    #[test]
    fn scan_splits_name_value_children() {
        let node =
            parse("pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)")
                .unwrap();
        assert_eq!(node.name, "pkh");
        assert_eq!(node.script_type, Some(ScriptType::Pkh));
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].kind, NodeKind::Key);
    }

    #[test]
    fn multisig_children_are_number_then_keys() {
        let node = parse(
            "multi(1,02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5,03a34b99f22c790c4e36b2b3c2c35a36db06226e41c692fc82b8b56ac1c540c5bd)",
        )
        .unwrap();
        assert_eq!(node.children.len(), 3);
        assert_eq!(node.children[0].kind, NodeKind::Number);
        assert_eq!(node.children[0].number, 1);
        assert_eq!(node.children[1].kind, NodeKind::Key);
        assert_eq!(node.children[2].kind, NodeKind::Key);
    }

    #[test]
    fn unbalanced_parens_are_rejected() {
        for bad in [
            "pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5",
            "pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5))",
            "pkh((02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)",
        ] {
            assert!(parse(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn top_only_operators_do_not_nest() {
        let err = parse(
            "sh(sh(pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)))",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidComposition(_)));
    }

    #[test]
    fn wsh_only_under_sh_or_top() {
        let err = parse(
            "wsh(wsh(pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)))",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidComposition(_)));
    }

    #[test]
    fn unknown_operator_outside_script_hash() {
        let err = parse("frob(deadbeef)").unwrap_err();
        assert!(matches!(err, Error::UnknownOperator(_)));
    }

    #[test]
    fn miniscript_fragment_is_rewritten() {
        let node = parse(
            "wsh(and_v(v:pk(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5),older(144)))",
        )
        .unwrap();
        let inner = &node.children[0];
        assert_eq!(inner.script_type, Some(ScriptType::Miniscript));
        assert_eq!(inner.name, "miniscript");
        assert!(inner.value.starts_with("and_v("));
        assert!(inner.children.is_empty());
    }

    #[test]
    fn multisig_threshold_bounds() {
        let key = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
        assert!(matches!(
            parse(&format!("multi(0,{})", key)).unwrap_err(),
            Error::Syntax(_)
        ));
        assert!(matches!(
            parse(&format!("multi(3,{},{})", key, key)).unwrap_err(),
            Error::Syntax(_)
        ));
    }

    #[test]
    fn need_argument_num_counts_wildcards() {
        let node = parse(
            "wsh(multi(2,xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/0/*,xpub68NZiKmJWnxxS6aaHmn81bvJeTESw724CRDs6HbuccFQN9Ku14VQrADWgqbhhTHBaohPX4CjNLf9fq9MYo6oDaPPLPxSb7gwQN3ih19Zm4Y/1/*))",
        )
        .unwrap();
        assert_eq!(node.need_argument_num(), 2);
    }

    #[test]
    fn display_round_trips() {
        let descs = [
            "pkh(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5)",
            "sh(wpkh(03a34b99f22c790c4e36b2b3c2c35a36db06226e41c692fc82b8b56ac1c540c5bd))",
            "multi(1,02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5,03a34b99f22c790c4e36b2b3c2c35a36db06226e41c692fc82b8b56ac1c540c5bd)",
            "raw(51)",
        ];
        for desc in descs {
            assert_eq!(parse(desc).unwrap().to_string(), desc);
        }
    }
}
