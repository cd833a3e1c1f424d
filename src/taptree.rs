// SPDX-License-Identifier: CC0-1.0

//! Taproot script trees
//!
//! The second argument of `tr(...)` is a nested-brace tree: `{left,right}`
//! denotes a branch, and a leaf is a script expression, a `tl(<hex>)` raw
//! tapscript, or a bare 32-byte hex value standing in for a node hash. This
//! module parses the brace syntax and, at evaluation time, hashes a resolved
//! tree into its Merkle root and per-leaf control-block data.

use bitcoin::key::{Parity, TapTweak, TweakedPublicKey, XOnlyPublicKey};
use bitcoin::secp256k1::{Secp256k1, Verification};
use bitcoin::taproot::{ControlBlock, LeafVersion, TapLeafHash, TapNodeHash, TaprootMerkleBranch};
use bitcoin::ScriptBuf;

use crate::Error;

/// The shape of a taproot script tree, with leaves referred to by index.
///
/// Leaf indices point into the ordered leaf-node list held by the enclosing
/// `tr` tree node, in left-to-right order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TreeExpr {
    /// A leaf, identified by its position in the leaf list.
    Leaf(usize),
    /// An internal branch.
    Branch(Box<TreeExpr>, Box<TreeExpr>),
}

/// The textual shape of a tree, borrowed from the descriptor string.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TreeText<'a> {
    /// A leaf's raw text.
    Leaf(&'a str),
    /// An internal branch.
    Branch(Box<TreeText<'a>>, Box<TreeText<'a>>),
}

/// Parses the brace syntax of a `tr` script tree.
pub(crate) fn parse_tree(s: &str) -> Result<TreeText, Error> {
    let (tree, rem) = parse_expr(s)?;
    if !rem.is_empty() {
        return Err(Error::Syntax(format!(
            "unexpected '{}' after taproot tree",
            rem
        )));
    }
    Ok(tree)
}

fn parse_expr(s: &str) -> Result<(TreeText, &str), Error> {
    if let Some(inner) = s.strip_prefix('{') {
        let (left, rem) = parse_expr(inner)?;
        let rem = rem
            .strip_prefix(',')
            .ok_or_else(|| Error::Syntax("expected ',' in taproot branch".to_owned()))?;
        let (right, rem) = parse_expr(rem)?;
        let rem = rem
            .strip_prefix('}')
            .ok_or_else(|| Error::Syntax("expected '}' closing taproot branch".to_owned()))?;
        Ok((TreeText::Branch(Box::new(left), Box::new(right)), rem))
    } else {
        // A leaf runs until a ',' or '}' outside any script parentheses.
        let mut depth = 0i32;
        for (idx, ch) in s.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(Error::Syntax(
                            "unbalanced parentheses in taproot tree".to_owned(),
                        ));
                    }
                }
                ',' | '}' if depth == 0 => {
                    return finish_leaf(&s[..idx]).map(|leaf| (leaf, &s[idx..]));
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(Error::Syntax(
                "unbalanced parentheses in taproot tree".to_owned(),
            ));
        }
        finish_leaf(s).map(|leaf| (leaf, ""))
    }
}

fn finish_leaf(s: &str) -> Result<TreeText, Error> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::Syntax("empty taproot leaf".to_owned()));
    }
    Ok(TreeText::Leaf(s))
}

/// A tree whose leaves have been resolved to concrete scripts or hashes.
#[derive(Clone, Debug)]
pub(crate) enum ResolvedNode {
    /// A tapscript leaf.
    Script(ScriptBuf),
    /// A node known only by its hash.
    Hidden(TapNodeHash),
    /// An internal branch.
    Branch(Box<ResolvedNode>, Box<ResolvedNode>),
}

impl ResolvedNode {
    fn node_hash(&self) -> TapNodeHash {
        match self {
            ResolvedNode::Script(script) => {
                TapNodeHash::from(TapLeafHash::from_script(script, LeafVersion::TapScript))
            }
            ResolvedNode::Hidden(hash) => *hash,
            ResolvedNode::Branch(left, right) => {
                TapNodeHash::from_node_hashes(left.node_hash(), right.node_hash())
            }
        }
    }

    /// Collects script leaves in depth-first order, each with the sibling
    /// hashes on its path, ordered leaf-sibling first.
    fn walk(&self, path: &mut Vec<TapNodeHash>, leaves: &mut Vec<TapLeafData>) {
        match self {
            ResolvedNode::Script(script) => {
                let leaf_hash = TapLeafHash::from_script(script, LeafVersion::TapScript);
                let mut merkle_branch = path.clone();
                merkle_branch.reverse();
                leaves.push(TapLeafData { script: script.clone(), leaf_hash, merkle_branch });
            }
            ResolvedNode::Hidden(..) => {}
            ResolvedNode::Branch(left, right) => {
                path.push(right.node_hash());
                left.walk(path, leaves);
                path.pop();
                path.push(left.node_hash());
                right.walk(path, leaves);
                path.pop();
            }
        }
    }
}

#[derive(Clone, Debug)]
struct TapLeafData {
    script: ScriptBuf,
    leaf_hash: TapLeafHash,
    merkle_branch: Vec<TapNodeHash>,
}

/// Spending information for a taproot script reference: the output key and
/// every script leaf with its control-block data.
#[derive(Clone, Debug)]
pub struct TapTreeInfo {
    internal_key: XOnlyPublicKey,
    merkle_root: Option<TapNodeHash>,
    output_key: TweakedPublicKey,
    output_key_parity: Parity,
    leaves: Vec<TapLeafData>,
}

impl TapTreeInfo {
    pub(crate) fn new<C: Verification>(
        internal_key: XOnlyPublicKey,
        tree: Option<&ResolvedNode>,
        secp: &Secp256k1<C>,
    ) -> TapTreeInfo {
        let merkle_root = tree.map(ResolvedNode::node_hash);
        let (output_key, output_key_parity) = internal_key.tap_tweak(secp, merkle_root);
        let mut leaves = Vec::new();
        if let Some(tree) = tree {
            tree.walk(&mut Vec::new(), &mut leaves);
        }
        TapTreeInfo { internal_key, merkle_root, output_key, output_key_parity, leaves }
    }

    /// The internal (untweaked) key.
    pub fn internal_key(&self) -> XOnlyPublicKey { self.internal_key }

    /// The Merkle root of the script tree, `None` for a key-spend-only
    /// output.
    pub fn merkle_root(&self) -> Option<TapNodeHash> { self.merkle_root }

    /// The tweaked key which appears in the locking script.
    pub fn output_key(&self) -> TweakedPublicKey { self.output_key }

    /// The parity of the output key.
    pub fn output_key_parity(&self) -> Parity { self.output_key_parity }

    /// The number of script leaves.
    pub fn leaf_count(&self) -> usize { self.leaves.len() }

    /// The tapscript of the given leaf, in depth-first order.
    pub fn leaf_script(&self, index: usize) -> Option<&ScriptBuf> {
        self.leaves.get(index).map(|leaf| &leaf.script)
    }

    /// The leaf hash of the given leaf.
    pub fn leaf_hash(&self, index: usize) -> Option<TapLeafHash> {
        self.leaves.get(index).map(|leaf| leaf.leaf_hash)
    }

    /// The control block for spending through the given leaf.
    pub fn control_block(&self, index: usize) -> Option<ControlBlock> {
        let leaf = self.leaves.get(index)?;
        Some(ControlBlock {
            leaf_version: LeafVersion::TapScript,
            output_key_parity: self.output_key_parity,
            internal_key: self.internal_key,
            merkle_branch: TaprootMerkleBranch::try_from(leaf.merkle_branch.clone())
                .expect("tree nesting is bounded by input length"),
        })
    }
}
