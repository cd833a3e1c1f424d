// SPDX-License-Identifier: CC0-1.0

//! Bridge to the external miniscript compiler
//!
//! Fragment names that are not descriptor operators are handed to the
//! `miniscript` crate for compilation, under the script context implied by
//! the enclosing operator (`wsh`/`sh` or `tr`). This is the engine's single
//! seam to miniscript; nothing else in the crate interprets fragment
//! semantics.

use bitcoin::ScriptBuf;
use miniscript::descriptor::{ConversionError, DefiniteDescriptorKey, DescriptorPublicKey};
use miniscript::{translate_hash_clone, Miniscript, ScriptContext, Segwitv0, Tap, TranslateErr, TranslatePk, Translator};

use crate::Error;

/// Which script context a fragment compiles under.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum CompileCtx {
    /// Fragments inside `wsh(...)` or `sh(...)`.
    WitnessScript,
    /// Fragments inside `tr(...)`.
    Tapscript,
}

/// Replaces every key's wildcard with a fixed child index.
struct AtIndex(u32);

impl Translator<DescriptorPublicKey, DefiniteDescriptorKey, ConversionError> for AtIndex {
    fn pk(&mut self, pk: &DescriptorPublicKey) -> Result<DefiniteDescriptorKey, ConversionError> {
        pk.clone().at_derivation_index(self.0)
    }

    translate_hash_clone!(DescriptorPublicKey, DefiniteDescriptorKey, ConversionError);
}

/// Validates that the compiler accepts a fragment in the given context.
pub(crate) fn check(fragment: &str, ctx: CompileCtx) -> Result<(), Error> {
    match ctx {
        CompileCtx::WitnessScript => {
            Miniscript::<DescriptorPublicKey, Segwitv0>::from_str_insane(fragment)
                .map(|_| ())
                .map_err(|_| Error::UnknownOperator(fragment.to_owned()))
        }
        CompileCtx::Tapscript => Miniscript::<DescriptorPublicKey, Tap>::from_str_insane(fragment)
            .map(|_| ())
            .map_err(|_| Error::UnknownOperator(fragment.to_owned())),
    }
}

/// Compiles a fragment to script bytes, resolving wildcards at `child_num`.
pub(crate) fn compile(fragment: &str, child_num: u32, ctx: CompileCtx) -> Result<ScriptBuf, Error> {
    match ctx {
        CompileCtx::WitnessScript => compile_in::<Segwitv0>(fragment, child_num),
        CompileCtx::Tapscript => compile_in::<Tap>(fragment, child_num),
    }
}

fn compile_in<Ctx: ScriptContext>(fragment: &str, child_num: u32) -> Result<ScriptBuf, Error> {
    let ms = Miniscript::<DescriptorPublicKey, Ctx>::from_str_insane(fragment)
        .map_err(Error::Miniscript)?;
    let derived = ms.translate_pk(&mut AtIndex(child_num)).map_err(|e| match e {
        TranslateErr::TranslatorErr(e) => Error::InvalidKey(e.to_string()),
        TranslateErr::OuterError(e) => Error::Miniscript(e),
    })?;
    Ok(derived.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_simple_fragments() {
        let script = compile(
            "and_v(v:pk(02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5),older(144))",
            0,
            CompileCtx::WitnessScript,
        )
        .unwrap();
        assert!(!script.is_empty());
    }

    #[test]
    fn resolves_wildcards_at_child_index() {
        let frag = "pk(xpub6ERApfZwUNrhLCkDtcHTcxd75RbzS1ed54G1LkBUHQVHQKqhMkhgbmJbZRkrgZw4koxb5JaHWkY4ALHY2grBGRjaDMzQLcgJvLJuZZvRcEL/0/*)";
        let at_zero = compile(frag, 0, CompileCtx::WitnessScript).unwrap();
        let at_one = compile(frag, 1, CompileCtx::WitnessScript).unwrap();
        assert_ne!(at_zero, at_one);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(check("notafragment(deadbeef)", CompileCtx::WitnessScript).is_err());
    }
}
