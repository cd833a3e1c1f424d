// SPDX-License-Identifier: CC0-1.0

//! Descriptor checksum
//!
//! The 8-character checksum that may trail a descriptor string after a `#`
//! separator. The algorithm is the one specified in [BIP-380]: a BCH-style
//! code over base-32 symbols derived from a 94-character input alphabet,
//! emitted in the bech32 character set.
//!
//! [BIP-380]: <https://github.com/bitcoin/bips/blob/master/bip-0380.mediawiki>

use core::convert::TryFrom;
use core::fmt;

use bech32::primitives::checksum::PackedFe32;
use bech32::{Checksum, Fe32};

use crate::Error;

/// The number of checksum characters after the `#` separator.
pub const CHECKSUM_LENGTH: usize = 8;

const CODE_LENGTH: usize = 32767;

/// Every character allowed in a descriptor string, in checksum symbol order.
///
/// The order is meaningful: the low five bits of a character's position feed
/// the polynomial directly, the high bits are folded in once per group of
/// three characters.
pub const INPUT_CHARSET: &str = "0123456789()[],'/*abcdefgh@:$%{}IJKLMNOPQRSTUVWXYZ&+-.;<=>?!^_|~ijklmnopqrstuvwxyzABCDEFGH`#\"\\ ";

/// Position of every ASCII byte in [`INPUT_CHARSET`], or `None` if the
/// character may not appear in a descriptor.
pub const VALID_CHARS: [Option<u8>; 128] = build_position_table();

const fn build_position_table() -> [Option<u8>; 128] {
    let mut table = [None; 128];
    let bytes = INPUT_CHARSET.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        table[bytes[i] as usize] = Some(i as u8);
        i += 1;
    }
    table
}

/// Compute the checksum of a descriptor string.
///
/// No syntactic validation is done on the input; any string over the
/// descriptor character set has a checksum.
pub fn desc_checksum(desc: &str) -> Result<String, Error> {
    let mut eng = Engine::new();
    eng.input(desc)?;
    Ok(eng.checksum())
}

/// Split a descriptor from its checksum and verify the latter, if present.
///
/// Returns the descriptor body without the checksum suffix. Used by the
/// various `FromStr` implementations before any structural parsing happens.
pub(crate) fn verify_checksum(s: &str) -> Result<&str, Error> {
    let mut parts = s.splitn(2, '#');
    let body = parts.next().unwrap();
    if let Some(checksum) = parts.next() {
        if checksum.contains('#') {
            return Err(Error::ChecksumFormat("multiple '#' symbols".to_owned()));
        }
        if checksum.len() != CHECKSUM_LENGTH {
            return Err(Error::ChecksumFormat(format!(
                "expected {} checksum characters, got {}",
                CHECKSUM_LENGTH,
                checksum.len()
            )));
        }
        let expected = desc_checksum(body)?;
        if checksum != expected {
            return Err(Error::ChecksumMismatch {
                expected,
                found: checksum.to_owned(),
            });
        }
    }
    Ok(body)
}

/// An engine which computes the descriptor checksum of whatever is fed to it.
pub struct Engine {
    inner: bech32::primitives::checksum::Engine<DescriptorChecksum>,
    cls: u64,
    clscount: u64,
}

impl Default for Engine {
    fn default() -> Engine { Engine::new() }
}

impl Engine {
    /// Constructs an engine with no input.
    pub fn new() -> Self {
        Engine { inner: bech32::primitives::checksum::Engine::new(), cls: 0, clscount: 0 }
    }

    /// Inputs some data into the checksum engine.
    ///
    /// On error the engine is left in an indeterminate state; further input
    /// is safe but the resulting checksum is meaningless.
    pub fn input(&mut self, s: &str) -> Result<(), Error> {
        for ch in s.chars() {
            let pos = VALID_CHARS
                .get(ch as usize)
                .copied()
                .flatten()
                .ok_or_else(|| {
                    Error::ChecksumFormat(format!("invalid character '{}'", ch))
                })? as u64;

            let fe = Fe32::try_from(pos & 31).expect("masked to 5 bits");
            self.inner.input_fe(fe);

            self.cls = self.cls * 3 + (pos >> 5);
            self.clscount += 1;
            if self.clscount == 3 {
                let fe = Fe32::try_from(self.cls).expect("cls is valid");
                self.inner.input_fe(fe);
                self.cls = 0;
                self.clscount = 0;
            }
        }
        Ok(())
    }

    /// Obtains the checksum characters of all the data fed so far, without
    /// allocating. To get a `String`, use [`Self::checksum`].
    pub fn checksum_chars(&mut self) -> [char; CHECKSUM_LENGTH] {
        if self.clscount > 0 {
            let fe = Fe32::try_from(self.cls).expect("cls is valid");
            self.inner.input_fe(fe);
        }
        self.inner.input_target_residue();

        let mut chars = ['\0'; CHECKSUM_LENGTH];
        let mut remaining = CHECKSUM_LENGTH;
        for checksum_ch in &mut chars {
            remaining -= 1;
            let unpacked = self.inner.residue().unpack(remaining);
            let fe = Fe32::try_from(unpacked).expect("5 bits fits in an fe32");
            *checksum_ch = fe.to_char();
        }
        chars
    }

    /// Obtains the checksum of all the data fed so far.
    pub fn checksum(&mut self) -> String {
        String::from_iter(self.checksum_chars().iter().copied())
    }
}

/// The BIP-380 descriptor checksum code.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum DescriptorChecksum {}

/// Generator coefficients, taken from BIP-380.
#[rustfmt::skip]
const GEN: [u64; 5] = [0xf5dee51989, 0xa9fdca3312, 0x1bab10e32d, 0x3706b1677a, 0x644d626ffd];

impl Checksum for DescriptorChecksum {
    type MidstateRepr = u64; // 40 bits (8 * 5) are needed.
    const CHECKSUM_LENGTH: usize = CHECKSUM_LENGTH;
    const CODE_LENGTH: usize = CODE_LENGTH;
    const GENERATOR_SH: [u64; 5] = GEN;
    const TARGET_RESIDUE: u64 = 1;
}

/// A wrapper around a `fmt::Formatter` which checksums everything written
/// through it.
pub struct Formatter<'f, 'a> {
    fmt: &'f mut fmt::Formatter<'a>,
    eng: Engine,
}

impl<'f, 'a> Formatter<'f, 'a> {
    /// Constructs a new `Formatter`, wrapping a given `fmt::Formatter`.
    pub fn new(f: &'f mut fmt::Formatter<'a>) -> Self {
        Formatter { fmt: f, eng: Engine::new() }
    }

    /// Writes `#` and the checksum of everything written so far into the
    /// underlying `fmt::Formatter`.
    pub fn write_checksum(&mut self) -> fmt::Result {
        use fmt::Write;
        self.fmt.write_char('#')?;
        for ch in self.eng.checksum_chars().iter().copied() {
            self.fmt.write_char(ch)?;
        }
        Ok(())
    }

    /// Writes the checksum unless the formatter has "alternate" display on.
    pub fn write_checksum_if_not_alt(&mut self) -> fmt::Result {
        if !self.fmt.alternate() {
            self.write_checksum()?;
        }
        Ok(())
    }
}

impl<'f, 'a> fmt::Write for Formatter<'f, 'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.fmt.write_str(s)?;
        self.eng.input(s).map_err(|_| fmt::Error)
    }
}
