//! Hexadecimal text form of [`PerceptualHash`].
//!
//! A hash of `n` bits renders as exactly `ceil(n / 4)` lowercase hex digits,
//! reading the bits as one big-endian integer (64 bits → 16 digits). Parsing is
//! strict: non-hex characters, a digit count that does not match the expected
//! bit length, or set bits in the leading padding are all rejected instead of
//! being silently truncated or padded.

use std::fmt;
use std::str::FromStr;

use crate::error::{PhashError, Result};
use crate::phash::PerceptualHash;

impl PerceptualHash {
    /// Render as lowercase hexadecimal, `ceil(bit_len / 4)` characters.
    pub fn to_hex(&self) -> String {
        let full = hex::encode(&self.bytes);
        let skip = full.len() - hex_len(self.bit_len);
        full[skip..].to_string()
    }

    /// Parse a hex string, taking the bit length as four bits per character.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Self::from_hex_with_bits(hex_str, hex_str.len() * 4)
    }

    /// Parse a hex string that must encode exactly `bit_len` bits.
    pub fn from_hex_with_bits(hex_str: &str, bit_len: usize) -> Result<Self> {
        if hex_str.is_empty() {
            return Err(PhashError::Format("empty hash string".into()));
        }
        if let Some(bad) = hex_str.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(PhashError::Format(format!(
                "invalid hexadecimal value '{hex_str}' (unexpected character {bad:?})"
            )));
        }

        let expected = hex_len(bit_len);
        if hex_str.len() != expected {
            return Err(PhashError::Format(format!(
                "expected {expected} hex characters for a {bit_len}-bit hash, got {}",
                hex_str.len()
            )));
        }

        let padded;
        let even = if hex_str.len() % 2 == 1 {
            padded = format!("0{hex_str}");
            padded.as_str()
        } else {
            hex_str
        };
        let bytes = hex::decode(even)
            .map_err(|e| PhashError::Format(format!("invalid hexadecimal value: {e}")))?;

        let hash = Self { bytes, bit_len };
        let pad = hash.pad_bits();
        if pad > 0 && hash.bytes[0] >> (8 - pad) != 0 {
            return Err(PhashError::Format(format!(
                "hash '{hex_str}' has bits set beyond its {bit_len}-bit length"
            )));
        }

        Ok(hash)
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PerceptualHash {
    type Err = PhashError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

fn hex_len(bit_len: usize) -> usize {
    bit_len.div_ceil(4)
}
