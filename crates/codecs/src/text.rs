//! Text codec implementations

use crate::{CodecError, Result};
use bitlink_core::Bits;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Bits emitted per character
pub const BITS_PER_CHAR: usize = 8;

/// Generic text codec trait
pub trait TextCodec {
    /// Encode text to bits
    fn encode(&self, text: &str) -> Result<Bits>;

    /// Decode bits to text
    fn decode(&self, bits: &Bits) -> Result<String>;
}

/// What to do with a trailing group shorter than a full character
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingBits {
    /// Fail with [`CodecError::MalformedBits`]
    #[default]
    Reject,
    /// Drop the partial group silently
    Discard,
}

/// Fixed-width codec: one byte per character, most-significant bit first
///
/// Only code points up to 255 are representable. Decoding interprets every
/// 8-bit group directly as a code point, so any decoded byte maps back to a
/// character and `decode(encode(t)) == t` holds for all single-byte text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitTextCodec {
    trailing: TrailingBits,
}

impl BitTextCodec {
    /// Create a codec that rejects bit strings with a partial trailing byte
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with an explicit policy for partial trailing bytes
    pub fn with_trailing(trailing: TrailingBits) -> Self {
        Self { trailing }
    }

    /// Trailing-bit policy in effect
    pub fn trailing(&self) -> TrailingBits {
        self.trailing
    }

    /// Decode every whole character and report how many trailing bits were left over
    pub fn decode_partial(&self, bits: &Bits) -> (String, usize) {
        let whole = bits.len() - bits.len() % BITS_PER_CHAR;
        let text = bits.as_slice()[..whole]
            .chunks_exact(BITS_PER_CHAR)
            .map(|group| char::from(group.iter().fold(0u8, |acc, &bit| (acc << 1) | bit)))
            .collect();
        (text, bits.len() - whole)
    }
}

impl TextCodec for BitTextCodec {
    fn encode(&self, text: &str) -> Result<Bits> {
        let mut bytes = Vec::with_capacity(text.len());
        for (index, ch) in text.chars().enumerate() {
            let code_point = ch as u32;
            let byte = u8::try_from(code_point).map_err(|_| CodecError::UnsupportedCharacter {
                ch,
                index,
                code_point,
            })?;
            bytes.push(byte);
        }
        Ok(Bits::from_bytes(&bytes))
    }

    fn decode(&self, bits: &Bits) -> Result<String> {
        let remainder = bits.len() % BITS_PER_CHAR;
        if remainder != 0 {
            match self.trailing {
                TrailingBits::Reject => {
                    return Err(CodecError::MalformedBits { len: bits.len() });
                }
                TrailingBits::Discard => {
                    debug!("Discarding {} trailing bits", remainder);
                }
            }
        }

        let text = bits
            .as_slice()
            .chunks_exact(BITS_PER_CHAR)
            .map(|group| {
                let byte = group.iter().fold(0u8, |acc, &bit| (acc << 1) | bit);
                char::from(byte)
            })
            .collect();
        Ok(text)
    }
}

/// Left-pad `bits` with zeros up to `min_len`
///
/// Used by the sender for raw operator-supplied frames so a CRC frame always
/// carries at least `min_len` data bits. Sequences already long enough are
/// returned unchanged.
pub fn pad_to_min_len(bits: &Bits, min_len: usize) -> Bits {
    if bits.len() >= min_len {
        return bits.clone();
    }
    let mut padded = Bits::zeros(min_len - bits.len());
    padded.extend_from(bits);
    padded
}
