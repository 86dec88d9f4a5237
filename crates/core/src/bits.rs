//! Flat bit sequences and their textual form
//!
//! A [`Bits`] value holds one `u8` per bit, each either `0` or `1`. Index 0
//! is the first bit on the wire and the most-significant bit of the first
//! byte; every layer of the pipeline relies on that single ordering.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, Range};
use std::str::FromStr;

/// Ordered sequence of binary digits
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Bits {
    data: Vec<u8>,
}

impl Bits {
    /// Create an empty bit sequence
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create an empty bit sequence with room for `capacity` bits
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Create a sequence of `len` zero bits
    pub fn zeros(len: usize) -> Self {
        Self { data: vec![0; len] }
    }

    /// Create a sequence from raw `0`/`1` values
    pub fn from_bits(data: Vec<u8>) -> Result<Self> {
        if let Some(position) = data.iter().position(|&b| b > 1) {
            return Err(CoreError::InvalidBitValue {
                position,
                value: data[position],
            });
        }
        Ok(Self { data })
    }

    /// Parse a string made only of `'0'` and `'1'` characters
    pub fn parse(text: &str) -> Result<Self> {
        let mut data = Vec::with_capacity(text.len());
        for (position, ch) in text.chars().enumerate() {
            match ch {
                '0' => data.push(0),
                '1' => data.push(1),
                found => return Err(CoreError::InvalidBit { position, found }),
            }
        }
        Ok(Self { data })
    }

    /// Expand bytes into bits, most-significant bit first
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 8);
        for &byte in bytes {
            for shift in (0..8).rev() {
                data.push((byte >> shift) & 1);
            }
        }
        Self { data }
    }

    /// Render the low `width` bits of `value`, most-significant bit first
    pub fn from_u32(value: u32, width: usize) -> Result<Self> {
        if width > 32 {
            return Err(CoreError::WidthTooLarge { width });
        }
        let data = (0..width)
            .rev()
            .map(|shift| ((value >> shift) & 1) as u8)
            .collect();
        Ok(Self { data })
    }

    /// Number of bits
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw `0`/`1` values
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Bit at `index`, if in range
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    /// Overwrite the bit at `index`
    pub fn set(&mut self, index: usize, bit: bool) -> Result<()> {
        let len = self.data.len();
        let slot = self
            .data
            .get_mut(index)
            .ok_or(CoreError::IndexOutOfRange { index, len })?;
        *slot = bit as u8;
        Ok(())
    }

    /// Invert the bit at `index`, returning its new value
    pub fn flip(&mut self, index: usize) -> Result<u8> {
        let len = self.data.len();
        let slot = self
            .data
            .get_mut(index)
            .ok_or(CoreError::IndexOutOfRange { index, len })?;
        *slot ^= 1;
        Ok(*slot)
    }

    /// Append one bit
    pub fn push(&mut self, bit: bool) {
        self.data.push(bit as u8);
    }

    /// Append every bit of `other`
    pub fn extend_from(&mut self, other: &Bits) {
        self.data.extend_from_slice(&other.data);
    }

    /// Copy out the bits in `range`
    ///
    /// Panics if the range is out of bounds, like slice indexing.
    pub fn slice(&self, range: Range<usize>) -> Bits {
        Bits {
            data: self.data[range].to_vec(),
        }
    }

    /// Iterate over the bits as `0`/`1` values
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.iter().copied()
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data.iter().filter(|&&b| b == 1).count()
    }

    /// Zero bits needed in front of the sequence to reach a byte boundary
    pub fn padding_to_byte(&self) -> usize {
        (8 - self.data.len() % 8) % 8
    }

    /// Pack into bytes after left-padding with zeros to a byte boundary
    pub fn to_bytes_left_padded(&self) -> Vec<u8> {
        let pad = self.padding_to_byte();
        let mut bytes = Vec::with_capacity((self.data.len() + pad) / 8);
        let mut acc = 0u8;
        let mut filled = pad;
        for &bit in &self.data {
            acc = (acc << 1) | bit;
            filled += 1;
            if filled == 8 {
                bytes.push(acc);
                acc = 0;
                filled = 0;
            }
        }
        bytes
    }
}

impl Index<usize> for Bits {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index]
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .data
            .iter()
            .map(|&b| if b == 1 { '1' } else { '0' })
            .collect();
        f.write_str(&text)
    }
}

impl FromStr for Bits {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Bits::parse(s)
    }
}

impl From<Bits> for String {
    fn from(bits: Bits) -> Self {
        bits.to_string()
    }
}

impl TryFrom<String> for Bits {
    type Error = CoreError;

    fn try_from(text: String) -> Result<Self> {
        Bits::parse(&text)
    }
}

impl FromIterator<bool> for Bits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|b| b as u8).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_parse_and_display() {
        let bits = Bits::parse("01000001").unwrap();
        assert_eq!(bits.len(), 8);
        assert_eq!(bits[1], 1);
        assert_eq!(bits.to_string(), "01000001");
    }

    #[test]
    fn test_parse_rejects_non_binary() {
        let err = Bits::parse("01a1").unwrap_err();
        assert_eq!(err, CoreError::InvalidBit { position: 2, found: 'a' });
    }

    #[test]
    fn test_from_bits_rejects_values_above_one() {
        let err = Bits::from_bits(vec![0, 1, 2]).unwrap_err();
        assert_eq!(err, CoreError::InvalidBitValue { position: 2, value: 2 });
    }

    #[test]
    fn test_from_bytes_is_msb_first() {
        assert_eq!(Bits::from_bytes(&[0x41]).to_string(), "01000001");
    }

    #[test]
    fn test_from_u32() {
        assert_eq!(Bits::from_u32(5, 4).unwrap().to_string(), "0101");
        assert_eq!(Bits::from_u32(0x8000_0001, 32).unwrap().count_ones(), 2);
        assert!(Bits::from_u32(1, 33).is_err());
    }

    #[test]
    fn test_left_padded_packing() {
        let bits = Bits::parse("1011").unwrap();
        assert_eq!(bits.padding_to_byte(), 4);
        assert_eq!(bits.to_bytes_left_padded(), vec![0b0000_1011]);

        let bits = Bits::parse("110000000001").unwrap();
        assert_eq!(bits.to_bytes_left_padded(), vec![0b0000_1100, 0b0000_0001]);
    }

    #[test]
    fn test_flip_and_set() {
        let mut bits = Bits::zeros(3);
        assert_eq!(bits.flip(1).unwrap(), 1);
        bits.set(2, true).unwrap();
        assert_eq!(bits.to_string(), "011");
        assert_eq!(
            bits.flip(3).unwrap_err(),
            CoreError::IndexOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_serde_uses_text_form() {
        let bits = Bits::parse("1010").unwrap();
        let json = serde_json::to_string(&bits).unwrap();
        assert_eq!(json, "\"1010\"");
        let back: Bits = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bits);
        assert!(serde_json::from_str::<Bits>("\"10x\"").is_err());
    }

    #[quickcheck]
    fn prop_bytes_pack_back(bytes: Vec<u8>) -> bool {
        Bits::from_bytes(&bytes).to_bytes_left_padded() == bytes
    }
}
