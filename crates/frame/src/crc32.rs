//! Table-driven CRC-32 error detection
//!
//! Non-reflected CRC-32 over generator `0x04C11DB7`, register initialised to
//! all ones and inverted on output. Bit sequences are left-padded with zeros
//! to a byte boundary before the bytes are fed through the table, and the
//! checksum is appended most-significant bit first.
//!
//! With these init/final-XOR constants the checksum of a clean
//! `data ‖ checksum(data)` frame is not zero but the fixed residue
//! [`CLEAN_RESIDUE`]. [`Crc32Codec::residual`] folds that constant out, so a
//! residual of zero means the frame arrived intact. The check only detects
//! errors; it never corrects them.

use crate::link::{LinkAlgorithm, LinkCodec, LinkDecoded};
use crate::{FrameError, Result};
use bitlink_core::Bits;
use tracing::debug;

/// Generator polynomial (IEEE 802.3), normal form
pub const CRC32_POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Register value before the first byte
pub const CRC32_INIT: u32 = 0xFFFF_FFFF;

/// Mask applied to the register after the last byte
pub const CRC32_XOR_OUT: u32 = 0xFFFF_FFFF;

/// Checksum of any clean frame under this parameterisation
pub const CLEAN_RESIDUE: u32 = 0x38FB_2284;

/// Width of the appended checksum
pub const CHECKSUM_BITS: usize = 32;

/// Remainders of every byte value divided by the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crc32Table {
    entries: [u32; 256],
}

impl Crc32Table {
    /// Run eight rounds of polynomial division for each byte value
    pub const fn build() -> Self {
        let mut entries = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u32) << 24;
            let mut round = 0;
            while round < 8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ CRC32_POLYNOMIAL
                } else {
                    crc << 1
                };
                round += 1;
            }
            entries[i] = crc;
            i += 1;
        }
        Self { entries }
    }

    /// Table entry for `index`
    pub fn entry(&self, index: u8) -> u32 {
        self.entries[index as usize]
    }

    /// All 256 entries
    pub fn entries(&self) -> &[u32; 256] {
        &self.entries
    }
}

/// Process-wide table, computed at compile time
pub static CRC32_TABLE: Crc32Table = Crc32Table::build();

/// CRC-32 frame encoder and verifier
#[derive(Debug, Clone, Copy)]
pub struct Crc32Codec {
    table: &'static Crc32Table,
}

impl Default for Crc32Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32Codec {
    /// Create a codec backed by the shared table
    pub fn new() -> Self {
        Self {
            table: &CRC32_TABLE,
        }
    }

    /// Checksum a byte sequence
    pub fn checksum_bytes(&self, bytes: &[u8]) -> u32 {
        let crc = bytes.iter().fold(CRC32_INIT, |crc, &byte| {
            let index = ((crc >> 24) as u8) ^ byte;
            (crc << 8) ^ self.table.entry(index)
        });
        crc ^ CRC32_XOR_OUT
    }

    /// Checksum a bit sequence, left-padding it to a byte boundary first
    pub fn checksum(&self, bits: &Bits) -> u32 {
        self.checksum_bytes(&bits.to_bytes_left_padded())
    }

    /// Append the 32-bit checksum of `data` to `data`
    pub fn encode_frame(&self, data: &Bits) -> Bits {
        let checksum = self.checksum(data);
        let mut frame = Bits::with_capacity(data.len() + CHECKSUM_BITS);
        frame.extend_from(data);
        for shift in (0..CHECKSUM_BITS).rev() {
            frame.push((checksum >> shift) & 1 == 1);
        }
        debug!(
            "CRC-32 encoded {} data bits, checksum {:#010x}",
            data.len(),
            checksum
        );
        frame
    }

    /// Full-frame checksum with the clean residue folded out
    ///
    /// Zero iff no bit of the frame changed since [`Self::encode_frame`],
    /// up to the usual CRC-32 collision odds for multi-bit patterns.
    pub fn residual(&self, frame: &Bits) -> Result<u32> {
        if frame.len() < CHECKSUM_BITS {
            return Err(FrameError::FrameTooShort {
                min: CHECKSUM_BITS,
                actual: frame.len(),
            });
        }
        Ok(self.checksum(frame) ^ CLEAN_RESIDUE)
    }

    /// Check whether a frame arrived intact
    pub fn verify(&self, frame: &Bits) -> bool {
        matches!(self.residual(frame), Ok(0))
    }

    /// Verify a frame and strip the checksum from it
    pub fn check(&self, frame: &Bits) -> Result<Bits> {
        let residual = self.residual(frame)?;
        if residual != 0 {
            return Err(FrameError::IntegrityFailure { residual });
        }
        Ok(frame.slice(0..frame.len() - CHECKSUM_BITS))
    }
}

impl LinkCodec for Crc32Codec {
    fn algorithm(&self) -> LinkAlgorithm {
        LinkAlgorithm::Crc32
    }

    fn encode(&self, data: &Bits) -> Result<Bits> {
        Ok(self.encode_frame(data))
    }

    fn decode(&self, frame: &Bits) -> Result<LinkDecoded> {
        let residual = self.residual(frame)?;
        debug!("CRC-32 residual {:#010x} over {} bits", residual, frame.len());
        if residual != 0 {
            return Ok(LinkDecoded::Rejected { residual });
        }
        Ok(LinkDecoded::Intact {
            data: frame.slice(0..frame.len() - CHECKSUM_BITS),
        })
    }

    fn overhead_bits(&self, _data_len: usize) -> usize {
        CHECKSUM_BITS
    }
}
