//! Hamming single-error-correcting code
//!
//! Frames are 1-indexed: parity bits sit at the power-of-two positions
//! (1, 2, 4, 8, ...) and data bits fill every other position in their
//! original order. Parity bit `p` is the even parity of every position `i`
//! with `i & p != 0`.
//!
//! Correction is only sound when at most one bit of the frame changed. Two
//! or more flips yield a syndrome that names some unrelated position; the
//! decoder then "corrects" the wrong bit and has no way to notice. Callers
//! must treat every correction as unconfirmed.

use crate::link::{LinkAlgorithm, LinkCodec, LinkDecoded};
use crate::{FrameError, Result};
use bitlink_core::Bits;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sizes of a Hamming frame derived from its data length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HammingParams {
    /// Data bits `m`
    pub data_bits: usize,
    /// Parity bits `r`
    pub parity_bits: usize,
    /// Frame bits `n = m + r`
    pub frame_bits: usize,
}

impl HammingParams {
    /// Smallest `r` with `2^r >= m + r + 1`
    pub fn parity_count(data_bits: usize) -> usize {
        let mut r = 0;
        while (1usize << r) < data_bits + r + 1 {
            r += 1;
        }
        r
    }

    /// Parameters for encoding `data_bits` bits
    pub fn for_data_len(data_bits: usize) -> Result<Self> {
        if data_bits == 0 {
            return Err(FrameError::EmptyData);
        }
        let parity_bits = Self::parity_count(data_bits);
        Ok(Self {
            data_bits,
            parity_bits,
            frame_bits: data_bits + parity_bits,
        })
    }

    /// Parameters of a received frame of `frame_bits` bits
    ///
    /// Fails for lengths no data length encodes to (0, 1, 2 and every
    /// power of two).
    pub fn for_frame_len(frame_bits: usize) -> Result<Self> {
        let invalid = FrameError::InvalidFrameLength { len: frame_bits };
        if frame_bits < 3 {
            return Err(invalid);
        }
        // one parity position per power of two not above n
        let parity_bits = (usize::BITS - frame_bits.leading_zeros()) as usize;
        let data_bits = frame_bits - parity_bits;
        if data_bits == 0 || Self::parity_count(data_bits) != parity_bits {
            return Err(invalid);
        }
        Ok(Self {
            data_bits,
            parity_bits,
            frame_bits,
        })
    }

    /// Whether 1-indexed `position` holds a parity bit
    pub fn is_parity_position(position: usize) -> bool {
        position.is_power_of_two()
    }

    /// Parity positions in increasing order
    pub fn parity_positions(&self) -> impl Iterator<Item = usize> {
        (0..self.parity_bits).map(|k| 1usize << k)
    }

    /// Extra bits per data bit
    pub fn overhead(&self) -> f64 {
        self.parity_bits as f64 / self.data_bits as f64
    }

    /// Data bits per transmitted bit
    pub fn code_rate(&self) -> f64 {
        self.data_bits as f64 / self.frame_bits as f64
    }
}

/// Outcome of the syndrome check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeStatus {
    /// Syndrome zero
    Clean,
    /// Syndrome named a position inside the frame, which was flipped
    Corrected {
        position: usize,
        original_bit: u8,
        corrected_bit: u8,
    },
    /// Syndrome points past the end of the frame: two or more bits flipped
    OutOfRange { syndrome: usize },
}

/// Result of decoding one Hamming frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HammingDecoded {
    pub params: HammingParams,
    /// Data bits extracted after correction
    pub data: Bits,
    /// Frame after in-place correction
    pub frame: Bits,
    pub syndrome: usize,
    pub status: DecodeStatus,
}

impl HammingDecoded {
    pub fn error_detected(&self) -> bool {
        self.status != DecodeStatus::Clean
    }

    pub fn error_corrected(&self) -> bool {
        matches!(self.status, DecodeStatus::Corrected { .. })
    }

    /// 1-indexed position that was flipped, if any
    pub fn position(&self) -> Option<usize> {
        match self.status {
            DecodeStatus::Corrected { position, .. } => Some(position),
            _ => None,
        }
    }
}

/// Hamming encoder and syndrome decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingCodec;

impl HammingCodec {
    pub fn new() -> Self {
        Self
    }

    /// Interleave `data` with its parity bits
    pub fn encode(&self, data: &Bits) -> Result<Bits> {
        let params = HammingParams::for_data_len(data.len())?;
        let n = params.frame_bits;

        // slot 0 unused so indices match frame positions
        let mut slots = vec![0u8; n + 1];
        let mut data_bits = data.iter();
        for (position, slot) in slots.iter_mut().enumerate().skip(1) {
            if !HammingParams::is_parity_position(position) {
                *slot = data_bits.next().unwrap_or(0);
            }
        }

        for p in params.parity_positions() {
            slots[p] = parity_over(&slots, p);
        }

        debug!(
            "Hamming encoded m={} r={} n={}",
            params.data_bits, params.parity_bits, n
        );
        Ok(Bits::from_bits(slots.split_off(1))?)
    }

    /// Syndrome of a received frame; zero when every parity check passes
    pub fn syndrome(&self, frame: &Bits) -> Result<usize> {
        let params = HammingParams::for_frame_len(frame.len())?;
        Ok(syndrome_of(&one_indexed(frame), &params))
    }

    /// Check parity, correct a single flipped bit, and extract the data
    pub fn decode(&self, frame: &Bits) -> Result<HammingDecoded> {
        let params = HammingParams::for_frame_len(frame.len())?;
        let syndrome = syndrome_of(&one_indexed(frame), &params);

        let mut corrected = frame.clone();
        let status = if syndrome == 0 {
            DecodeStatus::Clean
        } else if syndrome <= params.frame_bits {
            let original_bit = frame[syndrome - 1];
            let corrected_bit = corrected.flip(syndrome - 1)?;
            DecodeStatus::Corrected {
                position: syndrome,
                original_bit,
                corrected_bit,
            }
        } else {
            DecodeStatus::OutOfRange { syndrome }
        };
        debug!("Hamming syndrome {} over {} bits: {:?}", syndrome, params.frame_bits, status);

        let data = corrected
            .iter()
            .enumerate()
            .filter(|(index, _)| !HammingParams::is_parity_position(index + 1))
            .map(|(_, bit)| bit == 1)
            .collect();

        Ok(HammingDecoded {
            params,
            data,
            frame: corrected,
            syndrome,
            status,
        })
    }
}

fn one_indexed(frame: &Bits) -> Vec<u8> {
    let mut slots = Vec::with_capacity(frame.len() + 1);
    slots.push(0);
    slots.extend(frame.iter());
    slots
}

fn parity_over(slots: &[u8], p: usize) -> u8 {
    slots
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(position, _)| position & p != 0)
        .fold(0, |acc, (_, &bit)| acc ^ bit)
}

fn syndrome_of(slots: &[u8], params: &HammingParams) -> usize {
    params
        .parity_positions()
        .filter(|&p| parity_over(slots, p) != 0)
        .sum()
}

impl LinkCodec for HammingCodec {
    fn algorithm(&self) -> LinkAlgorithm {
        LinkAlgorithm::Hamming
    }

    fn encode(&self, data: &Bits) -> Result<Bits> {
        HammingCodec::encode(self, data)
    }

    fn decode(&self, frame: &Bits) -> Result<LinkDecoded> {
        let decoded = HammingCodec::decode(self, frame)?;
        Ok(match decoded.status {
            DecodeStatus::Clean => LinkDecoded::Intact { data: decoded.data },
            DecodeStatus::Corrected { position, .. } => LinkDecoded::Corrected {
                data: decoded.data,
                position,
            },
            DecodeStatus::OutOfRange { syndrome } => LinkDecoded::Suspect {
                data: decoded.data,
                syndrome,
            },
        })
    }

    fn overhead_bits(&self, data_len: usize) -> usize {
        HammingParams::parity_count(data_len)
    }
}
