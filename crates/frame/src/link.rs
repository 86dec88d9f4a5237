//! Unified link layer interface
//!
//! Both integrity codes sit behind [`LinkCodec`] so the pipeline selects
//! one by configuration. CRC-32 only detects; Hamming detects and corrects.

use crate::crc32::Crc32Codec;
use crate::hamming::HammingCodec;
use crate::{FrameError, Result};
use bitlink_core::Bits;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integrity code applied to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAlgorithm {
    Crc32,
    Hamming,
}

impl LinkAlgorithm {
    pub const ALL: [LinkAlgorithm; 2] = [LinkAlgorithm::Crc32, LinkAlgorithm::Hamming];

    pub fn capability(&self) -> Capability {
        match self {
            LinkAlgorithm::Crc32 => Capability::Detect,
            LinkAlgorithm::Hamming => Capability::DetectAndCorrect,
        }
    }
}

impl fmt::Display for LinkAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkAlgorithm::Crc32 => f.write_str("CRC-32"),
            LinkAlgorithm::Hamming => f.write_str("Hamming"),
        }
    }
}

impl FromStr for LinkAlgorithm {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "crc32" | "crc-32" | "crc" => Ok(LinkAlgorithm::Crc32),
            "hamming" => Ok(LinkAlgorithm::Hamming),
            _ => Err(FrameError::UnknownAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// What a code can do about a damaged frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    Detect,
    DetectAndCorrect,
}

impl Capability {
    pub fn can_correct(&self) -> bool {
        matches!(self, Capability::DetectAndCorrect)
    }
}

/// Verdict on one received frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecoded {
    /// Every check passed
    Intact { data: Bits },
    /// One bit was flipped back at the 1-indexed `position`
    Corrected { data: Bits, position: usize },
    /// Damage detected that could not be located; data is as received
    Suspect { data: Bits, syndrome: usize },
    /// Detection-only code found damage; the frame must be dropped
    Rejected { residual: u32 },
}

impl LinkDecoded {
    /// Recovered data, unless the frame was rejected
    pub fn data(&self) -> Option<&Bits> {
        match self {
            LinkDecoded::Intact { data }
            | LinkDecoded::Corrected { data, .. }
            | LinkDecoded::Suspect { data, .. } => Some(data),
            LinkDecoded::Rejected { .. } => None,
        }
    }

    pub fn error_detected(&self) -> bool {
        !matches!(self, LinkDecoded::Intact { .. })
    }

    pub fn error_corrected(&self) -> bool {
        matches!(self, LinkDecoded::Corrected { .. })
    }
}

/// Link layer code: encode on send, verify or correct on receive
pub trait LinkCodec: Send + Sync {
    /// Which code this is
    fn algorithm(&self) -> LinkAlgorithm;

    /// Detection-only or correction-capable
    fn capability(&self) -> Capability {
        self.algorithm().capability()
    }

    /// Build the transmitted frame for `data`
    fn encode(&self, data: &Bits) -> Result<Bits>;

    /// Check a received frame and recover its data
    fn decode(&self, frame: &Bits) -> Result<LinkDecoded>;

    /// Bits added on top of `data_len` data bits
    fn overhead_bits(&self, data_len: usize) -> usize;

    /// Data bits per transmitted bit
    fn code_rate(&self, data_len: usize) -> f64 {
        let total = data_len + self.overhead_bits(data_len);
        if total == 0 {
            return 0.0;
        }
        data_len as f64 / total as f64
    }
}

/// Codec implementing `algorithm`
pub fn link_codec(algorithm: LinkAlgorithm) -> Box<dyn LinkCodec> {
    match algorithm {
        LinkAlgorithm::Crc32 => Box::new(Crc32Codec::new()),
        LinkAlgorithm::Hamming => Box::new(HammingCodec::new()),
    }
}

/// Error correction statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub frames: usize,
    pub detected_errors: usize,
    pub corrected_errors: usize,
    pub suspect_frames: usize,
    pub rejected_frames: usize,
}

impl LinkStats {
    /// Tally one decode verdict
    pub fn record(&mut self, decoded: &LinkDecoded) {
        self.frames += 1;
        if decoded.error_detected() {
            self.detected_errors += 1;
        }
        match decoded {
            LinkDecoded::Intact { .. } => {}
            LinkDecoded::Corrected { .. } => self.corrected_errors += 1,
            LinkDecoded::Suspect { .. } => self.suspect_frames += 1,
            LinkDecoded::Rejected { .. } => self.rejected_frames += 1,
        }
    }
}
