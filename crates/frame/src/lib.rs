//! bitlink Frame - link layer integrity codes
//!
//! This crate provides the CRC-32 error-detecting code, the Hamming
//! single-error-correcting code, and a single [`link::LinkCodec`] interface
//! the pipeline drives without caring which of the two it holds.

pub mod crc32;
pub mod hamming;
pub mod link;
pub mod error;

pub use error::{FrameError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        crc32::{Crc32Codec, Crc32Table, CRC32_TABLE, CHECKSUM_BITS},
        hamming::{DecodeStatus, HammingCodec, HammingDecoded, HammingParams},
        link::{link_codec, Capability, LinkAlgorithm, LinkCodec, LinkDecoded, LinkStats},
        error::{FrameError, Result},
    };
}
