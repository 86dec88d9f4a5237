//! bitlink Codecs - presentation layer
//!
//! This crate maps text to the flat bit sequences the link layer protects,
//! and back again on the receive side.

pub mod text;
pub mod error;

pub use error::{CodecError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        text::{pad_to_min_len, BitTextCodec, TextCodec, TrailingBits, BITS_PER_CHAR},
        error::{CodecError, Result},
    };
}
