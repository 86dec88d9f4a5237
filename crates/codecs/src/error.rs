//! Error types for bitlink Codecs

use thiserror::Error;

/// Codec error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unsupported character {ch:?} (U+{code_point:04X}) at index {index}: only single-byte code points are allowed")]
    UnsupportedCharacter {
        ch: char,
        index: usize,
        code_point: u32,
    },

    #[error("Malformed bit string: length {len} is not a multiple of 8")]
    MalformedBits { len: usize },
}

/// Result type for bitlink Codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
