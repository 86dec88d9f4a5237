//! Error types for bitlink Core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid bit character {found:?} at position {position}")]
    InvalidBit { position: usize, found: char },

    #[error("Invalid bit value {value} at position {position}")]
    InvalidBitValue { position: usize, value: u8 },

    #[error("Bit index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Bit width {width} exceeds 32")]
    WidthTooLarge { width: usize },
}

/// Result type for bitlink Core operations
pub type Result<T> = std::result::Result<T, CoreError>;
