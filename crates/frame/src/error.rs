//! Error types for bitlink Frame

use thiserror::Error;

/// Frame processing error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Cannot encode an empty data sequence")]
    EmptyData,

    #[error("Frame too short: expected at least {min} bits, got {actual}")]
    FrameTooShort { min: usize, actual: usize },

    #[error("Invalid Hamming frame length {len}: no data length produces it")]
    InvalidFrameLength { len: usize },

    #[error("Integrity check failed: residual {residual:#010x}")]
    IntegrityFailure { residual: u32 },

    #[error("Unknown link algorithm: {name}")]
    UnknownAlgorithm { name: String },

    #[error("Core error: {0}")]
    Core(#[from] bitlink_core::CoreError),
}

/// Result type for bitlink Frame operations
pub type Result<T> = std::result::Result<T, FrameError>;
