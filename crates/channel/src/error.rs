//! Error types for bitlink Channel

use thiserror::Error;

/// Channel error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Invalid bit error rate {rate}: must lie in [0, 1]")]
    InvalidErrorRate { rate: f64 },

    #[error("Core error: {0}")]
    Core(#[from] bitlink_core::CoreError),
}

/// Result type for bitlink Channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;
