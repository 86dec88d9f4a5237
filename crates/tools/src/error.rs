//! Error types for the bitlink pipeline and its collaborators

use bitlink_frame::link::LinkAlgorithm;
use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Frame was encoded with {actual} but this pipeline expects {expected}")]
    AlgorithmMismatch {
        expected: LinkAlgorithm,
        actual: LinkAlgorithm,
    },

    #[error("Connection refused by {addr}")]
    ConnectionRefused { addr: String },

    #[error("Transport error talking to {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Received frame exceeds {limit} characters")]
    FrameTooLarge { limit: usize },

    #[error("Configuration error: {msg}")]
    Config { msg: String },

    #[error("Core error: {0}")]
    Core(#[from] bitlink_core::CoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] bitlink_codecs::CodecError),

    #[error("Frame error: {0}")]
    Frame(#[from] bitlink_frame::FrameError),

    #[error("Channel error: {0}")]
    Channel(#[from] bitlink_channel::ChannelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// Wrap an I/O failure against `addr`, singling out refused connections
    pub fn transport(addr: impl Into<String>, source: std::io::Error) -> Self {
        let addr = addr.into();
        if source.kind() == std::io::ErrorKind::ConnectionRefused {
            LinkError::ConnectionRefused { addr }
        } else {
            LinkError::Transport { addr, source }
        }
    }
}

/// Result type for bitlink pipeline operations
pub type Result<T> = std::result::Result<T, LinkError>;
