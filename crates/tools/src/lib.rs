//! bitlink Tools library
//!
//! Wires the presentation, link and channel layers into one pipeline and
//! adds the outer collaborators: socket transport, experiment runner and
//! configuration files.

pub mod pipeline;
pub mod transport;
pub mod experiment;
pub mod config;
pub mod common;
pub mod error;

pub use pipeline::{CodedFrame, Delivery, LinkPipeline, ReceiveOutcome, Received, SentFrame};
pub use transport::{FrameListener, TcpTransport, ACK, MAX_ACK_BYTES, MAX_FRAME_CHARS};
pub use experiment::{AlgorithmSummary, ExperimentConfig, ExperimentReport, TrialRecord};
pub use config::LinkConfig;
pub use common::{init_logging, GlobalConfig, ProgressReporter};
pub use error::{LinkError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        common::{init_logging, GlobalConfig},
        config::LinkConfig,
        error::LinkError,
        experiment::{ExperimentConfig, ExperimentReport},
        pipeline::{CodedFrame, Delivery, LinkPipeline, ReceiveOutcome, Received, SentFrame},
        transport::{FrameListener, TcpTransport, ACK},
    };
}
