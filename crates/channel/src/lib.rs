//! bitlink Channel - noisy channel simulation
//!
//! This crate flips bits of a transmitted frame independently at random,
//! standing in for an unreliable physical link.

pub mod noisy;
pub mod error;

pub use error::{ChannelError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        noisy::{entropy_rng, inject_errors, seeded_rng, ChannelConfig, NoisyChannel, Transmission},
        error::{ChannelError, Result},
    };
}
