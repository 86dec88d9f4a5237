//! bitlink Core - bit sequence primitives
//!
//! This crate provides the flat bit sequence every other bitlink layer
//! passes around, together with its textual `'0'`/`'1'` form.

pub mod bits;
pub mod error;

pub use bits::Bits;
pub use error::{CoreError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        bits::Bits,
        error::{CoreError, Result},
    };
}
