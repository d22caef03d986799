//! Logical-time utilities.
//!
//! Vector-clock utilities live in `time::vector`.

pub mod vector;

// Re-export for convenience
pub use vector::*;
