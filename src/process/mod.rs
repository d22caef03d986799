pub mod core;

#[cfg(test)]
mod tests;

// Re-export the primary types so callers can use `crate::process::*`.
pub use self::core::{Arrival, ArrivalOutcome, CausalProcess, ProcessSummary};
