#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Causal-Core delivers messages among a fixed group of processes in causal
//! order, using vector clocks.
//!
//! A message sent by P is handed to a recipient's application layer only
//! after every message in its causal past (as P knew it at send time) has
//! been delivered there. Arrivals that come too early are held back and
//! released once their predecessors land.
//!
//! The pieces, leaves first:
//!
//! * [`time::VectorClock`]: fixed-width clock with elementwise merge.
//! * [`Message`]: immutable envelope carrying a clock snapshot.
//! * [`delivery::gate`]: the two-condition deliverability test.
//! * [`delivery::PendingQueue`]: hold-back queue swept to a fixed point.
//! * [`process::CausalProcess`]: owns a clock and a queue; `send` and
//!   `deliver_incoming`.
//! * [`transport`]: the `Transport` seam plus a deterministic simulator and
//!   a tokio actor realisation.

// Module for shared identifier types (ProcessId, MessageId).
pub mod types;

// Module for the message envelope.
pub mod primitives;

// Re-export core primitives for easier access at the crate root.
pub use primitives::*;

// Logical time (vector clocks).
pub mod time;

// Delivery gate and pending queue.
pub mod delivery;

// Per-process orchestration.
pub mod process;

// Transport seam and its realisations.
pub mod transport;

// Observability records.
pub mod events;

// Group bootstrap configuration.
pub mod config;

// Module for error types.
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::GroupConfig;
pub use error::{CausalError, CausalResult};
pub use process::{Arrival, ArrivalOutcome, CausalProcess};
pub use time::VectorClock;
pub use types::{MessageId, ProcessId};
