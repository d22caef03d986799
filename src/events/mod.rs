//!
//! Observability records emitted by a [`crate::process::CausalProcess`].
//!
//! Events are plain data. Rendering is left to the consumer; `log_event`
//! is the default `tracing` rendering used by the simulator and the demo.

use std::fmt::Debug;

use crate::time::VectorClock;
use crate::types::{MessageId, ProcessId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    /// A message left `process` for `peer`.
    Sent,
    /// An arrival from `peer` passed the gate immediately.
    Delivered,
    /// An arrival from `peer` failed the gate and was held back.
    Queued,
    /// A held-back message from `peer` was released by a sweep.
    DelayedDelivered,
}

impl EventKind {
    /// Short label used in log lines.
    pub fn tag(self) -> &'static str {
        match self {
            EventKind::Sent => "SEND",
            EventKind::Delivered => "RECEIVE",
            EventKind::Queued => "DELAY",
            EventKind::DelayedDelivered => "DELIVER-DELAYED",
        }
    }
}

/// One step in a process's life.
///
/// `clock` is the process's clock right after the step (for `Sent`, this is
/// the snapshot carried by the message).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProcessEvent<P> {
    pub kind: EventKind,
    pub process: ProcessId,
    pub peer: ProcessId,
    pub message: MessageId,
    pub clock: VectorClock,
    pub payload: P,
}

/// Renders an event through `tracing` at info level, tagged with
/// [`EventKind::tag`].
pub fn log_event<P: Debug>(event: &ProcessEvent<P>) {
    let ProcessEvent { kind, process, peer, message, clock, payload } = event;
    tracing::info!(%process, %peer, %message, %clock, ?payload, "[{}]", kind.tag());
}
