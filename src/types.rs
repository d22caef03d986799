//! Shared identifier types used across the clock, delivery and transport layers.

use std::fmt;

use crate::error::{CausalError, CausalResult};

/// Identifier of a participating process.
///
/// Ids are dense indices in `[0, num_processes)` handed out at bootstrap and
/// never change during a run. The vector clock is indexed by them directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub usize);

impl ProcessId {
    /// Index into a vector clock or a process table.
    pub fn index(self) -> usize {
        self.0
    }

    /// Checks the id against the group width.
    pub fn ensure_valid(self, num_processes: usize) -> CausalResult<Self> {
        if self.0 < num_processes {
            Ok(self)
        } else {
            Err(CausalError::InvalidProcessId { id: self.0, num_processes })
        }
    }

    /// All ids of a group of `num_processes` members, in order.
    pub fn all(num_processes: usize) -> impl Iterator<Item = ProcessId> {
        (0..num_processes).map(ProcessId)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<usize> for ProcessId {
    fn from(value: usize) -> Self {
        ProcessId(value)
    }
}

/// Natural identity of a message: the sender and the sender's own clock
/// entry at send time. Two envelopes with the same id carry the same snapshot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MessageId {
    pub sender: ProcessId,
    pub seq: u64,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.sender, self.seq)
    }
}
