//! Fixed-width vector clock indexed by [`ProcessId`].
//!
//! Width is fixed at group setup and every clock in a run shares it. Entry
//! `i` counts the messages process `i` has sent, as known by the holder.

use std::fmt;

use crate::types::ProcessId;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PartialOrder {
    LessThan,
    GreaterThan,
    Equal,
    Concurrent,
}

/// Vector clock: one non-negative counter per process.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VectorClock(Vec<u64>);

impl VectorClock {
    /// All-zero clock for a group of `num_processes`.
    pub fn new(num_processes: usize) -> Self {
        VectorClock(vec![0; num_processes])
    }

    /// Builds a clock from raw entries. Width is not checked here; arriving
    /// snapshots are validated by the delivery gate.
    pub fn from_entries(entries: Vec<u64>) -> Self {
        VectorClock(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entry for `id`, or 0 when the clock is narrower than the id.
    pub fn get(&self, id: ProcessId) -> u64 {
        self.0.get(id.index()).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> &[u64] {
        &self.0
    }

    /// `clock[id] += 1`.
    pub fn increment_self(&mut self, id: ProcessId) {
        if let Some(entry) = self.0.get_mut(id.index()) {
            *entry += 1;
        }
    }

    /// Elementwise max with `other`. Never decreases an entry.
    ///
    /// Entries of `other` beyond this clock's width are ignored.
    pub fn merge_from(&mut self, other: &VectorClock) {
        for (local, incoming) in self.0.iter_mut().zip(other.0.iter()) {
            *local = (*local).max(*incoming);
        }
    }

    /// Immutable copy for embedding in an outgoing message.
    pub fn snapshot(&self) -> VectorClock {
        self.clone()
    }

    /// True when `self` strictly precedes `other`.
    pub fn happened_before(&self, other: &VectorClock) -> bool {
        compare(self, other) == PartialOrder::LessThan
    }

    pub fn concurrent_with(&self, other: &VectorClock) -> bool {
        compare(self, other) == PartialOrder::Concurrent
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}

/// Compares two clocks entry by entry. Missing entries count as 0.
pub fn compare(vc1: &VectorClock, vc2: &VectorClock) -> PartialOrder {
    let mut vc1_le_vc2 = true;
    let mut vc2_le_vc1 = true;

    let width = vc1.len().max(vc2.len());
    for i in 0..width {
        let val1 = vc1.get(ProcessId(i));
        let val2 = vc2.get(ProcessId(i));

        if val1 > val2 { vc1_le_vc2 = false; }
        if val1 < val2 { vc2_le_vc1 = false; }
    }
    if vc1_le_vc2 && vc2_le_vc1 {
        PartialOrder::Equal
    } else if vc1_le_vc2 {
        PartialOrder::LessThan
    } else if vc2_le_vc1 {
        PartialOrder::GreaterThan
    } else {
        PartialOrder::Concurrent
    }
}
