//! Causal delivery test (Birman–Schiper–Stephenson).
//!
//! A message from `s` carrying snapshot `m` is deliverable at a receiver whose
//! clock is `VC` iff:
//!
//! 1. `m[s] == VC[s] + 1` (it is the next message from `s`), and
//! 2. `m[k] <= VC[k]` for every `k != s` (nothing it depends on is missing).
//!
//! Everything here is side-effect free. Clock mutation belongs to the caller
//! so the same test serves direct arrivals and pending-queue sweeps.

use crate::error::{CausalError, CausalResult};
use crate::time::VectorClock;
use crate::types::ProcessId;

/// Outcome of evaluating an arrival against the local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Decision {
    /// Both conditions hold.
    Deliverable,
    /// A causal predecessor is still missing; hold the message back.
    Hold,
    /// `m[s] <= VC[s]`: this message (by natural identity) has already been
    /// sequenced here and can never satisfy condition 1.
    Duplicate,
}

/// Classifies an arrival. `snapshot` and `local` must have the same width;
/// see [`validate_snapshot`].
///
/// Self-loops skip the two conditions: they are deliverable when the snapshot
/// is covered by `local`. Re-delivery of an own message is detected by the
/// process, which knows which of its own messages it has already seen.
pub fn classify(snapshot: &VectorClock, local: &VectorClock, sender: ProcessId, receiver: ProcessId) -> Decision {
    // Self-loop: the sender's clock already covers its own message, so a
    // genuine one never exceeds the local clock anywhere. Anything that does
    // claims knowledge this process does not have and is held.
    if sender == receiver {
        let covered = snapshot.entries().iter().zip(local.entries()).all(|(m_k, vc_k)| m_k <= vc_k);
        return if covered { Decision::Deliverable } else { Decision::Hold };
    }

    let expected = local.get(sender) + 1;
    let seq = snapshot.get(sender);
    if seq < expected {
        return Decision::Duplicate;
    }
    if seq > expected {
        return Decision::Hold;
    }

    let predecessors_seen = snapshot
        .entries()
        .iter()
        .zip(local.entries())
        .enumerate()
        .filter(|(k, _)| *k != sender.index())
        .all(|(_, (m_k, vc_k))| m_k <= vc_k);

    if predecessors_seen {
        Decision::Deliverable
    } else {
        Decision::Hold
    }
}

/// Boolean form of the gate.
pub fn is_deliverable(snapshot: &VectorClock, local: &VectorClock, sender: ProcessId, receiver: ProcessId) -> bool {
    classify(snapshot, local, sender, receiver) == Decision::Deliverable
}

/// Rejects snapshots whose width differs from the group size.
pub fn validate_snapshot(snapshot: &VectorClock, num_processes: usize) -> CausalResult<()> {
    if snapshot.len() == num_processes {
        Ok(())
    } else {
        Err(CausalError::MalformedSnapshot { expected: num_processes, actual: snapshot.len() })
    }
}
