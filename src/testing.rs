//! Test helpers shared by unit and integration tests (`test-utils` feature).

use std::collections::HashSet;
use std::time::Duration;

use crate::error::CausalResult;
use crate::primitives::Message;
use crate::time::VectorClock;
use crate::transport::Transport;
use crate::types::{MessageId, ProcessId};

/// One envelope handed to a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<P> {
    pub sender: ProcessId,
    pub recipient: ProcessId,
    pub message: Message<P>,
    pub delay: Duration,
}

/// Transport that records envelopes instead of delivering them, so tests
/// can hand them to recipients in any order they like.
#[derive(Debug, Clone)]
pub struct RecordingTransport<P> {
    pub now: Duration,
    pub dispatched: Vec<Dispatch<P>>,
}

impl<P> Default for RecordingTransport<P> {
    fn default() -> Self {
        RecordingTransport { now: Duration::ZERO, dispatched: Vec::new() }
    }
}

impl<P> RecordingTransport<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything dispatched to `recipient`.
    pub fn take_for(&mut self, recipient: ProcessId) -> Vec<Message<P>> {
        let (mine, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.dispatched).into_iter().partition(|d| d.recipient == recipient);
        self.dispatched = rest;
        mine.into_iter().map(|d| d.message).collect()
    }
}

impl<P> Transport<P> for RecordingTransport<P> {
    fn now(&self) -> Duration {
        self.now
    }

    fn unicast(
        &mut self,
        sender: ProcessId,
        recipient: ProcessId,
        message: Message<P>,
        delay: Duration,
    ) -> CausalResult<()> {
        self.dispatched.push(Dispatch { sender, recipient, message, delay });
        Ok(())
    }
}

/// Builds a message without going through a process, for crafting
/// arbitrary (including malformed) arrivals.
pub fn message<P>(sender: usize, recipients: &[usize], snapshot: &[u64], payload: P) -> Message<P> {
    Message::new(
        ProcessId(sender),
        recipients.iter().copied().map(ProcessId).collect(),
        VectorClock::from_entries(snapshot.to_vec()),
        payload,
        Duration::ZERO,
    )
}

/// Checks a delivery history against the snapshots of every sent message:
/// a message may only appear after each of its causal predecessors that
/// was addressed to the same receiver.
///
/// Returns the first violating pair `(message, missing predecessor)`.
pub fn find_causal_violation<P>(
    receiver: ProcessId,
    history: &[MessageId],
    sent: &[Message<P>],
) -> Option<(MessageId, MessageId)> {
    let mut seen: HashSet<MessageId> = HashSet::new();
    for delivered in history {
        let Some(msg) = sent.iter().find(|m| m.id() == *delivered) else {
            continue;
        };
        for earlier in sent {
            if earlier.id() == msg.id() || !earlier.is_addressed_to(receiver) {
                continue;
            }
            // `earlier` is in msg's causal past iff the sender of msg had
            // seen it when msg was stamped.
            let in_past = msg.snapshot().get(earlier.sender()) >= earlier.id().seq;
            if in_past && !seen.contains(&earlier.id()) {
                return Some((msg.id(), earlier.id()));
            }
        }
        seen.insert(*delivered);
    }
    None
}
