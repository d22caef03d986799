use std::time::Duration;

use crate::time::VectorClock;
use crate::types::{MessageId, ProcessId};

// --- Message envelope -------------------------------------------------------

/// Immutable envelope carried between processes.
///
/// The snapshot is the sender's clock taken *after* it incremented its own
/// entry, so `snapshot[sender]` is the message's sequence number. A multicast
/// to R recipients travels as R copies of the same envelope.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message<P> {
    id: MessageId,
    sender: ProcessId,
    recipients: Vec<ProcessId>,
    snapshot: VectorClock,
    payload: P,
    /// Logical send time, measured on the transport's clock.
    sent_at: Duration,
}

impl<P> Message<P> {
    /// Builds an envelope. The id is derived from `sender` and `snapshot`.
    pub fn new(
        sender: ProcessId,
        recipients: Vec<ProcessId>,
        snapshot: VectorClock,
        payload: P,
        sent_at: Duration,
    ) -> Self {
        let id = MessageId { sender, seq: snapshot.get(sender) };
        Message { id, sender, recipients, snapshot, payload, sent_at }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn sender(&self) -> ProcessId {
        self.sender
    }

    pub fn recipients(&self) -> &[ProcessId] {
        &self.recipients
    }

    pub fn snapshot(&self) -> &VectorClock {
        &self.snapshot
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn sent_at(&self) -> Duration {
        self.sent_at
    }

    pub fn is_addressed_to(&self, process: ProcessId) -> bool {
        self.recipients.contains(&process)
    }
}
