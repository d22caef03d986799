//!
//! A single participant in causal delivery: owns its vector clock and its
//! hold-back queue, and is the only code that ever mutates either.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::GroupConfig;
use crate::delivery::{gate, Decision, PendingQueue};
use crate::error::{CausalError, CausalResult};
use crate::events::{EventKind, ProcessEvent};
use crate::primitives::Message;
use crate::time::VectorClock;
use crate::transport::Transport;
use crate::types::{MessageId, ProcessId};

/// What happened to one arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArrivalOutcome {
    /// Passed the gate and was delivered immediately.
    Delivered,
    /// Held back in the pending queue.
    Queued,
    /// Already sequenced here; dropped.
    Duplicate,
}

/// Report returned by [`CausalProcess::deliver_incoming`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub message: MessageId,
    pub outcome: ArrivalOutcome,
    /// Held-back messages released by the sweep that followed, in delivery order.
    pub released: Vec<MessageId>,
}

/// Point-in-time view of a process, for barriers and reporting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProcessSummary {
    pub id: ProcessId,
    pub clock: VectorClock,
    pub local_events: u64,
    pub delivered: Vec<MessageId>,
    pub pending: usize,
}

/// State touched on every delivery. Kept apart from the pending queue so a
/// sweep can borrow both at once.
#[derive(Debug, Clone)]
struct Ledger<P> {
    id: ProcessId,
    clock: VectorClock,
    /// Sends plus deliveries performed by this process.
    local_events: u64,
    /// Every delivered message id, in delivery order.
    history: Vec<MessageId>,
    /// Sequence numbers of own messages delivered back to this process.
    own_delivered: BTreeSet<u64>,
    /// Delivered messages not yet taken by the application.
    inbox: Vec<Message<P>>,
    events: Vec<ProcessEvent<P>>,
}

impl<P: Clone> Ledger<P> {
    fn deliver(&mut self, message: Message<P>, kind: EventKind) {
        self.clock.merge_from(message.snapshot());
        self.local_events += 1;
        self.history.push(message.id());
        if message.sender() == self.id {
            self.own_delivered.insert(message.id().seq);
        }
        self.events.push(ProcessEvent {
            kind,
            process: self.id,
            peer: message.sender(),
            message: message.id(),
            clock: self.clock.snapshot(),
            payload: message.payload().clone(),
        });
        self.inbox.push(message);
    }

    /// An own message that already came back once.
    fn is_redelivery(&self, id: MessageId) -> bool {
        id.sender == self.id && self.own_delivered.contains(&id.seq)
    }
}

/// A process taking part in causal delivery.
#[derive(Debug, Clone)]
pub struct CausalProcess<P> {
    id: ProcessId,
    num_processes: usize,
    default_delay: Duration,
    pending: PendingQueue<P>,
    ledger: Ledger<P>,
}

impl<P: Clone> CausalProcess<P> {
    /// Creates process `id` with an all-zero clock.
    pub fn new(id: ProcessId, config: &GroupConfig) -> CausalResult<Self> {
        config.validate()?;
        id.ensure_valid(config.num_processes)?;
        Ok(CausalProcess {
            id,
            num_processes: config.num_processes,
            default_delay: config.default_delay,
            pending: PendingQueue::with_capacity(id, config.pending_capacity),
            ledger: Ledger {
                id,
                clock: VectorClock::new(config.num_processes),
                local_events: 0,
                history: Vec::new(),
                own_delivered: BTreeSet::new(),
                inbox: Vec::new(),
                events: Vec::new(),
            },
        })
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    pub fn clock(&self) -> &VectorClock {
        &self.ledger.clock
    }

    pub fn pending(&self) -> &PendingQueue<P> {
        &self.pending
    }

    pub fn local_events(&self) -> u64 {
        self.ledger.local_events
    }

    /// Delivered message ids, in delivery order.
    pub fn history(&self) -> &[MessageId] {
        &self.ledger.history
    }

    /// True when nothing is held back.
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains the observability events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<ProcessEvent<P>> {
        std::mem::take(&mut self.ledger.events)
    }

    /// Drains delivered messages for the application layer.
    pub fn take_delivered(&mut self) -> Vec<Message<P>> {
        std::mem::take(&mut self.ledger.inbox)
    }

    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            id: self.id,
            clock: self.ledger.clock.snapshot(),
            local_events: self.ledger.local_events,
            delivered: self.ledger.history.clone(),
            pending: self.pending.len(),
        }
    }

    /// Sends `payload` to `recipients` with the configured default delay.
    ///
    /// Any subset of the group may be addressed, and delivery is never out
    /// of causal order. Eventual delivery assumes more: each recipient must
    /// also have been addressed by every message in this one's causal past
    /// that came from the same sender or was delivered before it here.
    /// Broadcasts always satisfy that. A recipient that skipped an earlier
    /// message holds this one forever, which shows as a non-empty
    /// [`CausalProcess::pending`] queue once traffic has drained.
    pub fn send<T: Transport<P>>(
        &mut self,
        recipients: &[ProcessId],
        payload: P,
        transport: &mut T,
    ) -> CausalResult<Message<P>> {
        let message = self.stamp(recipients.to_vec(), payload, transport.now())?;
        transport.multicast(self.id, recipients, message.clone(), self.default_delay)?;
        self.record_sent(&message);
        Ok(message)
    }

    /// Sends `payload` with an explicit delay per recipient. Subset sends
    /// carry the same eventual-delivery caveat as [`CausalProcess::send`].
    pub fn send_with_delays<T: Transport<P>>(
        &mut self,
        routes: &[(ProcessId, Duration)],
        payload: P,
        transport: &mut T,
    ) -> CausalResult<Message<P>> {
        let recipients = routes.iter().map(|(r, _)| *r).collect();
        let message = self.stamp(recipients, payload, transport.now())?;
        for (recipient, delay) in routes {
            transport.unicast(self.id, *recipient, message.clone(), *delay)?;
        }
        self.record_sent(&message);
        Ok(message)
    }

    /// Sends `payload` to every other process in the group.
    pub fn broadcast<T: Transport<P>>(&mut self, payload: P, transport: &mut T) -> CausalResult<Message<P>> {
        let others: Vec<ProcessId> = ProcessId::all(self.num_processes).filter(|p| *p != self.id).collect();
        self.send(&others, payload, transport)
    }

    /// Validates recipients, advances the own entry and builds the envelope.
    /// Nothing is mutated when validation fails.
    fn stamp(&mut self, recipients: Vec<ProcessId>, payload: P, now: Duration) -> CausalResult<Message<P>> {
        if recipients.is_empty() {
            return Err(CausalError::NoRecipients);
        }
        for recipient in &recipients {
            recipient.ensure_valid(self.num_processes)?;
        }

        self.ledger.clock.increment_self(self.id);
        self.ledger.local_events += 1;
        Ok(Message::new(self.id, recipients, self.ledger.clock.snapshot(), payload, now))
    }

    fn record_sent(&mut self, message: &Message<P>) {
        debug!(process = %self.id, message = %message.id(), clock = %message.snapshot(), "sent");
        for recipient in message.recipients() {
            self.ledger.events.push(ProcessEvent {
                kind: EventKind::Sent,
                process: self.id,
                peer: *recipient,
                message: message.id(),
                clock: message.snapshot().clone(),
                payload: message.payload().clone(),
            });
        }
    }

    /// Handles one arrival from the transport.
    ///
    /// Malformed envelopes are rejected before touching any state. A message
    /// that passes the gate is delivered and followed by a sweep of the
    /// pending queue; otherwise it is held back.
    pub fn deliver_incoming(&mut self, message: Message<P>) -> CausalResult<Arrival> {
        let sender = message.sender().ensure_valid(self.num_processes)?;
        gate::validate_snapshot(message.snapshot(), self.num_processes)?;
        if !message.is_addressed_to(self.id) {
            return Err(CausalError::NotARecipient { process: self.id, message: message.id() });
        }

        let id = message.id();
        let decision = if self.pending.contains(id) || self.ledger.is_redelivery(id) {
            Decision::Duplicate
        } else {
            gate::classify(message.snapshot(), &self.ledger.clock, sender, self.id)
        };

        match decision {
            Decision::Deliverable => {
                trace!(process = %self.id, message = %id, "gate passed");
                self.ledger.deliver(message, EventKind::Delivered);
                let released = self.release_pending();
                Ok(Arrival { message: id, outcome: ArrivalOutcome::Delivered, released })
            }
            Decision::Hold => {
                let event = ProcessEvent {
                    kind: EventKind::Queued,
                    process: self.id,
                    peer: sender,
                    message: id,
                    clock: self.ledger.clock.snapshot(),
                    payload: message.payload().clone(),
                };
                self.pending.enqueue(message)?;
                debug!(
                    process = %self.id,
                    message = %id,
                    clock = %self.ledger.clock,
                    pending = self.pending.len(),
                    "held back"
                );
                self.ledger.events.push(event);
                Ok(Arrival { message: id, outcome: ArrivalOutcome::Queued, released: Vec::new() })
            }
            Decision::Duplicate => {
                debug!(process = %self.id, message = %id, "dropping duplicate");
                Ok(Arrival { message: id, outcome: ArrivalOutcome::Duplicate, released: Vec::new() })
            }
        }
    }

    /// Sweeps the pending queue to a fixed point after the clock advanced.
    fn release_pending(&mut self) -> Vec<MessageId> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let own = self.id;
        let mut released = Vec::new();
        self.pending.sweep(
            &mut self.ledger,
            |ledger, m| {
                !ledger.is_redelivery(m.id()) && gate::is_deliverable(m.snapshot(), &ledger.clock, m.sender(), own)
            },
            |ledger, m| {
                released.push(m.id());
                ledger.deliver(m, EventKind::DelayedDelivered);
            },
        );
        if !released.is_empty() {
            debug!(
                process = %own,
                count = released.len(),
                remaining = self.pending.len(),
                "released held-back messages"
            );
        }
        released
    }
}
