//! Deterministic simulated network.
//!
//! All processes live in one `SimulatedNetwork` and are driven from a single
//! virtual-time event queue. Given the same configuration and the same
//! sequence of calls, every run produces identical results.
//!
//! ```text
//!   send() ──► Wire (BTreeMap<EventKey, Envelope>) ──► step() ──► deliver_incoming()
//!              ordered by (deliver_at, sequence)
//! ```

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use tracing::{instrument, warn};

use crate::config::GroupConfig;
use crate::error::{CausalError, CausalResult};
use crate::events::{log_event, EventKind, ProcessEvent};
use crate::primitives::Message;
use crate::process::{Arrival, ArrivalOutcome, CausalProcess};
use crate::time::VectorClock;
use crate::transport::Transport;
use crate::types::ProcessId;

/// Ordering key of a scheduled arrival: virtual time first, then the order
/// in which envelopes were handed to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    pub deliver_at: Duration,
    pub sequence: u64,
}

#[derive(Debug, Clone)]
struct Envelope<P> {
    recipient: ProcessId,
    message: Message<P>,
}

/// The in-flight half of the network; implements [`Transport`].
#[derive(Debug, Clone)]
struct Wire<P> {
    now: Duration,
    next_sequence: u64,
    queue: BTreeMap<EventKey, Envelope<P>>,
    jitter: Duration,
    rng: ChaCha8Rng,
}

impl<P> Wire<P> {
    fn jitter(&mut self) -> Duration {
        let span = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if span == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.next_u64() % span.saturating_add(1))
    }

    /// Arrival times saturate at `Duration::MAX` rather than overflow.
    fn schedule(&mut self, recipient: ProcessId, message: Message<P>, delay: Duration) {
        let deliver_at = self.now.saturating_add(delay).saturating_add(self.jitter());
        let key = EventKey { deliver_at, sequence: self.next_sequence };
        self.next_sequence += 1;
        self.queue.insert(key, Envelope { recipient, message });
    }
}

impl<P> Transport<P> for Wire<P> {
    fn now(&self) -> Duration {
        self.now
    }

    fn unicast(
        &mut self,
        _sender: ProcessId,
        recipient: ProcessId,
        message: Message<P>,
        delay: Duration,
    ) -> CausalResult<()> {
        self.schedule(recipient, message, delay);
        Ok(())
    }
}

/// Counters for a simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SimulationStats {
    pub sent: u64,
    pub delivered: u64,
    pub queued: u64,
    pub delayed_delivered: u64,
    pub duplicates: u64,
    pub rejected: u64,
}

/// A group of processes connected by a deterministic simulated network.
#[derive(Debug)]
pub struct SimulatedNetwork<P> {
    processes: Vec<CausalProcess<P>>,
    wire: Wire<P>,
    events: Vec<ProcessEvent<P>>,
    stats: SimulationStats,
}

impl<P: Clone + Debug> SimulatedNetwork<P> {
    /// Creates `config.num_processes` processes, ids `0..n`.
    pub fn new(config: &GroupConfig) -> CausalResult<Self> {
        config.validate()?;
        let processes = ProcessId::all(config.num_processes)
            .map(|id| CausalProcess::new(id, config))
            .collect::<CausalResult<Vec<_>>>()?;
        Ok(SimulatedNetwork {
            processes,
            wire: Wire {
                now: Duration::ZERO,
                next_sequence: 0,
                queue: BTreeMap::new(),
                jitter: config.jitter,
                rng: ChaCha8Rng::seed_from_u64(config.seed),
            },
            events: Vec::new(),
            stats: SimulationStats::default(),
        })
    }

    pub fn now(&self) -> Duration {
        self.wire.now
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    pub fn processes(&self) -> &[CausalProcess<P>] {
        &self.processes
    }

    pub fn process(&self, id: ProcessId) -> CausalResult<&CausalProcess<P>> {
        self.processes
            .get(id.index())
            .ok_or(CausalError::InvalidProcessId { id: id.index(), num_processes: self.processes.len() })
    }

    /// Final clocks of every process, in id order.
    pub fn clocks(&self) -> Vec<VectorClock> {
        self.processes.iter().map(|p| p.clock().clone()).collect()
    }

    /// Envelopes scheduled but not yet handed to a process.
    pub fn in_flight(&self) -> usize {
        self.wire.queue.len()
    }

    /// Nothing in flight and nothing held back anywhere.
    pub fn is_quiescent(&self) -> bool {
        self.wire.queue.is_empty() && self.processes.iter().all(|p| p.is_quiescent())
    }

    /// Drains every event recorded so far, in the order they happened.
    pub fn take_events(&mut self) -> Vec<ProcessEvent<P>> {
        std::mem::take(&mut self.events)
    }

    /// `from` sends `payload` to `recipients` with the default delay.
    pub fn send(&mut self, from: ProcessId, recipients: &[ProcessId], payload: P) -> CausalResult<Message<P>> {
        let process = lookup(&mut self.processes, from)?;
        let message = process.send(recipients, payload, &mut self.wire)?;
        self.collect_events(from);
        Ok(message)
    }

    /// `from` sends `payload` with an explicit delay per recipient.
    pub fn send_with_delays(
        &mut self,
        from: ProcessId,
        routes: &[(ProcessId, Duration)],
        payload: P,
    ) -> CausalResult<Message<P>> {
        let process = lookup(&mut self.processes, from)?;
        let message = process.send_with_delays(routes, payload, &mut self.wire)?;
        self.collect_events(from);
        Ok(message)
    }

    /// `from` sends `payload` to every other process.
    pub fn broadcast(&mut self, from: ProcessId, payload: P) -> CausalResult<Message<P>> {
        let others: Vec<ProcessId> = ProcessId::all(self.processes.len()).filter(|p| *p != from).collect();
        self.send(from, &others, payload)
    }

    /// Schedules an arbitrary envelope, bypassing any sender. Used to model
    /// foreign or malformed traffic.
    pub fn inject(&mut self, recipient: ProcessId, message: Message<P>, delay: Duration) {
        self.wire.schedule(recipient, message, delay);
    }

    /// Hands the earliest scheduled envelope to its recipient.
    ///
    /// Returns `None` when nothing is in flight. Rejections are returned to
    /// the caller and leave every other process untouched.
    pub fn step(&mut self) -> Option<CausalResult<Arrival>> {
        let (key, envelope) = self.wire.queue.pop_first()?;
        self.wire.now = self.wire.now.max(key.deliver_at);

        let result = lookup(&mut self.processes, envelope.recipient)
            .and_then(|process| process.deliver_incoming(envelope.message));
        match &result {
            Ok(arrival) => {
                if arrival.outcome == ArrivalOutcome::Duplicate {
                    self.stats.duplicates += 1;
                }
                self.collect_events(envelope.recipient);
            }
            Err(err) => {
                warn!(recipient = %envelope.recipient, error = %err, "rejected arrival");
                self.stats.rejected += 1;
            }
        }
        Some(result)
    }

    /// Steps until nothing is in flight. Rejected arrivals are counted and
    /// logged; they do not stop the run.
    #[instrument(skip(self), fields(processes = self.processes.len()))]
    pub fn run(&mut self) -> SimulationStats {
        while self.step().is_some() {}
        self.stats
    }

    /// Steps every envelope due at or before `until`, then advances the
    /// virtual clock to `until`.
    pub fn run_until(&mut self, until: Duration) -> SimulationStats {
        while let Some((key, _)) = self.wire.queue.first_key_value() {
            if key.deliver_at > until {
                break;
            }
            self.step();
        }
        self.wire.now = self.wire.now.max(until);
        self.stats
    }

    fn collect_events(&mut self, id: ProcessId) {
        let Some(process) = self.processes.get_mut(id.index()) else {
            return;
        };
        for event in process.take_events() {
            match event.kind {
                EventKind::Sent => self.stats.sent += 1,
                EventKind::Delivered => self.stats.delivered += 1,
                EventKind::Queued => self.stats.queued += 1,
                EventKind::DelayedDelivered => self.stats.delayed_delivered += 1,
            }
            log_event(&event);
            self.events.push(event);
        }
    }
}

fn lookup<P>(processes: &mut [CausalProcess<P>], id: ProcessId) -> CausalResult<&mut CausalProcess<P>> {
    let num_processes = processes.len();
    processes
        .get_mut(id.index())
        .ok_or(CausalError::InvalidProcessId { id: id.index(), num_processes })
}
