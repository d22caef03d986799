//! Transport abstraction.
//!
//! A `Transport` moves envelopes between processes. The causal layer only
//! relies on "a handed-over envelope eventually reaches the recipient's
//! `deliver_incoming`". Arrival order is unconstrained; the delivery gate
//! restores causal order.
//!
//! Two realisations are provided: [`simulated::SimulatedNetwork`], a
//! deterministic virtual-time scheduler, and [`actor::ActorGroup`], one tokio
//! task per process.

use std::time::Duration;

use crate::error::CausalResult;
use crate::primitives::Message;
use crate::types::ProcessId;

pub mod actor;
pub mod simulated;

pub use actor::{ActorGroup, ActorTransport};
pub use simulated::{SimulatedNetwork, SimulationStats};

/// Capability a process needs from its environment.
pub trait Transport<P> {
    /// Current time on the transport's clock, stamped on outgoing messages.
    fn now(&self) -> Duration;

    /// Schedule `recipient.deliver_incoming(message)` no earlier than `delay`
    /// from now.
    fn unicast(
        &mut self,
        sender: ProcessId,
        recipient: ProcessId,
        message: Message<P>,
        delay: Duration,
    ) -> CausalResult<()>;

    /// Semantically one `unicast` per recipient, all sharing the envelope.
    fn multicast(
        &mut self,
        sender: ProcessId,
        recipients: &[ProcessId],
        message: Message<P>,
        delay: Duration,
    ) -> CausalResult<()>
    where
        P: Clone,
    {
        for recipient in recipients {
            self.unicast(sender, *recipient, message.clone(), delay)?;
        }
        Ok(())
    }
}
