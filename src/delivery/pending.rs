//! Hold-back queue for arrivals that failed the delivery gate.

use std::collections::VecDeque;

use crate::error::{CausalError, CausalResult};
use crate::primitives::Message;
use crate::types::{MessageId, ProcessId};

/// Insertion-ordered queue of held-back messages.
///
/// Messages leave only through [`PendingQueue::sweep`]. With no capacity the
/// queue is unbounded; with a capacity, overflow is reported as
/// [`CausalError::BackpressureExceeded`].
#[derive(Debug, Clone)]
pub struct PendingQueue<P> {
    owner: ProcessId,
    items: VecDeque<Message<P>>,
    capacity: Option<usize>,
}

impl<P> PendingQueue<P> {
    pub fn new(owner: ProcessId) -> Self {
        PendingQueue { owner, items: VecDeque::new(), capacity: None }
    }

    pub fn with_capacity(owner: ProcessId, capacity: Option<usize>) -> Self {
        PendingQueue { owner, items: VecDeque::new(), capacity }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.items.iter().any(|m| m.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message<P>> {
        self.items.iter()
    }

    /// Appends `message`. O(1).
    pub fn enqueue(&mut self, message: Message<P>) -> CausalResult<()> {
        if let Some(capacity) = self.capacity {
            if self.items.len() >= capacity {
                return Err(CausalError::BackpressureExceeded { process: self.owner, capacity });
            }
        }
        self.items.push_back(message);
        Ok(())
    }

    /// Drains the queue to a fixed point.
    ///
    /// Walks the queue in insertion order. The first message `evaluate`
    /// accepts is removed, handed to `deliver`, and the walk restarts from the
    /// head, since one delivery can unblock several held messages. Returns
    /// once a full pass delivers nothing, with the number of deliveries.
    pub fn sweep<S, E, D>(&mut self, state: &mut S, mut evaluate: E, mut deliver: D) -> usize
    where
        E: FnMut(&S, &Message<P>) -> bool,
        D: FnMut(&mut S, Message<P>),
    {
        let mut delivered = 0;
        loop {
            let ready = self.items.iter().position(|m| evaluate(&*state, m));
            match ready.and_then(|i| self.items.remove(i)) {
                Some(message) => {
                    deliver(state, message);
                    delivered += 1;
                }
                None => break,
            }
        }
        delivered
    }
}
