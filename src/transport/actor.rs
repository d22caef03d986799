//! Concurrent realisation: one tokio task per process.
//!
//! Each task owns its [`CausalProcess`] and handles one command at a time
//! from its inbox, so a send and an arrival on the same process never
//! interleave. Delay is modelled by a spawned sleep before the envelope is
//! pushed to the recipient's inbox.

use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::GroupConfig;
use crate::error::{CausalError, CausalResult};
use crate::events::{log_event, ProcessEvent};
use crate::primitives::Message;
use crate::process::{CausalProcess, ProcessSummary};
use crate::transport::Transport;
use crate::types::ProcessId;

enum Route {
    /// Every recipient gets the process's default delay.
    Default(Vec<ProcessId>),
    Explicit(Vec<(ProcessId, Duration)>),
}

enum Command<P> {
    Send {
        route: Route,
        payload: P,
        reply: oneshot::Sender<CausalResult<Message<P>>>,
    },
    Arrival(Message<P>),
    Summary(oneshot::Sender<ProcessSummary>),
    Shutdown,
}

/// Counts envelopes between `unicast` and the end of `deliver_incoming`.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn is_idle(&self) -> bool {
        self.count.load(Ordering::SeqCst) == 0
    }
}

/// Transport handle held by every actor.
pub struct ActorTransport<P> {
    inboxes: Arc<Vec<mpsc::UnboundedSender<Command<P>>>>,
    in_flight: Arc<InFlight>,
    started: Instant,
}

impl<P> Clone for ActorTransport<P> {
    fn clone(&self) -> Self {
        ActorTransport {
            inboxes: Arc::clone(&self.inboxes),
            in_flight: Arc::clone(&self.in_flight),
            started: self.started,
        }
    }
}

impl<P> ActorTransport<P> {
    fn stop_all(&self) {
        for inbox in self.inboxes.iter() {
            let _ = inbox.send(Command::Shutdown);
        }
    }
}

impl<P: Send + 'static> Transport<P> for ActorTransport<P> {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn unicast(
        &mut self,
        _sender: ProcessId,
        recipient: ProcessId,
        message: Message<P>,
        delay: Duration,
    ) -> CausalResult<()> {
        let inbox = self
            .inboxes
            .get(recipient.index())
            .cloned()
            .ok_or(CausalError::InvalidProcessId { id: recipient.index(), num_processes: self.inboxes.len() })?;

        self.in_flight.begin();
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if inbox.send(Command::Arrival(message)).is_err() {
                // Recipient already shut down; the envelope is gone.
                in_flight.finish();
            }
        });
        Ok(())
    }
}

/// A running group of actor processes.
///
/// Dropping the group stops every actor; [`ActorGroup::shutdown`] does the
/// same and also hands the processes back.
pub struct ActorGroup<P> {
    transport: ActorTransport<P>,
    tasks: Vec<JoinHandle<CausalProcess<P>>>,
    events: mpsc::UnboundedReceiver<ProcessEvent<P>>,
}

impl<P> ActorGroup<P>
where
    P: Clone + Debug + Send + 'static,
{
    /// Spawns `config.num_processes` actors on the current tokio runtime.
    pub fn spawn(config: &GroupConfig) -> CausalResult<Self> {
        config.validate()?;
        let processes = ProcessId::all(config.num_processes)
            .map(|id| CausalProcess::new(id, config))
            .collect::<CausalResult<Vec<_>>>()?;

        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..config.num_processes).map(|_| mpsc::unbounded_channel()).unzip();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let transport = ActorTransport {
            inboxes: Arc::new(senders),
            in_flight: Arc::new(InFlight::default()),
            started: Instant::now(),
        };

        let tasks = processes
            .into_iter()
            .zip(receivers)
            .map(|(process, inbox)| {
                tokio::spawn(run_actor(process, inbox, transport.clone(), event_tx.clone()))
            })
            .collect();

        debug!(processes = config.num_processes, "actor group started");
        Ok(ActorGroup { transport, tasks, events: event_rx })
    }

    pub fn num_processes(&self) -> usize {
        self.transport.inboxes.len()
    }

    fn inbox(&self, id: ProcessId) -> CausalResult<&mpsc::UnboundedSender<Command<P>>> {
        self.transport
            .inboxes
            .get(id.index())
            .ok_or(CausalError::InvalidProcessId { id: id.index(), num_processes: self.num_processes() })
    }

    /// Asks `from` to send `payload` to `recipients` with the default delay.
    pub async fn send(&self, from: ProcessId, recipients: &[ProcessId], payload: P) -> CausalResult<Message<P>> {
        self.request_send(from, Route::Default(recipients.to_vec()), payload).await
    }

    /// Asks `from` to send `payload` with an explicit delay per recipient.
    pub async fn send_with_delays(
        &self,
        from: ProcessId,
        routes: &[(ProcessId, Duration)],
        payload: P,
    ) -> CausalResult<Message<P>> {
        self.request_send(from, Route::Explicit(routes.to_vec()), payload).await
    }

    /// Asks `from` to send `payload` to every other process.
    pub async fn broadcast(&self, from: ProcessId, payload: P) -> CausalResult<Message<P>> {
        let others: Vec<ProcessId> = ProcessId::all(self.num_processes()).filter(|p| *p != from).collect();
        self.send(from, &others, payload).await
    }

    async fn request_send(&self, from: ProcessId, route: Route, payload: P) -> CausalResult<Message<P>> {
        let (reply, response) = oneshot::channel();
        self.inbox(from)?
            .send(Command::Send { route, payload, reply })
            .map_err(|_| CausalError::Transport(format!("{} has shut down", from)))?;
        response
            .await
            .map_err(|_| CausalError::Transport(format!("{} dropped the send request", from)))?
    }

    /// Resolves once every sent envelope has been handed to its recipient's
    /// `deliver_incoming`.
    pub async fn quiesce(&self) {
        loop {
            let idle = self.transport.in_flight.idle.notified();
            if self.transport.in_flight.is_idle() {
                return;
            }
            idle.await;
        }
    }

    pub async fn summary(&self, id: ProcessId) -> CausalResult<ProcessSummary> {
        let (reply, response) = oneshot::channel();
        self.inbox(id)?
            .send(Command::Summary(reply))
            .map_err(|_| CausalError::Transport(format!("{} has shut down", id)))?;
        response.await.map_err(|_| CausalError::Transport(format!("{} dropped the summary request", id)))
    }

    /// Events forwarded by the actors so far.
    pub fn drain_events(&mut self) -> Vec<ProcessEvent<P>> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stops every actor and returns the processes in id order.
    pub async fn shutdown(mut self) -> CausalResult<Vec<CausalProcess<P>>> {
        self.transport.stop_all();
        let tasks = std::mem::take(&mut self.tasks);
        let mut processes = Vec::with_capacity(tasks.len());
        for task in tasks {
            processes.push(task.await.map_err(|e| CausalError::Transport(e.to_string()))?);
        }
        Ok(processes)
    }
}

impl<P> Drop for ActorGroup<P> {
    fn drop(&mut self) {
        // Actors hold senders to each other's inboxes, so the inboxes never
        // close on their own.
        self.transport.stop_all();
    }
}

async fn run_actor<P>(
    mut process: CausalProcess<P>,
    mut inbox: mpsc::UnboundedReceiver<Command<P>>,
    mut transport: ActorTransport<P>,
    events: mpsc::UnboundedSender<ProcessEvent<P>>,
) -> CausalProcess<P>
where
    P: Clone + Debug + Send + 'static,
{
    while let Some(command) = inbox.recv().await {
        let mut arrived = false;
        match command {
            Command::Send { route, payload, reply } => {
                let result = match route {
                    Route::Default(recipients) => process.send(&recipients, payload, &mut transport),
                    Route::Explicit(routes) => process.send_with_delays(&routes, payload, &mut transport),
                };
                let _ = reply.send(result);
            }
            Command::Arrival(message) => {
                if let Err(err) = process.deliver_incoming(message) {
                    warn!(process = %process.id(), error = %err, "rejected arrival");
                }
                arrived = true;
            }
            Command::Summary(reply) => {
                let _ = reply.send(process.summary());
            }
            Command::Shutdown => break,
        }
        for event in process.take_events() {
            log_event(&event);
            let _ = events.send(event);
        }
        // Only counted as landed once its events are visible.
        if arrived {
            transport.in_flight.finish();
        }
    }
    debug!(process = %process.id(), clock = %process.clock(), "actor stopped");
    process
}
