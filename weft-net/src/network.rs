//! Built networks and the embedding-facing run surface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use weft_core::error::AgentError;
use weft_core::id::AgentId;
use weft_core::message::Message;
use weft_core::schema::SchemaDescriptor;

use crate::channel::{Disconnected, TxEndpoint};
use crate::error::NetworkError;
use crate::scheduler::{AgentBody, Event, Scheduler};

/// What the scheduler does with an agent that reported Failure.
///
/// The downstream consequences of a failure are deliberately a policy,
/// not an assumption: close the failed agent's ports (synthetic End,
/// cascading shutdown), keep them open (silent stall), or take the whole
/// network down.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Deactivate the failed agent and close its ports; siblings continue.
    #[default]
    Isolate,
    /// Deactivate the failed agent but keep its channels open, so
    /// downstream consumers wait instead of observing a close.
    Stall,
    /// Cancel the entire network.
    Halt,
}

/// Network-wide execution configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Buffer capacity for connections whose consuming port declares none.
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,
    /// What to do with an agent that reports Failure.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_capacity() -> usize {
    16
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// One agent's failure, as surfaced on the aggregated outcome.
#[derive(Debug)]
pub struct Failure {
    /// The agent that failed.
    pub agent: AgentId,
    /// What it reported.
    pub error: AgentError,
}

/// Aggregate result of a network run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every agent ended (or the network quiesced) without failures.
    Completed,
    /// At least one agent failed; everything that failed is listed.
    Failed(Vec<Failure>),
}

impl RunOutcome {
    /// Whether the run finished without any agent failure.
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    /// The failure list (empty for a completed run).
    pub fn failures(&self) -> &[Failure] {
        match self {
            RunOutcome::Completed => &[],
            RunOutcome::Failed(failures) => failures,
        }
    }
}

pub(crate) struct BoundaryInput {
    pub(crate) tx: TxEndpoint,
    pub(crate) schema: SchemaDescriptor,
}

impl std::fmt::Debug for BoundaryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryInput")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Receiving end of an exit boundary port.
pub struct OutputTap {
    rx: mpsc::Receiver<Message>,
}

impl std::fmt::Debug for OutputTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputTap").finish_non_exhaustive()
    }
}

impl OutputTap {
    pub(crate) fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self { rx }
    }

    /// Await the next boundary message. `None` once every producing agent
    /// has shut down and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

/// A validated, fully wired network, ready to start.
///
/// Produced by [`GraphSpec::build`](crate::graph::GraphSpec::build); every
/// malformed-network condition has already been rejected by the time one
/// of these exists.
#[derive(Debug)]
pub struct Network {
    pub(crate) slots: Vec<(AgentId, AgentBody)>,
    pub(crate) events_tx: mpsc::UnboundedSender<Event>,
    pub(crate) events_rx: mpsc::UnboundedReceiver<Event>,
    pub(crate) injectors: HashMap<String, BoundaryInput>,
    pub(crate) taps: HashMap<String, OutputTap>,
    pub(crate) config: NetworkConfig,
}

impl Network {
    /// Names of the entry boundary ports.
    pub fn boundary_inputs(&self) -> Vec<&str> {
        self.injectors.keys().map(String::as_str).collect()
    }

    /// Names of the exit boundary ports.
    pub fn boundary_outputs(&self) -> Vec<&str> {
        self.taps.keys().map(String::as_str).collect()
    }

    /// The configuration this network was built with.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Spawn the scheduler and hand back the embedding surface.
    pub fn start(self) -> NetworkHandle {
        let (guard_tx, guard_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let scheduler = Scheduler::new(
            self.slots,
            self.events_tx.clone(),
            self.events_rx,
            guard_rx,
            self.config.failure_policy,
        );
        tokio::spawn(scheduler.run(done_tx));
        NetworkHandle {
            injectors: self.injectors,
            taps: self.taps,
            events: self.events_tx,
            _guard: guard_tx,
            done: done_rx,
        }
    }
}

/// The embedding collaborator's view of a running network: inject
/// boundary messages, read boundary outputs, cancel, await the terminal
/// condition.
pub struct NetworkHandle {
    injectors: HashMap<String, BoundaryInput>,
    taps: HashMap<String, OutputTap>,
    events: mpsc::UnboundedSender<Event>,
    /// Dropping this tells the scheduler no further input can arrive.
    _guard: mpsc::UnboundedSender<()>,
    done: oneshot::Receiver<Vec<Failure>>,
}

impl NetworkHandle {
    /// Inject a message into an entry boundary port. Awaits while the
    /// port's bounded buffer is full — boundary injection is subject to
    /// the same backpressure as any producer.
    pub async fn inject(&self, port: &str, message: Message) -> Result<(), NetworkError> {
        let boundary = self
            .injectors
            .get(port)
            .ok_or_else(|| NetworkError::UnknownBoundary(port.to_owned()))?;
        if !boundary.schema.accepts(message.schema()) {
            return Err(NetworkError::SchemaMismatch {
                port: port.to_owned(),
                sent: message.schema().to_string(),
                accepted: boundary.schema.to_string(),
            });
        }
        boundary
            .tx
            .send(message)
            .await
            .map_err(|Disconnected| NetworkError::Closed(port.to_owned()))
    }

    /// Take ownership of an exit boundary stream. Returns `None` if the
    /// port does not exist or was already taken.
    pub fn take_output(&mut self, port: &str) -> Option<OutputTap> {
        self.taps.remove(port)
    }

    /// Request network-wide cancellation: a synthetic End is delivered to
    /// every agent at its next scheduling opportunity. In-flight runs
    /// complete normally and are never aborted.
    pub fn cancel(&self) {
        let _ = self.events.send(Event::Cancel);
    }

    /// Consume the handle and wait for the terminal condition. Consuming
    /// the handle closes the entry boundary, so a quiescent network (no
    /// runnable agent, nothing in flight) terminates rather than waiting
    /// for input that can no longer arrive.
    ///
    /// Exit boundary buffers stay alive until the terminal condition is
    /// reached: an unconsumed bounded output can therefore hold the
    /// network open — backpressure is a liveness property, not an error.
    pub async fn await_terminal(self) -> RunOutcome {
        let NetworkHandle {
            injectors,
            taps,
            events,
            _guard,
            done,
        } = self;
        drop(injectors);
        drop(events);
        drop(_guard);
        let outcome = match done.await {
            Ok(failures) if failures.is_empty() => RunOutcome::Completed,
            Ok(failures) => RunOutcome::Failed(failures),
            Err(_) => RunOutcome::Completed,
        };
        drop(taps);
        outcome
    }
}
