//! The Agent protocol — a unit of computation behind a declared port set.

use crate::error::{AgentError, PortError};
use crate::id::ElementName;
use crate::message::Message;
use crate::port::Signature;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a run ended, for agents that did not fail.
///
/// Failure is not a variant here — an agent reports it by returning
/// `Err(AgentError)` from [`Agent::run`], and the scheduler surfaces it on
/// the network's failure list.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The agent stays eligible for future runs.
    Continue,
    /// The agent deactivates permanently. Its ports close; downstream
    /// agents fed solely by it will never become runnable again — the
    /// intended cascading shutdown, not an error.
    End,
}

/// The port I/O surface handed to a run.
///
/// `receive` and `peek` are synchronous: the scheduler guarantees every
/// mandatory port is non-empty before invoking the agent, so a receive
/// never has to wait, and a receive on an empty port is a contract
/// violation ([`PortError::Empty`]) rather than a blocking point. The only
/// suspension point in the whole system is `send` against a full bounded
/// buffer — deliberate backpressure, blocking this producer only.
#[async_trait]
pub trait Ports: Send {
    /// Dequeue the oldest message from a simple `Input` port.
    fn receive(&mut self, port: &str) -> Result<Message, PortError>;

    /// Dequeue the oldest message from one element of an `InputArray` port.
    fn receive_element(&mut self, port: &str, element: &str) -> Result<Message, PortError>;

    /// Observe the latest message on an `Option` or `Accumulator` port
    /// without removing it. Returns the wiring-time seed (Accumulator) or
    /// `None` (Option) when nothing has arrived yet. Never blocks.
    fn peek(&self, port: &str) -> Result<Option<Message>, PortError>;

    /// Enqueue a message into every channel connected to a simple `Output`
    /// port. Awaits while any bounded downstream buffer is at capacity.
    async fn send(&mut self, port: &str, message: Message) -> Result<(), PortError>;

    /// Enqueue a message into the channels of one element of an
    /// `OutputArray` port.
    async fn send_element(
        &mut self,
        port: &str,
        element: &str,
        message: Message,
    ) -> Result<(), PortError>;

    /// Broadcast a message to every wired element of an `OutputArray`
    /// port; each element receives an independent logical copy.
    async fn send_broadcast(&mut self, port: &str, message: Message) -> Result<(), PortError>;

    /// The wired element names of an array port, in deterministic
    /// (lexicographic) order. Empty for an array port nothing was wired to.
    fn elements(&self, port: &str) -> Result<Vec<ElementName>, PortError>;
}

/// A unit of computation with declared ports and optional persistent state.
///
/// State is simply the implementing struct's fields. The network owns each
/// instance as `Box<dyn Agent>` and guarantees at most one in-flight `run`
/// per instance, so `&mut self` is genuinely exclusive: no locking, and no
/// way for other agents to reach this state.
///
/// A run executes to completion — it never yields except while a `send`
/// waits out backpressure — and is oblivious to who is wired upstream or
/// downstream. Everything an agent can observe of the outside world goes
/// through the [`Ports`] surface.
#[async_trait]
pub trait Agent: Send {
    /// The declared port set, queried once when the network is built.
    fn signature(&self) -> Signature;

    /// Execute one run. Invoked by the scheduler only when every mandatory
    /// port holds at least one pending message (agents without input ports
    /// get a single kickoff run at network start).
    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError>;
}
