//! Error types for each protocol concern.

use crate::port::PortKind;
use thiserror::Error;

/// Message codec errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MessageError {
    /// Serializing a payload failed.
    #[error("encoding payload for schema {schema} failed: {source}")]
    Encode {
        /// Schema the payload was built for.
        schema: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// The payload bytes do not follow the schema they are tagged with.
    /// Fatal to the reading agent only.
    #[error("decoding payload for schema {schema} failed: {source}")]
    Decode {
        /// Schema the payload claims to follow.
        schema: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// A message was built without a payload.
    #[error("message for schema {0} built without a payload")]
    EmptyPayload(String),
}

/// Port I/O errors raised during a run. All of these are contract
/// violations or shutdown observations — a well-scheduled agent on a
/// well-formed network only ever sees `Closed`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PortError {
    /// The named port is not part of the agent's signature.
    #[error("unknown port: {0}")]
    Unknown(String),

    /// The named element was never wired on this array port.
    #[error("unknown element {element} on array port {port}")]
    UnknownElement {
        /// The array port.
        port: String,
        /// The element that was never wired.
        element: String,
    },

    /// Receive on a port holding no message. The scheduler only invokes an
    /// agent when every mandatory port is non-empty, so hitting this means
    /// the agent received more often than it was scheduled for.
    #[error("receive on empty port {0}")]
    Empty(String),

    /// Every channel behind the port has shut down — the upstream-visible
    /// form of cascading shutdown.
    #[error("port {0} is closed")]
    Closed(String),

    /// The operation is not defined for the port's discipline
    /// (e.g. peek on an Input, send into an InputArray).
    #[error("{op} is not supported on {kind} port {port}")]
    Discipline {
        /// The port.
        port: String,
        /// Its declared discipline.
        kind: PortKind,
        /// The attempted operation.
        op: &'static str,
    },
}

/// Failure signal raised by — or on behalf of — a single agent. Surfaced
/// on the network's aggregated failure list; never unwinds into sibling
/// agents.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// A port contract violation during the run.
    #[error("port contract violation: {0}")]
    Port(#[from] PortError),

    /// A message failed to encode or decode.
    #[error("message codec failure: {0}")]
    Message(#[from] MessageError),

    /// The agent's own logic reported a domain error.
    #[error("{0}")]
    Failed(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AgentError {
    /// Report a domain failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
