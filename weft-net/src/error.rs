//! Error types for network construction and the embedding boundary.

use thiserror::Error;
use weft_core::port::PortKind;

/// Malformed-network errors. All of these are raised by
/// [`GraphSpec::build`](crate::graph::GraphSpec::build), before any agent
/// ever runs — a started network never fails for these reasons.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BuildError {
    /// Two agents (or an agent and a subgraph namespace) share an id.
    #[error("duplicate agent id: {agent}")]
    DuplicateAgent {
        /// The repeated id.
        agent: String,
    },

    /// An agent's signature declares the same port name twice.
    #[error("agent {agent} declares duplicate port name {port}")]
    DuplicatePort {
        /// The declaring agent.
        agent: String,
        /// The repeated name.
        port: String,
    },

    /// A wiring endpoint names an agent that was never added.
    #[error("unknown agent: {agent}")]
    UnknownAgent {
        /// The missing id.
        agent: String,
    },

    /// A wiring endpoint names a port the agent does not declare.
    #[error("unknown port {port} on agent {agent}")]
    UnknownPort {
        /// The addressed agent.
        agent: String,
        /// The missing port.
        port: String,
    },

    /// An array-port endpoint without an element selector.
    #[error("endpoint {endpoint} must name an element of the array port")]
    MissingElement {
        /// The incomplete endpoint.
        endpoint: String,
    },

    /// An element selector on a non-array port.
    #[error("endpoint {endpoint} names an element on a non-array port")]
    UnexpectedElement {
        /// The over-specified endpoint.
        endpoint: String,
    },

    /// A connection starts at a port that cannot produce.
    #[error("{endpoint} cannot act as a producer ({kind} discipline)")]
    NotAProducer {
        /// The offending endpoint.
        endpoint: String,
        /// Its declared discipline.
        kind: PortKind,
    },

    /// A connection ends at a port that cannot consume.
    #[error("{endpoint} cannot act as a consumer ({kind} discipline)")]
    NotAConsumer {
        /// The offending endpoint.
        endpoint: String,
        /// Its declared discipline.
        kind: PortKind,
    },

    /// Producing and consuming schemas differ.
    #[error("schema mismatch on {from} -> {to}: produces {produced}, accepts {accepted}")]
    SchemaMismatch {
        /// Producing endpoint.
        from: String,
        /// Consuming endpoint.
        to: String,
        /// Schema the producer emits.
        produced: String,
        /// Schema the consumer declares.
        accepted: String,
    },

    /// A mandatory input was neither connected nor exposed.
    #[error("mandatory input {endpoint} has no producing connection")]
    MissingConnection {
        /// The dangling endpoint.
        endpoint: String,
    },

    /// A mandatory input with more than one producer.
    #[error("mandatory input {endpoint} has more than one producing connection")]
    DuplicateConnection {
        /// The over-connected endpoint.
        endpoint: String,
    },

    /// A seed aimed at a port that is not an Accumulator.
    #[error("seed target {endpoint} is not an accumulator port")]
    SeedTarget {
        /// The mis-targeted endpoint.
        endpoint: String,
    },

    /// A seed message whose schema the accumulator does not accept.
    #[error("seed for {endpoint} carries {seeded}, port accepts {accepted}")]
    SeedSchema {
        /// The seeded endpoint.
        endpoint: String,
        /// Schema of the seed message.
        seeded: String,
        /// Schema the port declares.
        accepted: String,
    },

    /// Two seeds for the same accumulator.
    #[error("duplicate seed for {endpoint}")]
    DuplicateSeed {
        /// The endpoint seeded twice.
        endpoint: String,
    },

    /// Two boundary exposures share a name.
    #[error("duplicate boundary port name: {name}")]
    DuplicateBoundary {
        /// The repeated name.
        name: String,
    },

    /// An element selector aimed at a subgraph boundary port.
    #[error("boundary endpoint {endpoint} cannot take an element selector")]
    BoundaryElement {
        /// The offending endpoint.
        endpoint: String,
    },
}

/// Errors crossing the embedding boundary of a running network.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The named boundary port was never exposed.
    #[error("unknown boundary port: {0}")]
    UnknownBoundary(String),

    /// An injected message of the wrong schema.
    #[error("boundary port {port} accepts {accepted}, got {sent}")]
    SchemaMismatch {
        /// The boundary port.
        port: String,
        /// Schema of the injected message.
        sent: String,
        /// Schema the port declares.
        accepted: String,
    },

    /// The agent behind the boundary port has shut down.
    #[error("boundary port {0} is closed")]
    Closed(String),
}
