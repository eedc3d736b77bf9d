#![deny(missing_docs)]
//! # weft — umbrella crate
//!
//! Provides a single import surface for flow-based agent networks.
//! Re-exports the protocol crate and the execution engine behind feature
//! flags, plus a `prelude` for the happy path.

#[cfg(feature = "core")]
pub use weft_core;
#[cfg(feature = "net")]
pub use weft_net;

/// Happy-path imports for composing weft networks.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use weft_core::{
        Agent, AgentError, AgentId, ElementName, Message, MessageBuilder, MessageError, Outcome,
        PortDecl, PortError, PortKind, PortName, Ports, SchemaDescriptor, SchemaId, Signature,
    };

    #[cfg(feature = "net")]
    pub use weft_net::{
        BuildError, Endpoint, Failure, FailurePolicy, GraphSpec, Network, NetworkConfig,
        NetworkError, NetworkHandle, OutputTap, RunOutcome,
    };
}
