//! # weft-core — protocol types for flow-based agent networks
//!
//! This crate defines the boundaries of the weft execution model. Agents
//! are independent units of computation that communicate exclusively
//! through typed, named message ports; wiring them together (in
//! `weft-net`) produces an executable dataflow network with no shared
//! mutable state between agents.
//!
//! ## The pieces
//!
//! | Piece | Types | What it does |
//! |-------|-------|--------------|
//! | Message | [`Message`], [`MessageBuilder`] | Immutable, schema-typed payload |
//! | Schema | [`SchemaDescriptor`] | Compiled type id + version, matched at build |
//! | Port | [`PortKind`], [`PortDecl`], [`Signature`] | The six disciplines an agent declares |
//! | Agent | [`Agent`], [`Ports`], [`Outcome`] | One run per scheduling cycle |
//!
//! ## Design principle
//!
//! An agent is oblivious to who is upstream or downstream — only to the
//! shape of its ports and the schema of the messages it accepts. The
//! [`Ports`] trait is everything a run can observe; the [`Agent`] trait is
//! everything the runtime can invoke. Both stay implementation-free here
//! so execution engines are swappable.
//!
//! ## Dependency notes
//!
//! Message payloads are serde_json bytes behind the schema descriptor.
//! JSON is the universal interchange format and keeps the reader/builder
//! pair the schema collaborator must supply down to plain serde derives.

#![deny(missing_docs)]

pub mod agent;
pub mod error;
pub mod id;
pub mod message;
pub mod port;
pub mod schema;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use agent::{Agent, Outcome, Ports};
pub use error::{AgentError, MessageError, PortError};
pub use id::{AgentId, ElementName, PortName, SchemaId};
pub use message::{Message, MessageBuilder};
pub use port::{PortDecl, PortKind, Signature, SignatureBuilder};
pub use schema::SchemaDescriptor;
