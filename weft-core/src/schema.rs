//! Schema descriptors — the compiled artifact handed over by the external
//! schema toolchain.
//!
//! The core never interprets payload bytes itself. A [`SchemaDescriptor`]
//! is the contract surface: a stable type id plus a layout version. Two
//! ports are wire-compatible iff both halves are equal, and that check
//! happens exactly once, when the network is built.

use crate::id::SchemaId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compiled schema descriptor: stable type id plus layout version.
///
/// Descriptors are cheap to clone and compare. The payload reader/builder
/// pair lives on [`Message`](crate::message::Message) — the descriptor only
/// identifies *which* layout those bytes follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    id: SchemaId,
    version: u32,
}

impl SchemaDescriptor {
    /// Create a descriptor from a stable type id and a layout version.
    pub fn new(id: impl Into<String>, version: u32) -> Self {
        Self {
            id: SchemaId::new(id),
            version,
        }
    }

    /// The stable type id.
    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// The layout version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether a message of `other`'s schema may flow into a port declared
    /// with `self`. Plain equality — schema evolution is the toolchain's
    /// problem, not the runtime's.
    pub fn accepts(&self, other: &SchemaDescriptor) -> bool {
        self == other
    }
}

impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
