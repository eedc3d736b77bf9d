//! Port disciplines and per-agent port declarations.
//!
//! The six disciplines form a closed set — every piece of buffer and peek
//! behavior in the runtime dispatches by exhaustive matching on
//! [`PortKind`], never by name-based reflection.

use crate::id::PortName;
use crate::schema::SchemaDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The discipline of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// Mandatory consuming input; one message removed per receive.
    Input,
    /// Fan-in input with named elements, element set fixed at wiring time.
    InputArray,
    /// Producing output, backpressured by the slowest connected consumer.
    Output,
    /// Fan-out output with named elements; supports broadcast.
    OutputArray,
    /// Peek-only side channel; empty until the first arrival.
    Option,
    /// Peek-only side channel with an optional wiring-time seed.
    Accumulator,
}

impl PortKind {
    /// Ports that consume or observe incoming messages.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            PortKind::Input | PortKind::InputArray | PortKind::Option | PortKind::Accumulator
        )
    }

    /// Ports that produce messages.
    pub fn is_output(self) -> bool {
        matches!(self, PortKind::Output | PortKind::OutputArray)
    }

    /// Ports that gate readiness: the scheduler only runs an agent when
    /// every mandatory endpoint holds at least one pending message.
    pub fn is_mandatory(self) -> bool {
        matches!(self, PortKind::Input | PortKind::InputArray)
    }

    /// Peek disciplines: the latest message is observed without removal.
    pub fn is_peek(self) -> bool {
        matches!(self, PortKind::Option | PortKind::Accumulator)
    }

    /// Array disciplines: endpoints are (port, element) pairs.
    pub fn is_array(self) -> bool {
        matches!(self, PortKind::InputArray | PortKind::OutputArray)
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortKind::Input => "input",
            PortKind::InputArray => "input_array",
            PortKind::Output => "output",
            PortKind::OutputArray => "output_array",
            PortKind::Option => "option",
            PortKind::Accumulator => "accumulator",
        };
        write!(f, "{name}")
    }
}

/// A single declared port: discipline, schema, buffer capacity.
///
/// `capacity` bounds the FIFO buffer of each channel delivering into this
/// port; `None` defers to the network-wide default. Capacity is meaningless
/// for peek disciplines (a cell holds exactly the latest message).
#[derive(Debug, Clone)]
pub struct PortDecl {
    name: PortName,
    kind: PortKind,
    schema: SchemaDescriptor,
    capacity: Option<usize>,
}

impl PortDecl {
    /// Declare a port with an explicit discipline.
    pub fn new(name: impl Into<String>, kind: PortKind, schema: SchemaDescriptor) -> Self {
        Self {
            name: PortName::new(name),
            kind,
            schema,
            capacity: None,
        }
    }

    /// Declare a mandatory `Input` port.
    pub fn input(name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self::new(name, PortKind::Input, schema)
    }

    /// Declare an `InputArray` port.
    pub fn input_array(name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self::new(name, PortKind::InputArray, schema)
    }

    /// Declare an `Output` port.
    pub fn output(name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self::new(name, PortKind::Output, schema)
    }

    /// Declare an `OutputArray` port.
    pub fn output_array(name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self::new(name, PortKind::OutputArray, schema)
    }

    /// Declare an `Option` peek port.
    pub fn option(name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self::new(name, PortKind::Option, schema)
    }

    /// Declare an `Accumulator` peek port.
    pub fn accumulator(name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        Self::new(name, PortKind::Accumulator, schema)
    }

    /// Override the buffer capacity for channels delivering into this port.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// The port name.
    pub fn name(&self) -> &PortName {
        &self.name
    }

    /// The discipline.
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// The schema messages on this port must carry.
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Declared capacity override, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// The declared port set an agent exposes.
///
/// Built once through [`SignatureBuilder`]; the network queries it during
/// wiring — where duplicate names are rejected as a malformed-network
/// error — and never again afterwards.
#[derive(Debug, Clone)]
pub struct Signature {
    ports: Vec<PortDecl>,
}

impl Signature {
    /// Start declaring a port set.
    pub fn builder() -> SignatureBuilder {
        SignatureBuilder { ports: Vec::new() }
    }

    /// Look up a declared port by name.
    pub fn get(&self, name: &str) -> Option<&PortDecl> {
        self.ports.iter().find(|p| p.name().as_str() == name)
    }

    /// All declared ports, in declaration order.
    pub fn ports(&self) -> &[PortDecl] {
        &self.ports
    }

    /// The readiness-gating (Input / InputArray) subset.
    pub fn mandatory(&self) -> impl Iterator<Item = &PortDecl> {
        self.ports.iter().filter(|p| p.kind().is_mandatory())
    }

    /// Whether the agent declares any input-side port at all. Agents
    /// without one are sources and receive a single kickoff run at start.
    pub fn has_inputs(&self) -> bool {
        self.ports.iter().any(|p| p.kind().is_input())
    }
}

/// Builder for [`Signature`].
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    ports: Vec<PortDecl>,
}

impl SignatureBuilder {
    /// Add a fully-specified declaration.
    pub fn port(mut self, decl: PortDecl) -> Self {
        self.ports.push(decl);
        self
    }

    /// Shorthand for [`PortDecl::input`].
    pub fn input(self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.port(PortDecl::input(name, schema))
    }

    /// Shorthand for [`PortDecl::input_array`].
    pub fn input_array(self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.port(PortDecl::input_array(name, schema))
    }

    /// Shorthand for [`PortDecl::output`].
    pub fn output(self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.port(PortDecl::output(name, schema))
    }

    /// Shorthand for [`PortDecl::output_array`].
    pub fn output_array(self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.port(PortDecl::output_array(name, schema))
    }

    /// Shorthand for [`PortDecl::option`].
    pub fn option(self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.port(PortDecl::option(name, schema))
    }

    /// Shorthand for [`PortDecl::accumulator`].
    pub fn accumulator(self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.port(PortDecl::accumulator(name, schema))
    }

    /// Finish the port set, preserving declaration order.
    pub fn build(self) -> Signature {
        Signature { ports: self.ports }
    }
}
