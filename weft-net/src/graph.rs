//! Static wiring of agent instances into an executable network.
//!
//! [`GraphSpec`] is the surface the external composer drives: add agent
//! instances, connect producing endpoints to consuming endpoints, expose
//! boundary ports, nest subgraphs. `build` validates the whole wiring —
//! schema compatibility, mandatory-input coverage, discipline rules —
//! and constructs every channel, so that nothing malformed survives to
//! run time. Cycles are permitted; the graph is held as ids and index
//! pairs, never as owned references between agents.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::mpsc;

use weft_core::agent::Agent;
use weft_core::id::{AgentId, ElementName, PortName};
use weft_core::message::Message;
use weft_core::port::{PortDecl, PortKind, Signature};

use crate::channel::{ChannelPorts, QueueRx, TxEndpoint};
use crate::error::BuildError;
use crate::network::{BoundaryInput, Network, NetworkConfig, OutputTap};
use crate::scheduler::{AgentBody, Event};

/// One addressable end of a connection: agent, port, and — for array
/// ports — the element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    agent: AgentId,
    port: PortName,
    element: Option<ElementName>,
}

impl Endpoint {
    /// Address a simple (non-array) port.
    pub fn new(agent: impl Into<AgentId>, port: impl Into<PortName>) -> Self {
        Self {
            agent: agent.into(),
            port: port.into(),
            element: None,
        }
    }

    /// Address one element of an array port. Elements come into existence
    /// by being wired; the element set is fixed once the network is built.
    pub fn element(
        agent: impl Into<AgentId>,
        port: impl Into<PortName>,
        element: impl Into<ElementName>,
    ) -> Self {
        Self {
            agent: agent.into(),
            port: port.into(),
            element: Some(element.into()),
        }
    }

    /// The addressed agent.
    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// The addressed port.
    pub fn port(&self) -> &PortName {
        &self.port
    }

    /// The selected array element, if any.
    pub fn selected(&self) -> Option<&ElementName> {
        self.element.as_ref()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.element {
            Some(element) => write!(f, "{}.{}[{}]", self.agent, self.port, element),
            None => write!(f, "{}.{}", self.agent, self.port),
        }
    }
}

/// The static wiring an external composer hands to the core: agent
/// instances, directed connections, boundary exposures, accumulator
/// seeds, and nested subgraphs.
#[derive(Default)]
pub struct GraphSpec {
    agents: Vec<(AgentId, Box<dyn Agent>)>,
    subgraphs: Vec<(String, GraphSpec)>,
    connections: Vec<(Endpoint, Endpoint)>,
    exposed_inputs: Vec<(String, Endpoint)>,
    exposed_outputs: Vec<(String, Endpoint)>,
    seeds: Vec<(Endpoint, Message)>,
}

impl GraphSpec {
    /// An empty wiring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent instance under a unique id.
    pub fn add_agent(&mut self, id: impl Into<AgentId>, agent: Box<dyn Agent>) -> &mut Self {
        self.agents.push((id.into(), agent));
        self
    }

    /// Nest another wiring as a composite agent. The subgraph's agents are
    /// namespaced `"{namespace}/{id}"`, and its exposed boundary ports
    /// become connectable endpoints `(namespace, exposed_name)` here.
    pub fn add_subgraph(&mut self, namespace: impl Into<String>, sub: GraphSpec) -> &mut Self {
        self.subgraphs.push((namespace.into(), sub));
        self
    }

    /// Connect a producing endpoint to a consuming endpoint. May be called
    /// repeatedly with the same producer — every connected channel then
    /// receives the same logical copy of each send.
    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> &mut Self {
        self.connections.push((from, to));
        self
    }

    /// Expose a consuming endpoint as an entry boundary port.
    pub fn expose_input(&mut self, name: impl Into<String>, at: Endpoint) -> &mut Self {
        self.exposed_inputs.push((name.into(), at));
        self
    }

    /// Expose a producing endpoint as an exit boundary port.
    pub fn expose_output(&mut self, name: impl Into<String>, at: Endpoint) -> &mut Self {
        self.exposed_outputs.push((name.into(), at));
        self
    }

    /// Seed an Accumulator port with the value `peek` returns before the
    /// first arrival.
    pub fn seed(&mut self, at: Endpoint, message: Message) -> &mut Self {
        self.seeds.push((at, message));
        self
    }

    /// Validate the wiring and construct every channel. All
    /// malformed-network conditions surface here, before any agent runs.
    pub fn build(self, config: NetworkConfig) -> Result<Network, BuildError> {
        let flat = self.flatten()?;

        // Register agents and their signatures.
        let mut signatures: HashMap<AgentId, Signature> = HashMap::new();
        let mut bodies: Vec<(AgentId, Box<dyn Agent>)> = Vec::new();
        for (id, agent) in flat.agents {
            if signatures.contains_key(&id) {
                return Err(BuildError::DuplicateAgent {
                    agent: id.to_string(),
                });
            }
            let signature = agent.signature();
            let mut seen = HashSet::new();
            for decl in signature.ports() {
                if !seen.insert(decl.name().clone()) {
                    return Err(BuildError::DuplicatePort {
                        agent: id.to_string(),
                        port: decl.name().to_string(),
                    });
                }
            }
            signatures.insert(id.clone(), signature);
            bodies.push((id, agent));
        }

        // Validate connections and count producers per consuming endpoint.
        let mut consumers: HashMap<(AgentId, PortName, Option<ElementName>), (PortKind, usize)> =
            HashMap::new();
        for (from, to) in &flat.connections {
            let from_decl = producer_decl(&signatures, from)?;
            let to_decl = consumer_decl(&signatures, to)?;
            if !to_decl.schema().accepts(from_decl.schema()) {
                return Err(BuildError::SchemaMismatch {
                    from: from.to_string(),
                    to: to.to_string(),
                    produced: from_decl.schema().to_string(),
                    accepted: to_decl.schema().to_string(),
                });
            }
            record_consumer(&mut consumers, to, to_decl.kind());
        }

        // Validate boundary exposures. An exposed input counts as the
        // producing connection of its endpoint.
        let mut boundary_names = HashSet::new();
        for (name, at) in &flat.exposed_inputs {
            if !boundary_names.insert(name.clone()) {
                return Err(BuildError::DuplicateBoundary { name: name.clone() });
            }
            let decl = consumer_decl(&signatures, at)?;
            record_consumer(&mut consumers, at, decl.kind());
        }
        for (name, at) in &flat.exposed_outputs {
            if !boundary_names.insert(name.clone()) {
                return Err(BuildError::DuplicateBoundary { name: name.clone() });
            }
            producer_decl(&signatures, at)?;
        }

        // Exactly one producer per mandatory endpoint.
        for ((agent, port, element), (kind, count)) in &consumers {
            if kind.is_mandatory() && *count > 1 {
                return Err(BuildError::DuplicateConnection {
                    endpoint: endpoint_label(agent, port, element.as_ref()),
                });
            }
        }
        for (id, signature) in &signatures {
            for decl in signature.mandatory() {
                if decl.kind() == PortKind::Input {
                    let key = (id.clone(), decl.name().clone(), None);
                    if !consumers.contains_key(&key) {
                        return Err(BuildError::MissingConnection {
                            endpoint: endpoint_label(id, decl.name(), None),
                        });
                    }
                }
            }
        }

        // Validate seeds.
        let mut seeded = HashSet::new();
        for (at, message) in &flat.seeds {
            let decl = consumer_decl(&signatures, at)?;
            if decl.kind() != PortKind::Accumulator {
                return Err(BuildError::SeedTarget {
                    endpoint: at.to_string(),
                });
            }
            if !decl.schema().accepts(message.schema()) {
                return Err(BuildError::SeedSchema {
                    endpoint: at.to_string(),
                    seeded: message.schema().to_string(),
                    accepted: decl.schema().to_string(),
                });
            }
            if !seeded.insert(at.clone()) {
                return Err(BuildError::DuplicateSeed {
                    endpoint: at.to_string(),
                });
            }
        }

        // Construct channels.
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut ports: HashMap<AgentId, ChannelPorts> = signatures
            .iter()
            .map(|(id, signature)| (id.clone(), ChannelPorts::new(signature)))
            .collect();

        for (from, to) in &flat.connections {
            let target = make_consumer_endpoint(&signatures, &mut ports, to, &config, &events_tx)?;
            attach_producer(&signatures, &mut ports, from, target)?;
        }

        let mut injectors = HashMap::new();
        for (name, at) in &flat.exposed_inputs {
            let target = make_consumer_endpoint(&signatures, &mut ports, at, &config, &events_tx)?;
            let schema = consumer_decl(&signatures, at)?.schema().clone();
            injectors.insert(name.clone(), BoundaryInput { tx: target, schema });
        }

        let mut taps = HashMap::new();
        for (name, at) in &flat.exposed_outputs {
            let decl = producer_decl(&signatures, at)?;
            let capacity = decl.capacity().unwrap_or(config.default_capacity).max(1);
            let (tx, rx) = mpsc::channel(capacity);
            attach_producer(&signatures, &mut ports, at, TxEndpoint::queue(tx, None))?;
            taps.insert(name.clone(), OutputTap::new(rx));
        }

        for (at, message) in &flat.seeds {
            if let Some(agent_ports) = ports.get_mut(at.agent()) {
                agent_ports.set_seed(at.port().as_str(), message.clone());
            }
        }

        // Assemble slots in registration order.
        let mut slots = Vec::with_capacity(bodies.len());
        for (id, agent) in bodies {
            let agent_ports = ports.remove(&id).ok_or_else(|| BuildError::UnknownAgent {
                agent: id.to_string(),
            })?;
            slots.push((
                id,
                AgentBody {
                    agent,
                    ports: agent_ports,
                },
            ));
        }

        tracing::debug!(
            agents = slots.len(),
            connections = flat.connections.len(),
            boundary_inputs = injectors.len(),
            boundary_outputs = taps.len(),
            "network validated"
        );

        Ok(Network {
            slots,
            events_tx,
            events_rx,
            injectors,
            taps,
            config,
        })
    }

    /// Recursively splice nested subgraphs into one flat wiring,
    /// namespacing inner agent ids and resolving references to subgraph
    /// boundary ports into the inner endpoints they expose.
    fn flatten(self) -> Result<FlatGraph, BuildError> {
        let GraphSpec {
            agents,
            subgraphs,
            connections,
            exposed_inputs,
            exposed_outputs,
            seeds,
        } = self;
        let mut flat = FlatGraph {
            agents,
            connections,
            exposed_inputs,
            exposed_outputs,
            seeds,
        };
        if subgraphs.is_empty() {
            return Ok(flat);
        }

        let mut alias: HashMap<(String, String), Endpoint> = HashMap::new();
        for (namespace, sub) in subgraphs {
            if flat.agents.iter().any(|(id, _)| id.as_str() == namespace) {
                return Err(BuildError::DuplicateAgent { agent: namespace });
            }
            let inner = sub.flatten()?;
            for (id, agent) in inner.agents {
                flat.agents.push((namespaced(&namespace, &id), agent));
            }
            for (from, to) in inner.connections {
                flat.connections
                    .push((rebase(&namespace, from), rebase(&namespace, to)));
            }
            for (at, message) in inner.seeds {
                flat.seeds.push((rebase(&namespace, at), message));
            }
            for (name, at) in inner
                .exposed_inputs
                .into_iter()
                .chain(inner.exposed_outputs)
            {
                let key = (namespace.clone(), name);
                let rebased = rebase(&namespace, at);
                if alias.insert(key.clone(), rebased).is_some() {
                    return Err(BuildError::DuplicateBoundary {
                        name: format!("{}/{}", key.0, key.1),
                    });
                }
            }
        }

        flat.connections = flat
            .connections
            .into_iter()
            .map(|(from, to)| Ok((resolve(&alias, from)?, resolve(&alias, to)?)))
            .collect::<Result<_, BuildError>>()?;
        flat.exposed_inputs = flat
            .exposed_inputs
            .into_iter()
            .map(|(name, at)| Ok((name, resolve(&alias, at)?)))
            .collect::<Result<_, BuildError>>()?;
        flat.exposed_outputs = flat
            .exposed_outputs
            .into_iter()
            .map(|(name, at)| Ok((name, resolve(&alias, at)?)))
            .collect::<Result<_, BuildError>>()?;
        flat.seeds = flat
            .seeds
            .into_iter()
            .map(|(at, message)| Ok((resolve(&alias, at)?, message)))
            .collect::<Result<_, BuildError>>()?;

        Ok(flat)
    }
}

struct FlatGraph {
    agents: Vec<(AgentId, Box<dyn Agent>)>,
    connections: Vec<(Endpoint, Endpoint)>,
    exposed_inputs: Vec<(String, Endpoint)>,
    exposed_outputs: Vec<(String, Endpoint)>,
    seeds: Vec<(Endpoint, Message)>,
}

fn namespaced(namespace: &str, id: &AgentId) -> AgentId {
    AgentId::new(format!("{namespace}/{id}"))
}

fn rebase(namespace: &str, at: Endpoint) -> Endpoint {
    Endpoint {
        agent: namespaced(namespace, &at.agent),
        ..at
    }
}

fn resolve(
    alias: &HashMap<(String, String), Endpoint>,
    at: Endpoint,
) -> Result<Endpoint, BuildError> {
    let key = (at.agent.as_str().to_owned(), at.port.as_str().to_owned());
    match alias.get(&key) {
        Some(inner) => {
            if at.element.is_some() {
                return Err(BuildError::BoundaryElement {
                    endpoint: at.to_string(),
                });
            }
            Ok(inner.clone())
        }
        None => Ok(at),
    }
}

fn endpoint_label(agent: &AgentId, port: &PortName, element: Option<&ElementName>) -> String {
    match element {
        Some(element) => format!("{agent}.{port}[{element}]"),
        None => format!("{agent}.{port}"),
    }
}

fn lookup_decl<'a>(
    signatures: &'a HashMap<AgentId, Signature>,
    at: &Endpoint,
) -> Result<&'a PortDecl, BuildError> {
    let signature = signatures
        .get(at.agent())
        .ok_or_else(|| BuildError::UnknownAgent {
            agent: at.agent().to_string(),
        })?;
    signature
        .get(at.port().as_str())
        .ok_or_else(|| BuildError::UnknownPort {
            agent: at.agent().to_string(),
            port: at.port().to_string(),
        })
}

fn producer_decl<'a>(
    signatures: &'a HashMap<AgentId, Signature>,
    at: &Endpoint,
) -> Result<&'a PortDecl, BuildError> {
    let decl = lookup_decl(signatures, at)?;
    if !decl.kind().is_output() {
        return Err(BuildError::NotAProducer {
            endpoint: at.to_string(),
            kind: decl.kind(),
        });
    }
    check_element_arity(decl.kind(), at)?;
    Ok(decl)
}

fn consumer_decl<'a>(
    signatures: &'a HashMap<AgentId, Signature>,
    at: &Endpoint,
) -> Result<&'a PortDecl, BuildError> {
    let decl = lookup_decl(signatures, at)?;
    if !decl.kind().is_input() {
        return Err(BuildError::NotAConsumer {
            endpoint: at.to_string(),
            kind: decl.kind(),
        });
    }
    check_element_arity(decl.kind(), at)?;
    Ok(decl)
}

fn check_element_arity(kind: PortKind, at: &Endpoint) -> Result<(), BuildError> {
    if kind.is_array() && at.selected().is_none() {
        return Err(BuildError::MissingElement {
            endpoint: at.to_string(),
        });
    }
    if !kind.is_array() && at.selected().is_some() {
        return Err(BuildError::UnexpectedElement {
            endpoint: at.to_string(),
        });
    }
    Ok(())
}

fn record_consumer(
    consumers: &mut HashMap<(AgentId, PortName, Option<ElementName>), (PortKind, usize)>,
    at: &Endpoint,
    kind: PortKind,
) {
    let key = (
        at.agent().clone(),
        at.port().clone(),
        at.selected().cloned(),
    );
    consumers.entry(key).or_insert((kind, 0)).1 += 1;
}

/// Create the channel behind one consuming endpoint and return the
/// producing half for attachment.
fn make_consumer_endpoint(
    signatures: &HashMap<AgentId, Signature>,
    ports: &mut HashMap<AgentId, ChannelPorts>,
    at: &Endpoint,
    config: &NetworkConfig,
    events_tx: &mpsc::UnboundedSender<Event>,
) -> Result<TxEndpoint, BuildError> {
    let decl = consumer_decl(signatures, at)?;
    let agent_ports = ports
        .get_mut(at.agent())
        .ok_or_else(|| BuildError::UnknownAgent {
            agent: at.agent().to_string(),
        })?;
    let wake = Some((at.agent().clone(), events_tx.clone()));
    match decl.kind() {
        PortKind::Input => {
            let capacity = decl.capacity().unwrap_or(config.default_capacity).max(1);
            let (tx, rx) = mpsc::channel(capacity);
            agent_ports.attach_input(at.port().as_str(), QueueRx::new(rx));
            Ok(TxEndpoint::queue(tx, wake))
        }
        PortKind::InputArray => {
            let element = at
                .selected()
                .cloned()
                .ok_or_else(|| BuildError::MissingElement {
                    endpoint: at.to_string(),
                })?;
            let capacity = decl.capacity().unwrap_or(config.default_capacity).max(1);
            let (tx, rx) = mpsc::channel(capacity);
            agent_ports.attach_array_input(at.port().as_str(), element, QueueRx::new(rx));
            Ok(TxEndpoint::queue(tx, wake))
        }
        PortKind::Option | PortKind::Accumulator => {
            let cell =
                agent_ports
                    .peek_cell(at.port().as_str())
                    .ok_or_else(|| BuildError::UnknownPort {
                        agent: at.agent().to_string(),
                        port: at.port().to_string(),
                    })?;
            Ok(TxEndpoint::cell(cell, wake))
        }
        kind => Err(BuildError::NotAConsumer {
            endpoint: at.to_string(),
            kind,
        }),
    }
}

/// Register the producing half of a connection on its owning agent.
fn attach_producer(
    signatures: &HashMap<AgentId, Signature>,
    ports: &mut HashMap<AgentId, ChannelPorts>,
    at: &Endpoint,
    target: TxEndpoint,
) -> Result<(), BuildError> {
    let decl = producer_decl(signatures, at)?;
    let kind = decl.kind();
    let agent_ports = ports
        .get_mut(at.agent())
        .ok_or_else(|| BuildError::UnknownAgent {
            agent: at.agent().to_string(),
        })?;
    match kind {
        PortKind::Output => agent_ports.add_output_target(at.port().as_str(), target),
        PortKind::OutputArray => {
            let element = at
                .selected()
                .cloned()
                .ok_or_else(|| BuildError::MissingElement {
                    endpoint: at.to_string(),
                })?;
            agent_ports.add_array_output_target(at.port().as_str(), element, target);
        }
        kind => {
            return Err(BuildError::NotAProducer {
                endpoint: at.to_string(),
                kind,
            });
        }
    }
    Ok(())
}
