//! Connection backends: bounded FIFO queues and latest-wins peek cells.
//!
//! Every connection in a built network is backed by one of two shared
//! structures. Consuming disciplines (Input, InputArray) get a bounded
//! tokio mpsc channel — sending into a full buffer awaits, which is the
//! backpressure mechanism. Peek disciplines (Option, Accumulator) get a
//! cell holding only the latest arrival. Either way the sender side wakes
//! the scheduler so the receiving agent's readiness is re-evaluated.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use weft_core::agent::Ports;
use weft_core::error::PortError;
use weft_core::id::{AgentId, ElementName};
use weft_core::message::Message;
use weft_core::port::{PortKind, Signature};

use crate::scheduler::Event;

/// Raised by a sender when every channel behind it has shut down.
pub(crate) struct Disconnected;

/// Latest-wins storage behind Option/Accumulator ports. Shared between
/// all producers of the port and its single owning consumer.
#[derive(Clone, Default)]
pub(crate) struct PeekCell {
    inner: Arc<Mutex<Option<Message>>>,
}

impl PeekCell {
    fn store(&self, message: Message) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(message);
        }
    }

    fn load(&self) -> Option<Message> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }

    fn is_filled(&self) -> bool {
        self.inner.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

enum Sink {
    Queue(mpsc::Sender<Message>),
    Cell(PeekCell),
}

/// The producing half of one connection. Delivery wakes the scheduler
/// unless the connection terminates at a network boundary.
pub(crate) struct TxEndpoint {
    sink: Sink,
    wake: Option<Wake>,
}

struct Wake {
    target: AgentId,
    events: mpsc::UnboundedSender<Event>,
}

impl TxEndpoint {
    pub(crate) fn queue(
        tx: mpsc::Sender<Message>,
        wake: Option<(AgentId, mpsc::UnboundedSender<Event>)>,
    ) -> Self {
        Self {
            sink: Sink::Queue(tx),
            wake: wake.map(|(target, events)| Wake { target, events }),
        }
    }

    pub(crate) fn cell(
        cell: PeekCell,
        wake: Option<(AgentId, mpsc::UnboundedSender<Event>)>,
    ) -> Self {
        Self {
            sink: Sink::Cell(cell),
            wake: wake.map(|(target, events)| Wake { target, events }),
        }
    }

    /// Deliver one logical copy. Awaits while a bounded queue is at
    /// capacity; a cell store replaces the previous latest and never
    /// blocks.
    pub(crate) async fn send(&self, message: Message) -> Result<(), Disconnected> {
        match &self.sink {
            Sink::Queue(tx) => tx.send(message).await.map_err(|_| Disconnected)?,
            Sink::Cell(cell) => cell.store(message),
        }
        if let Some(wake) = &self.wake {
            let _ = wake.events.send(Event::Delivered(wake.target.clone()));
        }
        Ok(())
    }
}

/// The consuming half of a bounded queue.
pub(crate) struct QueueRx {
    rx: mpsc::Receiver<Message>,
}

impl QueueRx {
    pub(crate) fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self { rx }
    }

    fn pending(&self) -> bool {
        !self.rx.is_empty()
    }

    fn pull(&mut self) -> Result<Message, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

struct PeekView {
    cell: PeekCell,
    seed: Option<Message>,
}

/// Fan-out over every channel connected to one producing endpoint.
///
/// Delivery is sequential, so a full buffer anywhere blocks the producer
/// until the slowest consumer drains — backpressure propagates, nothing
/// is dropped. An endpoint nothing was ever wired to swallows sends;
/// one whose every channel has closed reports `Disconnected`.
#[derive(Default)]
pub(crate) struct Fanout {
    targets: Vec<TxEndpoint>,
}

impl Fanout {
    pub(crate) fn push(&mut self, target: TxEndpoint) {
        self.targets.push(target);
    }

    async fn send(&self, message: Message) -> Result<(), Disconnected> {
        if self.targets.is_empty() {
            return Ok(());
        }
        let mut delivered = 0usize;
        for target in &self.targets {
            if target.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        if delivered == 0 {
            return Err(Disconnected);
        }
        Ok(())
    }
}

/// The wired port set of one agent instance — the concrete [`Ports`]
/// implementation handed to every run.
///
/// Built by `GraphSpec::build` and owned by the scheduler slot; moving it
/// into the run task is what makes receive/send race-free without locks.
pub(crate) struct ChannelPorts {
    kinds: HashMap<String, PortKind>,
    inputs: HashMap<String, QueueRx>,
    input_arrays: HashMap<String, BTreeMap<ElementName, QueueRx>>,
    peeks: HashMap<String, PeekView>,
    outputs: HashMap<String, Fanout>,
    output_arrays: HashMap<String, BTreeMap<ElementName, Fanout>>,
}

impl ChannelPorts {
    /// Initialize the port set from a signature: every declared port is
    /// registered up front so discipline checks work even on ports the
    /// wiring left unconnected.
    pub(crate) fn new(signature: &Signature) -> Self {
        let mut this = Self {
            kinds: HashMap::new(),
            inputs: HashMap::new(),
            input_arrays: HashMap::new(),
            peeks: HashMap::new(),
            outputs: HashMap::new(),
            output_arrays: HashMap::new(),
        };
        for decl in signature.ports() {
            let name = decl.name().as_str().to_owned();
            this.kinds.insert(name.clone(), decl.kind());
            match decl.kind() {
                PortKind::Input => {}
                PortKind::InputArray => {
                    this.input_arrays.insert(name, BTreeMap::new());
                }
                PortKind::Output => {
                    this.outputs.insert(name, Fanout::default());
                }
                PortKind::OutputArray => {
                    this.output_arrays.insert(name, BTreeMap::new());
                }
                PortKind::Option | PortKind::Accumulator => {
                    this.peeks.insert(
                        name,
                        PeekView {
                            cell: PeekCell::default(),
                            seed: None,
                        },
                    );
                }
            }
        }
        this
    }

    pub(crate) fn attach_input(&mut self, port: &str, rx: QueueRx) {
        self.inputs.insert(port.to_owned(), rx);
    }

    pub(crate) fn attach_array_input(&mut self, port: &str, element: ElementName, rx: QueueRx) {
        self.input_arrays
            .entry(port.to_owned())
            .or_default()
            .insert(element, rx);
    }

    /// Shared cell of a peek port, for handing to producers.
    pub(crate) fn peek_cell(&self, port: &str) -> Option<PeekCell> {
        self.peeks.get(port).map(|view| view.cell.clone())
    }

    pub(crate) fn set_seed(&mut self, port: &str, seed: Message) {
        if let Some(view) = self.peeks.get_mut(port) {
            view.seed = Some(seed);
        }
    }

    pub(crate) fn add_output_target(&mut self, port: &str, target: TxEndpoint) {
        self.outputs.entry(port.to_owned()).or_default().push(target);
    }

    pub(crate) fn add_array_output_target(
        &mut self,
        port: &str,
        element: ElementName,
        target: TxEndpoint,
    ) {
        self.output_arrays
            .entry(port.to_owned())
            .or_default()
            .entry(element)
            .or_default()
            .push(target);
    }

    /// Conjunctive readiness: every mandatory simple port and every wired
    /// mandatory array element holds at least one pending message.
    pub(crate) fn ready(&self) -> bool {
        self.inputs.values().all(QueueRx::pending)
            && self
                .input_arrays
                .values()
                .all(|elements| elements.values().all(QueueRx::pending))
    }

    /// Whether any mandatory endpoint exists at all. Agents without one
    /// never gate on readiness — they run on kickoff or peek arrival.
    pub(crate) fn has_mandatory(&self) -> bool {
        !self.inputs.is_empty()
            || self.input_arrays.values().any(|elements| !elements.is_empty())
    }

    /// Whether the agent has any input-side endpoint (mandatory, or a
    /// peek port). Inputless agents are sources and get one kickoff run.
    pub(crate) fn has_any_inputs(&self) -> bool {
        self.has_mandatory() || !self.peeks.is_empty()
    }

    fn kind_of(&self, port: &str) -> Result<PortKind, PortError> {
        self.kinds
            .get(port)
            .copied()
            .ok_or_else(|| PortError::Unknown(port.to_owned()))
    }

    fn expect_kind(
        &self,
        port: &str,
        expected: &[PortKind],
        op: &'static str,
    ) -> Result<PortKind, PortError> {
        let kind = self.kind_of(port)?;
        if !expected.contains(&kind) {
            return Err(PortError::Discipline {
                port: port.to_owned(),
                kind,
                op,
            });
        }
        Ok(kind)
    }

    fn pull_from(rx: &mut QueueRx, port: &str) -> Result<Message, PortError> {
        rx.pull().map_err(|err| match err {
            mpsc::error::TryRecvError::Empty => PortError::Empty(port.to_owned()),
            mpsc::error::TryRecvError::Disconnected => PortError::Closed(port.to_owned()),
        })
    }
}

#[async_trait]
impl Ports for ChannelPorts {
    fn receive(&mut self, port: &str) -> Result<Message, PortError> {
        self.expect_kind(port, &[PortKind::Input], "receive")?;
        let rx = self
            .inputs
            .get_mut(port)
            .ok_or_else(|| PortError::Closed(port.to_owned()))?;
        Self::pull_from(rx, port)
    }

    fn receive_element(&mut self, port: &str, element: &str) -> Result<Message, PortError> {
        self.expect_kind(port, &[PortKind::InputArray], "receive_element")?;
        let elements = self
            .input_arrays
            .get_mut(port)
            .ok_or_else(|| PortError::Unknown(port.to_owned()))?;
        let rx = elements
            .get_mut(&ElementName::new(element))
            .ok_or_else(|| PortError::UnknownElement {
                port: port.to_owned(),
                element: element.to_owned(),
            })?;
        Self::pull_from(rx, port)
    }

    fn peek(&self, port: &str) -> Result<Option<Message>, PortError> {
        self.expect_kind(port, &[PortKind::Option, PortKind::Accumulator], "peek")?;
        let view = self
            .peeks
            .get(port)
            .ok_or_else(|| PortError::Unknown(port.to_owned()))?;
        if view.cell.is_filled() {
            return Ok(view.cell.load());
        }
        Ok(view.seed.clone())
    }

    async fn send(&mut self, port: &str, message: Message) -> Result<(), PortError> {
        self.expect_kind(port, &[PortKind::Output], "send")?;
        let fanout = self
            .outputs
            .get(port)
            .ok_or_else(|| PortError::Unknown(port.to_owned()))?;
        fanout
            .send(message)
            .await
            .map_err(|Disconnected| PortError::Closed(port.to_owned()))
    }

    async fn send_element(
        &mut self,
        port: &str,
        element: &str,
        message: Message,
    ) -> Result<(), PortError> {
        self.expect_kind(port, &[PortKind::OutputArray], "send_element")?;
        let elements = self
            .output_arrays
            .get(port)
            .ok_or_else(|| PortError::Unknown(port.to_owned()))?;
        let fanout = elements
            .get(&ElementName::new(element))
            .ok_or_else(|| PortError::UnknownElement {
                port: port.to_owned(),
                element: element.to_owned(),
            })?;
        fanout
            .send(message)
            .await
            .map_err(|Disconnected| PortError::Closed(port.to_owned()))
    }

    async fn send_broadcast(&mut self, port: &str, message: Message) -> Result<(), PortError> {
        self.expect_kind(port, &[PortKind::OutputArray], "send_broadcast")?;
        let elements = self
            .output_arrays
            .get(port)
            .ok_or_else(|| PortError::Unknown(port.to_owned()))?;
        for fanout in elements.values() {
            fanout
                .send(message.clone())
                .await
                .map_err(|Disconnected| PortError::Closed(port.to_owned()))?;
        }
        Ok(())
    }

    fn elements(&self, port: &str) -> Result<Vec<ElementName>, PortError> {
        let kind = self.expect_kind(
            port,
            &[PortKind::InputArray, PortKind::OutputArray],
            "elements",
        )?;
        let names = match kind {
            PortKind::InputArray => self
                .input_arrays
                .get(port)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default(),
            _ => self
                .output_arrays
                .get(port)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default(),
        };
        Ok(names)
    }
}
