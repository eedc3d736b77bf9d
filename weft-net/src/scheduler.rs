//! The readiness scheduler — decides which agents are runnable and drives
//! their execution.
//!
//! One event loop per network, on its own tokio task. Every delivery into
//! a consuming endpoint raises a [`Event::Delivered`] wake-up; the loop
//! re-evaluates readiness and moves each runnable agent's body into a
//! spawned task. The body comes back with the run result, which is how at
//! most one run per agent is ever in flight: while an agent runs, the
//! scheduler simply does not hold it.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};

use weft_core::agent::{Agent, Outcome};
use weft_core::error::AgentError;
use weft_core::id::AgentId;

use crate::channel::ChannelPorts;
use crate::network::{Failure, FailurePolicy};

/// Scheduler wake-ups.
pub(crate) enum Event {
    /// A message landed on one of the agent's consuming or peek endpoints.
    Delivered(AgentId),
    /// A spawned run finished; the body returns to its slot.
    Finished {
        agent: AgentId,
        body: Box<AgentBody>,
        result: Result<Outcome, AgentError>,
    },
    /// Network-wide cancellation: synthetic End for every agent at its
    /// next scheduling opportunity.
    Cancel,
}

/// An agent instance plus its wired ports, moved into run tasks whole.
pub(crate) struct AgentBody {
    pub(crate) agent: Box<dyn Agent>,
    pub(crate) ports: ChannelPorts,
}

impl std::fmt::Debug for AgentBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentBody").finish_non_exhaustive()
    }
}

enum SlotState {
    /// Checked in and eligible for dispatch.
    Idle(Box<AgentBody>),
    /// Moved into a run task; comes back via `Event::Finished`.
    Running,
    /// Deactivated by Failure under `FailurePolicy::Stall`. The body is
    /// kept alive so downstream channels stay open and consumers wait
    /// instead of observing a close.
    Stalled { _body: Box<AgentBody> },
    /// Returned End (or was cancelled). Ports are closed.
    Ended,
    /// Deactivated by Failure; ports are closed.
    Failed,
}

struct Slot {
    state: SlotState,
    /// Pending wake-up for agents that do not gate on mandatory input
    /// (sources and peek-only agents).
    kick: bool,
}

impl Slot {
    fn terminated(&self) -> bool {
        matches!(
            self.state,
            SlotState::Ended | SlotState::Failed | SlotState::Stalled { .. }
        )
    }
}

pub(crate) struct Scheduler {
    slots: HashMap<AgentId, Slot>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    /// Closes when the embedding handle can no longer inject.
    guard_rx: mpsc::UnboundedReceiver<()>,
    policy: FailurePolicy,
    failures: Vec<Failure>,
    running: usize,
    cancelled: bool,
    boundary_open: bool,
}

impl Scheduler {
    pub(crate) fn new(
        slots: Vec<(AgentId, AgentBody)>,
        events_tx: mpsc::UnboundedSender<Event>,
        events_rx: mpsc::UnboundedReceiver<Event>,
        guard_rx: mpsc::UnboundedReceiver<()>,
        policy: FailurePolicy,
    ) -> Self {
        let slots = slots
            .into_iter()
            .map(|(id, body)| {
                // Inputless sources get one kickoff run at start; everyone
                // else waits for deliveries.
                let kick = !body.ports.has_any_inputs();
                let slot = Slot {
                    state: SlotState::Idle(Box::new(body)),
                    kick,
                };
                (id, slot)
            })
            .collect();
        Self {
            slots,
            events_tx,
            events_rx,
            guard_rx,
            policy,
            failures: Vec::new(),
            running: 0,
            cancelled: false,
            boundary_open: true,
        }
    }

    pub(crate) async fn run(mut self, done: oneshot::Sender<Vec<Failure>>) {
        tracing::info!(agents = self.slots.len(), "network started");
        loop {
            self.dispatch_ready();
            if self.terminal() {
                break;
            }
            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                closed = self.guard_rx.recv(), if self.boundary_open => {
                    if closed.is_none() {
                        self.boundary_open = false;
                        tracing::debug!("boundary injector closed");
                    }
                }
            }
            // Drain whatever else already arrived before re-evaluating.
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle(event);
            }
        }
        tracing::info!(failures = self.failures.len(), "network terminal");
        let _ = done.send(std::mem::take(&mut self.failures));
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Delivered(id) => {
                if let Some(slot) = self.slots.get_mut(&id) {
                    slot.kick = true;
                }
            }
            Event::Finished {
                agent,
                body,
                result,
            } => self.finish(agent, *body, result),
            Event::Cancel => {
                tracing::info!("cancellation requested");
                self.cancel_all();
            }
        }
    }

    fn finish(&mut self, agent: AgentId, body: AgentBody, result: Result<Outcome, AgentError>) {
        self.running = self.running.saturating_sub(1);
        let mut halt = false;
        {
            let Some(slot) = self.slots.get_mut(&agent) else {
                return;
            };
            if self.cancelled {
                // Synthetic End: the in-flight run completes, then the
                // agent deactivates regardless of what it returned.
                // Teardown closes channels under running agents, so late
                // errors here are expected and not surfaced.
                if let Err(error) = result {
                    tracing::debug!(agent = %agent, error = %error, "run result discarded during cancellation");
                }
                slot.state = SlotState::Ended;
                return;
            }
            match result {
                Ok(Outcome::Continue) => {
                    slot.state = SlotState::Idle(Box::new(body));
                }
                Ok(Outcome::End) => {
                    tracing::debug!(agent = %agent, "agent ended");
                    slot.state = SlotState::Ended;
                }
                Ok(_) => {
                    // `Outcome` is `#[non_exhaustive]`; only `Continue` and
                    // `End` exist today and are handled above. This arm exists
                    // solely to satisfy exhaustiveness for future variants.
                    unreachable!("unknown Outcome variant");
                }
                Err(error) => {
                    tracing::warn!(agent = %agent, error = %error, "agent failed");
                    self.failures.push(Failure {
                        agent: agent.clone(),
                        error,
                    });
                    slot.state = match self.policy {
                        FailurePolicy::Isolate => SlotState::Failed,
                        FailurePolicy::Stall => SlotState::Stalled {
                            _body: Box::new(body),
                        },
                        FailurePolicy::Halt => {
                            halt = true;
                            SlotState::Failed
                        }
                    };
                }
            }
        }
        if halt {
            self.cancel_all();
        }
    }

    fn cancel_all(&mut self) {
        self.cancelled = true;
        for slot in self.slots.values_mut() {
            slot.state = match std::mem::replace(&mut slot.state, SlotState::Ended) {
                SlotState::Running => SlotState::Running,
                SlotState::Failed => SlotState::Failed,
                // Idle and Stalled bodies drop here, closing their ports.
                _ => SlotState::Ended,
            };
        }
    }

    fn dispatch_ready(&mut self) {
        let ready: Vec<AgentId> = self
            .slots
            .iter()
            .filter_map(|(id, slot)| {
                let SlotState::Idle(body) = &slot.state else {
                    return None;
                };
                let runnable = if body.ports.has_mandatory() {
                    body.ports.ready()
                } else {
                    slot.kick
                };
                runnable.then(|| id.clone())
            })
            .collect();
        for id in ready {
            self.spawn_run(id);
        }
    }

    fn spawn_run(&mut self, id: AgentId) {
        let Some(slot) = self.slots.get_mut(&id) else {
            return;
        };
        match std::mem::replace(&mut slot.state, SlotState::Running) {
            SlotState::Idle(mut body) => {
                slot.kick = false;
                self.running += 1;
                tracing::trace!(agent = %id, "dispatching run");
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let AgentBody { agent, ports } = body.as_mut();
                    let result = agent.run(ports).await;
                    let _ = events.send(Event::Finished {
                        agent: id,
                        body,
                        result,
                    });
                });
            }
            other => slot.state = other,
        }
    }

    fn terminal(&self) -> bool {
        if self.running > 0 {
            return false;
        }
        if self.slots.values().all(Slot::terminated) {
            return true;
        }
        // Quiescent: nothing runnable (dispatch_ready just ran), nothing
        // in flight, and no further external input can arrive. Starved
        // agents and stalled cycles are deadlock-by-design, not errors.
        !self.boundary_open
    }
}
