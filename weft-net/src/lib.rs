//! # weft-net — in-process execution engine for weft agent networks
//!
//! Takes the protocol pieces from `weft-core` and makes them run: bounded
//! connection channels with backpressure, graph wiring validated entirely
//! at construction time, a readiness scheduler that drives concurrent
//! agent runs, and the [`NetworkHandle`] surface an embedding collaborator
//! uses to inject boundary messages and await the terminal condition.
//!
//! ## Execution model, in one paragraph
//!
//! Every connection is an in-process bounded FIFO (or a latest-wins cell
//! for peek disciplines). An agent becomes runnable when all of its
//! mandatory endpoints are simultaneously non-empty; the scheduler then
//! moves the agent body onto a spawned task, so unrelated agents run
//! concurrently while each instance sees at most one run in flight. The
//! only blocking point anywhere is a `send` against a full buffer — that
//! is backpressure, propagated to the slowest consumer, and never an
//! error.

#![deny(missing_docs)]

mod channel;
pub mod error;
pub mod graph;
pub mod network;
mod scheduler;

pub use error::{BuildError, NetworkError};
pub use graph::{Endpoint, GraphSpec};
pub use network::{
    Failure, FailurePolicy, Network, NetworkConfig, NetworkHandle, OutputTap, RunOutcome,
};
