//! Minimal agent implementations for testing.
//!
//! Available behind the `test-utils` feature flag. These prove the trait
//! APIs are usable and give network tests a vocabulary of small, known
//! behaviors to wire together.

mod and_gate;
mod clone_fan;
mod emit_once;
mod limiter;
mod relay;
pub mod schemas;
mod tally;

pub use and_gate::AndGate;
pub use clone_fan::CloneFan;
pub use emit_once::EmitOnce;
pub use limiter::Limiter;
pub use relay::Relay;
pub use tally::Tally;
