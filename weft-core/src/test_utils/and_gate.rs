//! AndGate — boolean conjunction over two mandatory inputs.

use crate::agent::{Agent, Outcome, Ports};
use crate::error::AgentError;
use crate::message::Message;
use crate::port::Signature;
use async_trait::async_trait;

use super::schemas;

/// Receives one boolean on `a` and one on `b`, sends `a && b` on `out`.
///
/// Because both inputs are mandatory, this agent is the canonical probe
/// for conjunctive readiness: with only `a` delivered it must never run.
pub struct AndGate;

#[async_trait]
impl Agent for AndGate {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("a", schemas::boolean())
            .input("b", schemas::boolean())
            .output("out", schemas::boolean())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        let a: bool = ports.receive("a")?.decode()?;
        let b: bool = ports.receive("b")?.decode()?;
        let out = Message::encode(&schemas::boolean(), &(a && b))?;
        ports.send("out", out).await?;
        Ok(Outcome::Continue)
    }
}
