//! Tally — counts arrivals across runs, exercising persistent state.

use crate::agent::{Agent, Outcome, Ports};
use crate::error::AgentError;
use crate::message::Message;
use crate::port::Signature;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;

use super::schemas;

/// Consumes one message per run and emits the running total on `total`.
/// The counter lives in the agent struct itself — constructed once with
/// the network, mutated only inside `run`.
pub struct Tally {
    schema: SchemaDescriptor,
    count: u64,
}

impl Tally {
    /// A tally over messages of the given schema.
    pub fn new(schema: SchemaDescriptor) -> Self {
        Self { schema, count: 0 }
    }
}

#[async_trait]
impl Agent for Tally {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("in", self.schema.clone())
            .output("total", schemas::integer())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        ports.receive("in")?;
        self.count += 1;
        let total = Message::encode(&schemas::integer(), &self.count)?;
        ports.send("total", total).await?;
        Ok(Outcome::Continue)
    }
}
