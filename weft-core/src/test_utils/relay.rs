//! Relay — forwards one message per run from `in` to `out`.

use crate::agent::{Agent, Outcome, Ports};
use crate::error::AgentError;
use crate::port::Signature;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;

/// Forwards messages unchanged. Used wherever a test needs an agent that
/// is oblivious to payload contents.
pub struct Relay {
    schema: SchemaDescriptor,
}

impl Relay {
    /// A relay for the given payload schema.
    pub fn new(schema: SchemaDescriptor) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Agent for Relay {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("in", self.schema.clone())
            .output("out", self.schema.clone())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        let message = ports.receive("in")?;
        ports.send("out", message).await?;
        Ok(Outcome::Continue)
    }
}
