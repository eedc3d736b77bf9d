//! CloneFan — broadcasts each input message to every wired fan-out element.

use crate::agent::{Agent, Outcome, Ports};
use crate::error::AgentError;
use crate::port::Signature;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;

/// Receives on `in` and broadcasts a logical copy to every wired element
/// of the `clone` output array.
pub struct CloneFan {
    schema: SchemaDescriptor,
}

impl CloneFan {
    /// A fan-out for the given payload schema.
    pub fn new(schema: SchemaDescriptor) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Agent for CloneFan {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("in", self.schema.clone())
            .output_array("clone", self.schema.clone())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        let message = ports.receive("in")?;
        ports.send_broadcast("clone", message).await?;
        Ok(Outcome::Continue)
    }
}
