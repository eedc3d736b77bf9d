//! EmitOnce — an inputless source that sends one message and ends.

use crate::agent::{Agent, Outcome, Ports};
use crate::error::AgentError;
use crate::message::Message;
use crate::port::Signature;
use async_trait::async_trait;

/// Sends its configured message on `out` during the kickoff run, then
/// returns `End`. The simplest possible source.
pub struct EmitOnce {
    message: Option<Message>,
}

impl EmitOnce {
    /// A source that will emit `message` exactly once.
    pub fn new(message: Message) -> Self {
        Self {
            message: Some(message),
        }
    }
}

#[async_trait]
impl Agent for EmitOnce {
    fn signature(&self) -> Signature {
        let schema = self
            .message
            .as_ref()
            .map(|m| m.schema().clone())
            .unwrap_or_else(|| crate::schema::SchemaDescriptor::new("spent", 1));
        Signature::builder().output("out", schema).build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        if let Some(message) = self.message.take() {
            ports.send("out", message).await?;
        }
        Ok(Outcome::End)
    }
}
