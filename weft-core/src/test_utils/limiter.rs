//! Limiter — forwards until a peeked limit is reached.

use crate::agent::{Agent, Outcome, Ports};
use crate::error::AgentError;
use crate::port::Signature;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;

use super::schemas;

/// Forwards `in` to `out` until the count reaches the limit peeked from
/// the `limit` option port, then ends. With no limit ever delivered it
/// forwards indefinitely — the peek port is read every run but never
/// gates readiness.
pub struct Limiter {
    schema: SchemaDescriptor,
    seen: u64,
}

impl Limiter {
    /// A limiter for the given payload schema.
    pub fn new(schema: SchemaDescriptor) -> Self {
        Self { schema, seen: 0 }
    }
}

#[async_trait]
impl Agent for Limiter {
    fn signature(&self) -> Signature {
        Signature::builder()
            .input("in", self.schema.clone())
            .option("limit", schemas::integer())
            .output("out", self.schema.clone())
            .build()
    }

    async fn run(&mut self, ports: &mut dyn Ports) -> Result<Outcome, AgentError> {
        let limit: Option<u64> = match ports.peek("limit")? {
            Some(message) => Some(message.decode()?),
            None => None,
        };

        let message = ports.receive("in")?;
        ports.send("out", message).await?;
        self.seen += 1;

        match limit {
            Some(limit) if self.seen >= limit => Ok(Outcome::End),
            _ => Ok(Outcome::Continue),
        }
    }
}
