//! Information packets — the immutable payloads exchanged between ports.

use crate::error::MessageError;
use crate::schema::SchemaDescriptor;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// An immutable, schema-typed payload.
///
/// Payload bytes live behind an `Arc`, so `Clone` is the cheap logical copy
/// used when a message fans out to several consumers — the bytes are shared,
/// never deep-copied, and never mutated after construction.
///
/// Design decision: the payload codec is serde_json. The schema toolchain
/// this core collaborates with only has to provide a stable descriptor and
/// serde-compatible types; JSON bytes are the de facto interchange format
/// and keep the reader/builder pair trivial. The runtime itself treats the
/// bytes as opaque.
#[derive(Debug, Clone)]
pub struct Message {
    schema: SchemaDescriptor,
    payload: Arc<[u8]>,
}

impl Message {
    /// Encode a serializable value into a message of the given schema.
    ///
    /// Shorthand for `Message::builder(schema).payload(value)?.build()`.
    pub fn encode<T: Serialize>(
        schema: &SchemaDescriptor,
        value: &T,
    ) -> Result<Self, MessageError> {
        Self::builder(schema.clone()).payload(value)?.build()
    }

    /// Start building a message for the given schema.
    pub fn builder(schema: SchemaDescriptor) -> MessageBuilder {
        MessageBuilder {
            schema,
            payload: None,
        }
    }

    /// Decode the payload into a concrete type.
    ///
    /// A decode failure means the bytes do not follow the schema they are
    /// tagged with — a contract violation that fails the reading agent,
    /// never the network around it.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        serde_json::from_slice(&self.payload).map_err(|source| MessageError::Decode {
            schema: self.schema.to_string(),
            source,
        })
    }

    /// The schema this payload is tagged with.
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Builder for [`Message`] — the "builder" half of the reader/builder pair
/// the schema collaborator contract requires.
#[derive(Debug)]
pub struct MessageBuilder {
    schema: SchemaDescriptor,
    payload: Option<Vec<u8>>,
}

impl MessageBuilder {
    /// Serialize `value` as the message payload.
    pub fn payload<T: Serialize>(mut self, value: &T) -> Result<Self, MessageError> {
        let bytes = serde_json::to_vec(value).map_err(|source| MessageError::Encode {
            schema: self.schema.to_string(),
            source,
        })?;
        self.payload = Some(bytes);
        Ok(self)
    }

    /// Use pre-encoded bytes as the payload. The caller asserts the bytes
    /// follow the builder's schema; the runtime will not re-check.
    pub fn raw(mut self, bytes: Vec<u8>) -> Self {
        self.payload = Some(bytes);
        self
    }

    /// Finish the message. Fails if no payload was provided.
    pub fn build(self) -> Result<Message, MessageError> {
        let payload = self
            .payload
            .ok_or_else(|| MessageError::EmptyPayload(self.schema.to_string()))?;
        Ok(Message {
            schema: self.schema,
            payload: payload.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boolean() -> SchemaDescriptor {
        SchemaDescriptor::new("bool", 1)
    }

    #[test]
    fn encode_decode_round_trip() {
        let msg = Message::encode(&boolean(), &true).unwrap();
        assert!(msg.decode::<bool>().unwrap());
        assert_eq!(msg.schema(), &boolean());
    }

    #[test]
    fn clone_shares_payload() {
        let msg = Message::encode(&boolean(), &false).unwrap();
        let copy = msg.clone();
        assert!(std::ptr::eq(msg.payload().as_ptr(), copy.payload().as_ptr()));
    }

    #[test]
    fn decode_mismatched_bytes_fails() {
        let msg = Message::builder(boolean()).raw(b"not json".to_vec()).build().unwrap();
        assert!(msg.decode::<bool>().is_err());
    }

    #[test]
    fn build_without_payload_fails() {
        assert!(Message::builder(boolean()).build().is_err());
    }
}
