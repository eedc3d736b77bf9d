//! Stand-in schema descriptors, as an external schema toolchain would
//! compile them.

use crate::schema::SchemaDescriptor;

/// Boolean payloads.
pub fn boolean() -> SchemaDescriptor {
    SchemaDescriptor::new("bool", 1)
}

/// Signed integer payloads.
pub fn integer() -> SchemaDescriptor {
    SchemaDescriptor::new("int", 1)
}

/// UTF-8 text payloads.
pub fn text() -> SchemaDescriptor {
    SchemaDescriptor::new("text", 1)
}
