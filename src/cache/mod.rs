//! Cache Module
//!
//! Maps typed entities onto namespaced store keys, either as tagged hash
//! entries or as whole-object string blobs.

mod codec;
mod field;
mod namespace;
mod scanner;
mod service;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use codec::{EntityCodec, FieldDescriptor, FieldShape, Schema, SchemaBuilder, TYPE_FIELD};
pub use field::{EnumField, FieldValue, TextField};
pub use namespace::KeyNamespace;
pub use scanner::{page_window, ClusterScanner};
pub use service::{CacheService, SHORT_EXPIRATION};
