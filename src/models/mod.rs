//! Models for the sample person API
//!
//! The cached `Person` entity, its authoritative directory, and the DTOs
//! used for HTTP request and response bodies.

pub mod person;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use person::{Person, PersonDirectory, PERSON_KIND};
pub use requests::PageQuery;
pub use responses::{EvictResponse, HealthResponse, PersonPageResponse, PersonResponse, Source};
