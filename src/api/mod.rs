//! API Module
//!
//! HTTP handlers and routing for the sample person service.
//!
//! # Endpoints
//! - `GET /person/:id` - Read-through person lookup
//! - `DELETE /person/:id` - Evict a cached person
//! - `GET /persons` - Page of cached persons
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
