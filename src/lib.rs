//! Entity Cache - typed entity mapping over Redis
//!
//! Stores typed entities under namespaced keys as tagged hash entries or
//! whole-object blobs, with TTL policy, pipelined batches, cluster-wide scans
//! and geo queries.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use api::AppState;
pub use cache::{CacheService, EntityCodec, Schema};
pub use config::{CacheConfig, CacheDuration, ServerConfig};
pub use error::{CacheError, Result};
pub use store::{CacheStore, MemoryStore, RedisConnection};
