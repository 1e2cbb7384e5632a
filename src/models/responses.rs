//! Response DTOs for the sample API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use super::person::Person;

/// Where a person record was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Directory,
}

/// Response body for `GET /person/:id`
#[derive(Debug, Clone, Serialize)]
pub struct PersonResponse {
    pub id: i32,
    pub name: Option<String>,
    pub family: Option<String>,
    pub full_name: String,
    pub source: Source,
}

impl PersonResponse {
    pub fn new(person: Person, source: Source) -> Self {
        Self {
            full_name: person.full_name(),
            id: person.id,
            name: person.name,
            family: person.family,
            source,
        }
    }
}

/// Response body for `GET /persons`
#[derive(Debug, Clone, Serialize)]
pub struct PersonPageResponse {
    pub page: usize,
    pub page_size: usize,
    /// Number of cached persons across all pages
    pub total: usize,
    pub persons: Vec<Person>,
}

/// Response body for `DELETE /person/:id`
#[derive(Debug, Clone, Serialize)]
pub struct EvictResponse {
    pub message: String,
    pub key: String,
    /// False when the person was not cached
    pub evicted: bool,
}

impl EvictResponse {
    pub fn new(key: impl Into<String>, evicted: bool) -> Self {
        let key = key.into();
        let message = if evicted {
            format!("Key '{}' evicted from cache", key)
        } else {
            format!("Key '{}' was not cached", key)
        };
        Self {
            message,
            key,
            evicted,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy" or "degraded")
    pub status: String,
    /// Cache backend in use
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn new(healthy: bool, backend: impl Into<String>) -> Self {
        Self {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
