//! Configuration Module
//!
//! Handles loading and validating cache and sample-server configuration from
//! environment variables.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};
use crate::store::current_timestamp_ms;

/// Sentinel for `cache_duration_minutes` meaning "never expire".
pub const NEVER_EXPIRE: i64 = -1;

/// Checks that `ttl` is positive and that its deadline in Unix milliseconds
/// fits in an `i64`, the range Redis accepts for `PX`/`PEXPIRE`.
pub fn check_expiration(ttl: Duration) -> Result<Duration> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidArgument(
            "Cache duration must be greater than zero".to_string(),
        ));
    }
    let deadline = u64::try_from(ttl.as_millis())
        .ok()
        .and_then(|millis| millis.checked_add(current_timestamp_ms()));
    match deadline {
        Some(deadline) if deadline <= i64::MAX as u64 => Ok(ttl),
        _ => Err(CacheError::InvalidArgument(format!(
            "Cache duration of {}s is out of range",
            ttl.as_secs()
        ))),
    }
}

/// Cache connection and TTL configuration.
///
/// A per-type contract name is supplied separately when a service is built, so
/// one configuration can back many entity types.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Default TTL in minutes for writes without an explicit duration, `-1` = never expire
    pub cache_duration_minutes: i64,
    /// First segment of every key
    pub system_name: String,
    /// Comma-separated `host:port` or `redis://` endpoints; more than one selects cluster mode
    pub connection_endpoint: String,
    /// Logical database index (standalone mode only)
    #[serde(default)]
    pub database: u8,
}

/// Resolved service-level expiration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDuration {
    /// Keys written without an explicit duration carry no TTL
    Never,
    /// Keys written without an explicit duration expire after this long
    Expire(Duration),
}

impl CacheDuration {
    /// Returns the configured TTL, or None for `Never`.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            CacheDuration::Never => None,
            CacheDuration::Expire(ttl) => Some(*ttl),
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with the given values.
    pub fn new(
        cache_duration_minutes: i64,
        system_name: impl Into<String>,
        connection_endpoint: impl Into<String>,
        database: u8,
    ) -> Self {
        Self {
            cache_duration_minutes,
            system_name: system_name.into(),
            connection_endpoint: connection_endpoint.into(),
            database,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DURATION_MINUTES` - Default TTL in minutes, -1 = never (default: -1)
    /// - `CACHE_SYSTEM_NAME` - Key namespace root (default: "App")
    /// - `REDIS_ENDPOINT` - Connection endpoint(s) (default: "localhost:6379")
    /// - `REDIS_DATABASE` - Database index (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_duration_minutes: env::var("CACHE_DURATION_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_duration_minutes),
            system_name: env::var("CACHE_SYSTEM_NAME").unwrap_or(defaults.system_name),
            connection_endpoint: env::var("REDIS_ENDPOINT")
                .unwrap_or(defaults.connection_endpoint),
            database: env::var("REDIS_DATABASE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.database),
        }
    }

    /// Checks the values a service cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.system_name.trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "System name cannot be empty".to_string(),
            ));
        }
        if self.connection_endpoint.trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "Connection endpoint cannot be empty".to_string(),
            ));
        }
        self.cache_duration().map(|_| ())
    }

    /// Resolves `cache_duration_minutes` into an expiration policy.
    ///
    /// Only `-1` and positive values are accepted.
    pub fn cache_duration(&self) -> Result<CacheDuration> {
        match self.cache_duration_minutes {
            NEVER_EXPIRE => Ok(CacheDuration::Never),
            minutes if minutes > 0 => {
                let seconds = (minutes as u64).checked_mul(60).ok_or_else(|| {
                    CacheError::InvalidArgument(format!(
                        "Cache duration of {} minutes is out of range",
                        minutes
                    ))
                })?;
                Ok(CacheDuration::Expire(check_expiration(Duration::from_secs(
                    seconds,
                ))?))
            }
            other => Err(CacheError::InvalidArgument(format!(
                "Cache duration must be positive or {} (never expire), got {}",
                NEVER_EXPIRE, other
            ))),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_duration_minutes: NEVER_EXPIRE,
            system_name: "App".to_string(),
            connection_endpoint: "localhost:6379".to_string(),
            database: 0,
        }
    }
}

/// Sample HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// Serve from the in-process store instead of Redis
    pub use_memory_store: bool,
}

impl ServerConfig {
    /// Loads the server configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `memory` selects the in-process store (default: redis)
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            use_memory_store: env::var("CACHE_BACKEND")
                .map(|v| v.eq_ignore_ascii_case("memory"))
                .unwrap_or(false),
        }
    }
}
