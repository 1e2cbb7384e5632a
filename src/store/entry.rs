//! Stored Entry Module
//!
//! Defines a single key's value and TTL metadata for the in-process store.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::KeyKind;

// == Stored Value ==
/// Value held under one key.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Single opaque value
    String(Vec<u8>),
    /// Field/value pairs in insertion order
    Hash(Vec<(String, String)>),
    /// Geo set members as (member, longitude, latitude)
    Geo(Vec<(String, f64, f64)>),
}

impl StoredValue {
    /// Store-level type reported for this value. Geo sets are sorted sets.
    pub fn kind(&self) -> KeyKind {
        match self {
            StoredValue::String(_) => KeyKind::String,
            StoredValue::Hash(_) => KeyKind::Hash,
            StoredValue::Geo(_) => KeyKind::SortedSet,
        }
    }
}

// == Stored Entry ==
/// A value with an optional expiration time.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored value
    pub value: StoredValue,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry with optional TTL.
    pub fn new(value: StoredValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(deadline_after),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    /// Sets a new TTL counted from now.
    pub fn expire_in(&mut self, ttl: Duration) {
        self.expires_at = Some(deadline_after(ttl));
    }

    // == Time To Live ==
    /// Remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the TTL has elapsed.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            Duration::from_millis(expires.saturating_sub(now))
        })
    }
}

// == Utility Functions ==
/// Unix milliseconds `ttl` from now, saturating at `u64::MAX`.
fn deadline_after(ttl: Duration) -> u64 {
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    current_timestamp_ms().saturating_add(millis)
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
