//! Store Module
//!
//! The command surface the cache layer needs from a key/value-and-hash store,
//! with a Redis implementation and an in-process implementation.
//!
//! # Implementations
//! - [`RedisConnection`] - shared lazy connection to a Redis server or cluster
//! - [`MemoryStore`] - in-process store with the same command semantics

mod entry;
mod memory;
mod redis;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;

pub use self::redis::{redact_url, RedisConnection};
pub use entry::{current_timestamp_ms, StoredEntry, StoredValue};
pub use memory::{glob_match, MemoryStore};

// == Key Kind ==
/// Store-level type of a key, as reported by `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    None,
    String,
    Hash,
    List,
    Set,
    SortedSet,
    Stream,
}

impl KeyKind {
    /// Parses the reply of the `TYPE` command.
    pub fn from_type_reply(reply: &str) -> Self {
        match reply {
            "string" => KeyKind::String,
            "hash" => KeyKind::Hash,
            "list" => KeyKind::List,
            "set" => KeyKind::Set,
            "zset" => KeyKind::SortedSet,
            "stream" => KeyKind::Stream,
            _ => KeyKind::None,
        }
    }
}

// == Batch Commands ==
/// A write submitted as part of a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCommand {
    /// `DEL key`
    Delete { key: String },
    /// `HSET key field value [field value ...]`
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// `PEXPIRE key ttl`
    Expire { key: String, ttl: Duration },
}

impl BatchCommand {
    /// Key the command writes to.
    pub fn key(&self) -> &str {
        match self {
            BatchCommand::Delete { key }
            | BatchCommand::HashSet { key, .. }
            | BatchCommand::Expire { key, .. } => key,
        }
    }
}

// == Geo Types ==
/// A member to index in a geo set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoEntry {
    pub longitude: f64,
    pub latitude: f64,
    pub member: String,
}

impl GeoEntry {
    pub fn new(longitude: f64, latitude: f64, member: impl Into<String>) -> Self {
        Self {
            longitude,
            latitude,
            member: member.into(),
        }
    }
}

/// Center of a radius query.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoCenter {
    /// Position of an existing member of the geo set
    Member(String),
    /// Explicit coordinate
    Coordinate { longitude: f64, latitude: f64 },
}

/// One member returned by a radius query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRadiusResult {
    pub member: String,
    /// Distance from the query center in kilometers
    pub distance_km: f64,
}

// == Cache Store Trait ==
/// Commands against a key/value-and-hash store.
///
/// Implementations must be safe for concurrent use through a shared reference;
/// callers never lock around them. Keys are passed fully qualified.
pub trait CacheStore: Send + Sync {
    /// `TYPE key`
    fn key_type(&self, key: &str) -> impl Future<Output = Result<KeyKind>> + Send;

    /// `GET key`
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// `SET key value [PX ttl]`; a write without TTL clears any previous one
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// `HGETALL key`
    fn hash_get_all(&self, key: &str)
        -> impl Future<Output = Result<Vec<(String, String)>>> + Send;

    /// `HGET key field`
    fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// `HEXISTS key field`
    fn hash_exists(&self, key: &str, field: &str) -> impl Future<Output = Result<bool>> + Send;

    /// `EXISTS key`
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// `PEXPIRE key ttl`; false when the key does not exist
    fn expire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<bool>> + Send;

    /// `PTTL key`; None when the key is missing or has no TTL
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<Duration>>> + Send;

    /// `DEL key`; false when nothing was removed
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Sends every command in order as one pipeline and waits for all replies.
    ///
    /// Not atomic: each command applies on its own and commands before a failing
    /// one stay applied. The first failure is reported after all replies arrive.
    fn execute_batch(&self, commands: Vec<BatchCommand>)
        -> impl Future<Output = Result<()>> + Send;

    /// Number of primary nodes available for scans.
    fn primary_count(&self) -> impl Future<Output = Result<usize>> + Send;

    /// All keys matching a glob pattern on one primary node (`SCAN MATCH`).
    fn scan_node(
        &self,
        node: usize,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// `GEOADD key lon lat member ...`; returns the number of new members
    fn geo_add(
        &self,
        key: &str,
        entries: &[GeoEntry],
    ) -> impl Future<Output = Result<u64>> + Send;

    /// `GEORADIUS`/`GEORADIUSBYMEMBER ... km WITHDIST ASC`
    fn geo_radius(
        &self,
        key: &str,
        center: &GeoCenter,
        radius_km: f64,
    ) -> impl Future<Output = Result<Vec<GeoRadiusResult>>> + Send;

    /// Releases the underlying connection; later commands fail.
    fn dispose(&self) -> impl Future<Output = ()> + Send;
}
