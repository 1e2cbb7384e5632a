//! In-Process Store Module
//!
//! A `CacheStore` kept in memory, sharded across simulated primary nodes.
//! Mirrors the Redis semantics the cache layer relies on: lazy TTL expiry,
//! WRONGTYPE failures, glob `SCAN` per node and non-atomic batches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use super::{
    BatchCommand, CacheStore, GeoCenter, GeoEntry, GeoRadiusResult, KeyKind, StoredEntry,
    StoredValue,
};
use crate::error::{CacheError, Result};

/// Earth radius in meters used by Redis geo commands.
const EARTH_RADIUS_M: f64 = 6_372_797.560_856;

const LATITUDE_LIMIT: f64 = 85.051_128_78;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

type Shard = RwLock<HashMap<String, StoredEntry>>;

// == Memory Store ==
/// In-process store, cheap to clone; clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    /// One key map per simulated primary node
    nodes: Vec<Shard>,
    disposed: AtomicBool,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("nodes", &self.inner.nodes.len())
            .field("disposed", &self.inner.disposed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store with a single primary node.
    pub fn new() -> Self {
        Self::with_nodes(1)
    }

    /// Creates a store whose keys are spread over `nodes` primaries.
    pub fn with_nodes(nodes: usize) -> Self {
        let nodes = nodes.max(1);
        Self {
            inner: Arc::new(Inner {
                nodes: (0..nodes).map(|_| RwLock::new(HashMap::new())).collect(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of live keys across all nodes.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for node in &self.inner.nodes {
            total += node
                .read()
                .await
                .values()
                .filter(|entry| !entry.is_expired())
                .count();
        }
        total
    }

    /// Returns true if no live key is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_open(&self) -> Result<()> {
        if self.inner.disposed.load(Ordering::Acquire) {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    fn shard(&self, key: &str) -> &Shard {
        let index = (fnv1a(key.as_bytes()) % self.inner.nodes.len() as u64) as usize;
        &self.inner.nodes[index]
    }

    fn apply(map: &mut HashMap<String, StoredEntry>, command: BatchCommand) -> Result<()> {
        match command {
            BatchCommand::Delete { key } => {
                map.remove(&key);
                Ok(())
            }
            BatchCommand::HashSet { key, fields } => hash_set(map, &key, fields),
            BatchCommand::Expire { key, ttl } => {
                if let Some(entry) = live_mut(map, &key) {
                    entry.expire_in(ttl);
                }
                Ok(())
            }
        }
    }
}

/// Returns the entry for `key`, dropping it first if it has expired.
fn live_mut<'a>(
    map: &'a mut HashMap<String, StoredEntry>,
    key: &str,
) -> Option<&'a mut StoredEntry> {
    if map.get(key).is_some_and(StoredEntry::is_expired) {
        map.remove(key);
    }
    map.get_mut(key)
}

/// Returns the live entry for `key`, creating an empty one without TTL if absent.
fn live_or_insert<'a>(
    map: &'a mut HashMap<String, StoredEntry>,
    key: &str,
    empty: impl FnOnce() -> StoredValue,
) -> &'a mut StoredEntry {
    if map.get(key).is_some_and(StoredEntry::is_expired) {
        map.remove(key);
    }
    map.entry(key.to_string())
        .or_insert_with(|| StoredEntry::new(empty(), None))
}

fn live<'a>(map: &'a HashMap<String, StoredEntry>, key: &str) -> Option<&'a StoredEntry> {
    map.get(key).filter(|entry| !entry.is_expired())
}

fn hash_set(
    map: &mut HashMap<String, StoredEntry>,
    key: &str,
    fields: Vec<(String, String)>,
) -> Result<()> {
    let entry = live_or_insert(map, key, || StoredValue::Hash(Vec::new()));
    let StoredValue::Hash(existing) = &mut entry.value else {
        return Err(CacheError::Backend(WRONGTYPE.to_string()));
    };
    for (field, value) in fields {
        match existing.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => existing.push((field, value)),
        }
    }
    Ok(())
}

fn hash_fields<'a>(
    map: &'a HashMap<String, StoredEntry>,
    key: &str,
) -> Result<Option<&'a Vec<(String, String)>>> {
    match live(map, key).map(|entry| &entry.value) {
        None => Ok(None),
        Some(StoredValue::Hash(fields)) => Ok(Some(fields)),
        Some(_) => Err(CacheError::Backend(WRONGTYPE.to_string())),
    }
}

impl CacheStore for MemoryStore {
    async fn key_type(&self, key: &str) -> Result<KeyKind> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        Ok(live(&map, key)
            .map(|entry| entry.value.kind())
            .unwrap_or(KeyKind::None))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        match live(&map, key).map(|entry| &entry.value) {
            None => Ok(None),
            Some(StoredValue::String(bytes)) => Ok(Some(bytes.clone())),
            Some(_) => Err(CacheError::Backend(WRONGTYPE.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.check_open()?;
        let mut map = self.shard(key).write().await;
        map.insert(
            key.to_string(),
            StoredEntry::new(StoredValue::String(value), ttl),
        );
        debug!(key = key, "Memory SET");
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        Ok(hash_fields(&map, key)?.cloned().unwrap_or_default())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        Ok(hash_fields(&map, key)?.and_then(|fields| {
            fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value.clone())
        }))
    }

    async fn hash_exists(&self, key: &str, field: &str) -> Result<bool> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        Ok(hash_fields(&map, key)?
            .is_some_and(|fields| fields.iter().any(|(name, _)| name == field)))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        Ok(live(&map, key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check_open()?;
        let mut map = self.shard(key).write().await;
        match live_mut(&mut map, key) {
            Some(entry) => {
                entry.expire_in(ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        Ok(live(&map, key).and_then(StoredEntry::ttl_remaining))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_open()?;
        let mut map = self.shard(key).write().await;
        let removed = map.remove(key).is_some_and(|entry| !entry.is_expired());
        debug!(key = key, removed = removed, "Memory DEL");
        Ok(removed)
    }

    async fn execute_batch(&self, commands: Vec<BatchCommand>) -> Result<()> {
        self.check_open()?;
        let count = commands.len();
        let mut first_error = None;

        for command in commands {
            let mut map = self.shard(command.key()).write().await;
            if let Err(err) = Self::apply(&mut map, command) {
                first_error.get_or_insert(err);
            }
        }

        debug!(commands = count, failed = first_error.is_some(), "Memory batch");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn primary_count(&self) -> Result<usize> {
        self.check_open()?;
        Ok(self.inner.nodes.len())
    }

    async fn scan_node(&self, node: usize, pattern: &str) -> Result<Vec<String>> {
        self.check_open()?;
        let Some(shard) = self.inner.nodes.get(node) else {
            return Err(CacheError::InvalidArgument(format!(
                "Node {} does not exist",
                node
            )));
        };
        let map = shard.read().await;
        Ok(map
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn geo_add(&self, key: &str, entries: &[GeoEntry]) -> Result<u64> {
        self.check_open()?;
        for entry in entries {
            if !(-180.0..=180.0).contains(&entry.longitude)
                || !(-LATITUDE_LIMIT..=LATITUDE_LIMIT).contains(&entry.latitude)
            {
                return Err(CacheError::Backend(format!(
                    "ERR invalid longitude,latitude pair {},{}",
                    entry.longitude, entry.latitude
                )));
            }
        }

        let mut map = self.shard(key).write().await;
        let entry = live_or_insert(&mut map, key, || StoredValue::Geo(Vec::new()));
        let StoredValue::Geo(members) = &mut entry.value else {
            return Err(CacheError::Backend(WRONGTYPE.to_string()));
        };

        let mut added = 0;
        for geo in entries {
            match members.iter_mut().find(|(member, _, _)| *member == geo.member) {
                Some(slot) => {
                    slot.1 = geo.longitude;
                    slot.2 = geo.latitude;
                }
                None => {
                    members.push((geo.member.clone(), geo.longitude, geo.latitude));
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    async fn geo_radius(
        &self,
        key: &str,
        center: &GeoCenter,
        radius_km: f64,
    ) -> Result<Vec<GeoRadiusResult>> {
        self.check_open()?;
        let map = self.shard(key).read().await;
        let members = match live(&map, key).map(|entry| &entry.value) {
            None => return Ok(Vec::new()),
            Some(StoredValue::Geo(members)) => members,
            Some(_) => return Err(CacheError::Backend(WRONGTYPE.to_string())),
        };

        let (center_lon, center_lat) = match center {
            GeoCenter::Coordinate {
                longitude,
                latitude,
            } => (*longitude, *latitude),
            GeoCenter::Member(name) => members
                .iter()
                .find(|(member, _, _)| member == name)
                .map(|(_, lon, lat)| (*lon, *lat))
                .ok_or_else(|| {
                    CacheError::Backend("ERR could not decode requested zset member".to_string())
                })?,
        };

        let mut results: Vec<GeoRadiusResult> = members
            .iter()
            .map(|(member, lon, lat)| GeoRadiusResult {
                member: member.clone(),
                distance_km: haversine_km(center_lon, center_lat, *lon, *lat),
            })
            .filter(|result| result.distance_km <= radius_km)
            .collect();
        results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(results)
    }

    async fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            for node in &self.inner.nodes {
                node.write().await.clear();
            }
            debug!("Memory store disposed");
        }
    }
}

// == Helpers ==
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Great-circle distance in kilometers between two (longitude, latitude) points.
fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin() / 1000.0
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, &text)
}

fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    let Some((&first, rest)) = pattern.split_first() else {
        return text.is_empty();
    };
    match first {
        '*' => (0..=text.len()).any(|skip| glob_match_at(rest, &text[skip..])),
        '?' => !text.is_empty() && glob_match_at(rest, &text[1..]),
        '[' => {
            let Some((&c, text_rest)) = text.split_first() else {
                return false;
            };
            match class_match(rest, c) {
                Some((matched, after)) => matched && glob_match_at(after, text_rest),
                None => c == '[' && glob_match_at(rest, text_rest),
            }
        }
        '\\' if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && glob_match_at(&rest[1..], &text[1..])
        }
        literal => text.first() == Some(&literal) && glob_match_at(rest, &text[1..]),
    }
}

/// Matches `c` against a class body starting after `[`. Returns the match result
/// and the pattern after the closing `]`, or None when the class is unterminated.
fn class_match(body: &[char], c: char) -> Option<(bool, &[char])> {
    let (negate, mut i) = match body.first() {
        Some('^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;
    while i < body.len() {
        match body[i] {
            ']' => return Some((matched != negate, &body[i + 1..])),
            '\\' if i + 1 < body.len() => {
                matched |= body[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < body.len() && body[i + 1] == '-' && body[i + 2] != ']' => {
                let hi = body[i + 2];
                matched |= (lo.min(hi)..=lo.max(hi)).contains(&c);
                i += 3;
            }
            single => {
                matched |= single == c;
                i += 1;
            }
        }
    }
    None
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_glob_star_and_question() {
        assert!(glob_match("Person:RedisPerson:*", "Person:RedisPerson:1"));
        assert!(glob_match("Person:RedisPerson:*", "Person:RedisPerson:"));
        assert!(!glob_match("Person:RedisPerson:*", "Person:Other:1"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
    }

    #[test]
    fn test_glob_classes_and_escapes() {
        assert!(glob_match("key[0-9]", "key7"));
        assert!(!glob_match("key[0-9]", "keyx"));
        assert!(glob_match("key[^0-9]", "keyx"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
    }

    #[test]
    fn test_haversine_known_distance() {
        // Palermo -> Catania, the Redis documentation example (~166.27 km)
        let km = haversine_km(13.361389, 38.115556, 15.087269, 37.502669);
        assert!((km - 166.27).abs() < 0.1, "got {km}");
    }

    #[tokio::test]
    async fn test_set_get_roundtrip_and_type() {
        let store = MemoryStore::new();
        store.set("k", b"payload".to_vec(), None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), Some(b"payload".to_vec()));
        assert_eq!(store.key_type("k").await.unwrap(), KeyKind::String);
        assert_eq!(store.key_type("missing").await.unwrap(), KeyKind::None);
    }

    #[tokio::test]
    async fn test_set_without_ttl_clears_previous_ttl() {
        let store = MemoryStore::new();
        store
            .set("k", b"a".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(store.ttl("k").await.unwrap().is_some());

        store.set("k", b"b".to_vec(), None).await.unwrap();
        assert!(store.ttl("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrongtype_on_hash_read_of_string() {
        let store = MemoryStore::new();
        store.set("k", b"a".to_vec(), None).await.unwrap();

        let result = store.hash_get_all("k").await;
        assert!(matches!(result, Err(CacheError::Backend(msg)) if msg.starts_with("WRONGTYPE")));
    }

    #[tokio::test]
    async fn test_expired_key_is_gone() {
        let store = MemoryStore::new();
        store
            .set("k", b"a".to_vec(), Some(Duration::from_millis(30)))
            .await
            .unwrap();

        sleep(Duration::from_millis(60));

        assert!(!store.exists("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.expire("k", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_continues_after_failure() {
        let store = MemoryStore::new();
        store.set("str", b"a".to_vec(), None).await.unwrap();

        let result = store
            .execute_batch(vec![
                BatchCommand::HashSet {
                    key: "h1".to_string(),
                    fields: vec![("f".to_string(), "1".to_string())],
                },
                BatchCommand::HashSet {
                    key: "str".to_string(),
                    fields: vec![("f".to_string(), "2".to_string())],
                },
                BatchCommand::HashSet {
                    key: "h2".to_string(),
                    fields: vec![("f".to_string(), "3".to_string())],
                },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.hash_get("h1", "f").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.hash_get("h2", "f").await.unwrap().as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_keys_spread_across_nodes() {
        let store = MemoryStore::with_nodes(3);
        for i in 0..30 {
            store
                .set(&format!("ns:{i}"), b"v".to_vec(), None)
                .await
                .unwrap();
        }

        let mut total = 0;
        let mut non_empty = 0;
        for node in 0..store.primary_count().await.unwrap() {
            let keys = store.scan_node(node, "ns:*").await.unwrap();
            total += keys.len();
            non_empty += usize::from(!keys.is_empty());
        }
        assert_eq!(total, 30);
        assert!(non_empty > 1);
    }

    #[tokio::test]
    async fn test_dispose_rejects_commands() {
        let store = MemoryStore::new();
        store.set("k", b"a".to_vec(), None).await.unwrap();
        store.dispose().await;

        assert!(matches!(store.get("k").await, Err(CacheError::Disposed)));
        assert!(matches!(store.primary_count().await, Err(CacheError::Disposed)));
    }

    #[test]
    fn test_len_with_blocking_runtime() {
        let store = MemoryStore::new();
        tokio_test::block_on(async {
            store.set("a", b"1".to_vec(), None).await.unwrap();
            store.set("b", b"2".to_vec(), None).await.unwrap();
            assert_eq!(store.len().await, 2);
            assert!(!store.is_empty().await);
        });
    }
}
