//! Cache Service Module
//!
//! Public facade over one entity contract: string and hash entries, pipelined
//! batch writes, partial reads, cluster-wide enumeration, expiration and geo
//! operations.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::codec::EntityCodec;
use super::namespace::KeyNamespace;
use super::scanner::{page_window, ClusterScanner};
use crate::config::{check_expiration, CacheConfig, CacheDuration};
use crate::error::{CacheError, Result};
use crate::store::{BatchCommand, CacheStore, GeoCenter, GeoEntry, GeoRadiusResult, KeyKind, RedisConnection};

/// Expiration applied by [`CacheService::set_expiration`].
pub const SHORT_EXPIRATION: Duration = Duration::from_secs(5);

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

// == Cache Service ==
/// Typed cache access for one contract (`{system}:{contract}:` namespace).
///
/// Holds no entities between calls: writes snapshot the value, reads rebuild
/// it. A miss is reported as `Ok(None)`; filling the cache from the
/// authoritative source is up to the caller.
pub struct CacheService<T, S = RedisConnection> {
    store: S,
    namespace: KeyNamespace,
    codec: EntityCodec<T>,
    default_ttl: CacheDuration,
}

impl<T, S: Clone> Clone for CacheService<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            codec: self.codec.clone(),
            default_ttl: self.default_ttl,
        }
    }
}

impl<T, S: std::fmt::Debug> std::fmt::Debug for CacheService<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("store", &self.store)
            .field("namespace", &self.namespace)
            .field("kind", &self.codec.kind())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl<T> CacheService<T, RedisConnection> {
    /// Opens a Redis connection from `config` and builds a service on it.
    pub async fn connect(
        config: &CacheConfig,
        contract_name: &str,
        codec: EntityCodec<T>,
    ) -> Result<Self> {
        config.validate()?;
        let connection = RedisConnection::connect(config).await?;
        Self::new(connection, config, contract_name, codec)
    }
}

impl<T, S: CacheStore> CacheService<T, S> {
    // == Constructor ==
    /// Builds a service over an existing store handle.
    pub fn new(
        store: S,
        config: &CacheConfig,
        contract_name: &str,
        codec: EntityCodec<T>,
    ) -> Result<Self> {
        config.validate()?;
        if contract_name.trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "Contract name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            store,
            namespace: KeyNamespace::new(&config.system_name, contract_name),
            codec,
            default_ttl: config.cache_duration()?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &EntityCodec<T> {
        &self.codec
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// Fully qualified key for a caller key.
    pub fn complete_key(&self, key: &str) -> String {
        self.namespace.complete(key)
    }

    /// Explicit duration first, then the configured one.
    fn resolve_ttl(&self, explicit: Option<Duration>) -> Result<Option<Duration>> {
        match explicit {
            Some(ttl) => check_expiration(ttl).map(Some),
            None => Ok(self.default_ttl.as_duration()),
        }
    }

    /// DEL, HSET and (with a TTL) PEXPIRE for one entry.
    fn hash_write(
        &self,
        key: String,
        fields: Vec<(String, String)>,
        ttl: Option<Duration>,
    ) -> Vec<BatchCommand> {
        let mut commands = vec![
            BatchCommand::Delete { key: key.clone() },
            BatchCommand::HashSet {
                key: key.clone(),
                fields,
            },
        ];
        if let Some(ttl) = ttl {
            commands.push(BatchCommand::Expire { key, ttl });
        }
        commands
    }

    // == Hash Entries ==
    /// Writes `value` as hash fields under `key`, replacing any previous entry.
    pub async fn set_hash(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let ttl = self.resolve_ttl(ttl)?;
        let full_key = self.complete_key(key);
        let fields = self.codec.encode(value)?;
        let field_count = fields.len();

        self.store
            .execute_batch(self.hash_write(full_key.clone(), fields, ttl))
            .await?;
        debug!(key = %full_key, fields = field_count, ttl_secs = ttl.map(|t| t.as_secs()), "Hash SET");
        Ok(())
    }

    /// Writes every entry in one pipeline with the configured TTL.
    ///
    /// Not atomic: an error is reported once all commands completed and
    /// entries written before the failing command stay written.
    pub async fn set_hash_range<'a, K, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, &'a T)>,
        K: AsRef<str>,
        T: 'a,
    {
        let ttl = self.default_ttl.as_duration();
        let mut commands = Vec::new();
        for (key, value) in entries {
            let fields = self.codec.encode(value)?;
            commands.extend(self.hash_write(self.complete_key(key.as_ref()), fields, ttl));
        }
        self.execute_range(commands).await
    }

    /// Like [`CacheService::set_hash_range`], deriving each key from its value.
    ///
    /// Every key is derived and checked before any command is sent; an empty
    /// key rejects the whole batch.
    pub async fn set_hash_range_by<F>(&self, values: &[T], key_selector: F) -> Result<()>
    where
        F: Fn(&T) -> String,
    {
        let ttl = self.default_ttl.as_duration();
        let mut commands = Vec::with_capacity(values.len() * 3);
        for (index, value) in values.iter().enumerate() {
            let key = key_selector(value);
            if key.trim().is_empty() {
                return Err(CacheError::InvalidArgument(format!(
                    "Key selector returned an empty key for item {}",
                    index
                )));
            }
            let fields = self.codec.encode(value)?;
            commands.extend(self.hash_write(self.complete_key(&key), fields, ttl));
        }
        self.execute_range(commands).await
    }

    async fn execute_range(&self, commands: Vec<BatchCommand>) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let count = commands.len();
        self.store.execute_batch(commands).await?;
        debug!(namespace = %self.namespace.prefix(), commands = count, "Hash range SET");
        Ok(())
    }

    /// Requested fields that exist, paired with their values, in request order.
    ///
    /// Each field is checked then read; one removed in between is skipped.
    pub async fn get_partial_hash<F: AsRef<str>>(
        &self,
        key: &str,
        fields: &[F],
    ) -> Result<Vec<(String, String)>> {
        let full_key = self.complete_key(key);
        let mut found = Vec::new();
        for field in fields {
            let field = field.as_ref();
            if !self.store.hash_exists(&full_key, field).await? {
                continue;
            }
            if let Some(value) = self.store.hash_get(&full_key, field).await? {
                found.push((field.to_string(), value));
            }
        }
        Ok(found)
    }

    /// `HEXISTS` on a namespaced key.
    pub async fn hash_field_exists(&self, key: &str, field: &str) -> Result<bool> {
        self.store.hash_exists(&self.complete_key(key), field).await
    }

    /// Keys of this contract's hash entries tagged with the codec kind.
    pub async fn get_all_keys_hash(&self, prefix: &str) -> Result<Vec<String>> {
        ClusterScanner::new(&self.store)
            .collect(
                &self.namespace.pattern(prefix),
                KeyKind::Hash,
                Some(self.codec.kind()),
            )
            .await
    }

    pub async fn count_all_hash(&self) -> Result<usize> {
        ClusterScanner::new(&self.store)
            .count(
                &self.namespace.pattern(""),
                KeyKind::Hash,
                Some(self.codec.kind()),
            )
            .await
    }

    /// Keys of tagged hash entries whose remaining TTL is under `days` days.
    ///
    /// Entries without a TTL are never near expiry.
    pub async fn get_near_expire_hash(&self, days: u64) -> Result<Vec<String>> {
        let threshold = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
        let keys = self.get_all_keys_hash("").await?;
        let mut near = Vec::new();
        for key in keys {
            if self
                .store
                .ttl(&key)
                .await?
                .is_some_and(|ttl| ttl < threshold)
            {
                near.push(key);
            }
        }
        Ok(near)
    }

    // == Common ==
    /// `EXISTS` on a namespaced key.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.store.exists(&self.complete_key(key)).await
    }

    /// `EXISTS` on a literal key, bypassing the namespace.
    pub async fn exists_raw(&self, key: &str) -> Result<bool> {
        self.store.exists(key).await
    }

    /// Expires a namespaced key in five seconds; false when it does not exist.
    pub async fn set_expiration(&self, key: &str) -> Result<bool> {
        self.store
            .expire(&self.complete_key(key), SHORT_EXPIRATION)
            .await
    }

    /// Deletes a namespaced key; false when nothing was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.store.delete(&self.complete_key(key)).await
    }

    /// Deletes a literal key, bypassing the namespace.
    pub async fn delete_raw(&self, key: &str) -> Result<bool> {
        self.store.delete(key).await
    }

    /// Releases the shared connection; later calls fail with `Disposed`.
    pub async fn dispose(&self) {
        self.store.dispose().await
    }

    // == Geo ==
    /// Adds members to the geo set under a namespaced key.
    pub async fn set_geo(&self, key: &str, entries: &[GeoEntry]) -> Result<u64> {
        self.store.geo_add(&self.complete_key(key), entries).await
    }

    /// Members within `radius_km` of an existing member, nearest first.
    pub async fn get_radius_by_member(
        &self,
        key: &str,
        member: &str,
        radius_km: f64,
    ) -> Result<Vec<GeoRadiusResult>> {
        check_radius(radius_km)?;
        self.store
            .geo_radius(
                &self.complete_key(key),
                &GeoCenter::Member(member.to_string()),
                radius_km,
            )
            .await
    }

    /// Members within `radius_km` of a coordinate, nearest first.
    pub async fn get_radius_by_coordinate(
        &self,
        key: &str,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<GeoRadiusResult>> {
        check_radius(radius_km)?;
        self.store
            .geo_radius(
                &self.complete_key(key),
                &GeoCenter::Coordinate {
                    longitude,
                    latitude,
                },
                radius_km,
            )
            .await
    }
}

impl<T: Default + Send, S: CacheStore> CacheService<T, S> {
    /// Reads a hash entry; None when missing, not a hash, or tagged with another kind.
    pub async fn get_hash(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.complete_key(key);
        if self.store.key_type(&full_key).await? != KeyKind::Hash {
            debug!(key = %full_key, "Hash MISS");
            return Ok(None);
        }
        self.read_hash(&full_key).await
    }

    async fn read_hash(&self, full_key: &str) -> Result<Option<T>> {
        let fields = self.store.hash_get_all(full_key).await?;
        let entity = self.codec.decode(&fields)?;
        debug!(key = %full_key, hit = entity.is_some(), "Hash GET");
        Ok(entity)
    }

    /// One page of this contract's tagged hash entries.
    ///
    /// Every matching key on every primary is collected before the page window
    /// is applied; order is not stable between calls.
    pub async fn get_all_hash(&self, page: usize, page_size: usize) -> Result<Vec<T>> {
        let keys = self.get_all_keys_hash("").await?;
        let mut entities = Vec::new();
        for key in page_window(keys, page, page_size) {
            if let Some(entity) = self.read_hash(&key).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }
}

impl<T: Serialize + DeserializeOwned + Send, S: CacheStore> CacheService<T, S> {
    // == String Entries ==
    /// Writes the whole entity as one blob under `key`.
    pub async fn set_string(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let ttl = self.resolve_ttl(ttl)?;
        let full_key = self.complete_key(key);
        let blob = self.codec.encode_blob(value)?;
        self.store.set(&full_key, blob, ttl).await
    }

    /// Writes every entry with the configured TTL, one command at a time.
    pub async fn set_string_range<'a, K, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, &'a T)>,
        K: AsRef<str>,
        T: 'a,
    {
        let writes: Vec<(String, Vec<u8>)> = entries
            .into_iter()
            .map(|(key, value)| -> Result<(String, Vec<u8>)> {
                Ok((self.complete_key(key.as_ref()), self.codec.encode_blob(value)?))
            })
            .collect::<Result<_>>()?;
        let ttl = self.default_ttl.as_duration();
        for (full_key, blob) in writes {
            self.store.set(&full_key, blob, ttl).await?;
        }
        Ok(())
    }

    /// Reads a string entry; None when missing or not a string.
    pub async fn get_string(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.complete_key(key);
        if self.store.key_type(&full_key).await? != KeyKind::String {
            debug!(key = %full_key, "String MISS");
            return Ok(None);
        }
        self.read_string(&full_key).await
    }

    async fn read_string(&self, full_key: &str) -> Result<Option<T>> {
        match self.store.get(full_key).await? {
            Some(bytes) => Ok(Some(self.codec.decode_blob(&bytes)?)),
            None => Ok(None),
        }
    }

    /// One page of this contract's string entries.
    pub async fn get_all_string(&self, page: usize, page_size: usize) -> Result<Vec<T>> {
        let keys = self.get_all_keys_string().await?;
        let mut entities = Vec::new();
        for key in page_window(keys, page, page_size) {
            if let Some(entity) = self.read_string(&key).await? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    pub async fn get_all_keys_string(&self) -> Result<Vec<String>> {
        ClusterScanner::new(&self.store)
            .collect(&self.namespace.pattern(""), KeyKind::String, None)
            .await
    }

    pub async fn count_all_string(&self) -> Result<usize> {
        ClusterScanner::new(&self.store)
            .count(&self.namespace.pattern(""), KeyKind::String, None)
            .await
    }
}

fn check_radius(radius_km: f64) -> Result<()> {
    if radius_km.is_finite() && radius_km >= 0.0 {
        Ok(())
    } else {
        Err(CacheError::InvalidArgument(format!(
            "Radius must be a non-negative number of kilometers, got {}",
            radius_km
        )))
    }
}
