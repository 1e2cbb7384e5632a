//! API Handlers
//!
//! HTTP request handlers for the sample person endpoints. Persons are read
//! through the cache: a miss falls back to the directory and fills the cache.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::models::{
    EvictResponse, HealthResponse, PageQuery, Person, PersonDirectory, PersonPageResponse,
    PersonResponse, Source,
};
use crate::store::{CacheStore, RedisConnection};

/// System name of the sample application's keys
pub const PERSON_SYSTEM: &str = "Person";

/// Contract name of the sample application's keys
pub const PERSON_CONTRACT: &str = "RedisPerson";

/// Application state shared across all handlers.
///
/// Holds the person cache over store `S` and the authoritative directory.
pub struct AppState<S = RedisConnection> {
    pub persons: Arc<CacheService<Person, S>>,
    pub directory: PersonDirectory,
    /// Backend name reported by the health endpoint
    pub backend: &'static str,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            persons: Arc::clone(&self.persons),
            directory: self.directory.clone(),
            backend: self.backend,
        }
    }
}

impl<S: CacheStore> AppState<S> {
    /// Creates a new AppState around an existing person cache.
    pub fn new(
        persons: CacheService<Person, S>,
        directory: PersonDirectory,
        backend: &'static str,
    ) -> Self {
        Self {
            persons: Arc::new(persons),
            directory,
            backend,
        }
    }

    /// Builds the person cache on `store` under the `Person:RedisPerson:` namespace.
    pub fn from_store(
        store: S,
        config: &CacheConfig,
        directory: PersonDirectory,
        backend: &'static str,
    ) -> Result<Self> {
        let persons = CacheService::new(store, config, PERSON_CONTRACT, Person::codec()?)?;
        Ok(Self::new(persons, directory, backend))
    }
}

/// Handler for GET /person/:id
///
/// Serves from the cache, else loads from the directory and caches the record.
pub async fn get_person_handler<S: CacheStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<i32>,
) -> Result<Json<PersonResponse>> {
    let key = id.to_string();
    if let Some(person) = state.persons.get_hash(&key).await? {
        return Ok(Json(PersonResponse::new(person, Source::Cache)));
    }

    let person = state
        .directory
        .find(id)
        .await
        .ok_or_else(|| CacheError::NotFound(format!("Person {} not found", id)))?;
    state.persons.set_hash(&key, &person, None).await?;
    debug!(id = id, "Person cached from directory");

    Ok(Json(PersonResponse::new(person, Source::Directory)))
}

/// Handler for GET /persons
///
/// Returns one page of the cached persons.
pub async fn list_persons_handler<S: CacheStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PersonPageResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let persons = state
        .persons
        .get_all_hash(query.page, query.page_size)
        .await?;
    let total = state.persons.count_all_hash().await?;

    Ok(Json(PersonPageResponse {
        page: query.page,
        page_size: query.page_size,
        total,
        persons,
    }))
}

/// Handler for DELETE /person/:id
///
/// Evicts a person from the cache; the directory is untouched.
pub async fn evict_person_handler<S: CacheStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<i32>,
) -> Result<Json<EvictResponse>> {
    let key = id.to_string();
    let evicted = state.persons.delete(&key).await?;
    Ok(Json(EvictResponse::new(
        state.persons.complete_key(&key),
        evicted,
    )))
}

/// Handler for GET /health
///
/// Reports degraded when the store cannot enumerate its primaries.
pub async fn health_handler<S: CacheStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let healthy = match state.persons.store().primary_count().await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Health check failed");
            false
        }
    };
    Json(HealthResponse::new(healthy, state.backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_state() -> AppState<MemoryStore> {
        let config = CacheConfig::new(-1, PERSON_SYSTEM, "localhost:6379", 0);
        AppState::from_store(MemoryStore::new(), &config, PersonDirectory::seeded(), "memory")
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_person_read_through() {
        let state = test_state();

        let first = get_person_handler(State(state.clone()), Path(1)).await.unwrap();
        assert_eq!(first.source, Source::Directory);
        assert_eq!(first.full_name, "Mahyar Hoorbakht");

        let second = get_person_handler(State(state.clone()), Path(1)).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.full_name, "Mahyar Hoorbakht");
    }

    #[tokio::test]
    async fn test_get_unknown_person() {
        let state = test_state();

        let result = get_person_handler(State(state), Path(42)).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_evict_person() {
        let state = test_state();
        get_person_handler(State(state.clone()), Path(1)).await.unwrap();

        let response = evict_person_handler(State(state.clone()), Path(1)).await.unwrap();
        assert!(response.evicted);
        assert_eq!(response.key, "Person:RedisPerson:1");

        let response = evict_person_handler(State(state.clone()), Path(1)).await.unwrap();
        assert!(!response.evicted);

        // Next read comes from the directory again
        let person = get_person_handler(State(state), Path(1)).await.unwrap();
        assert_eq!(person.source, Source::Directory);
    }

    #[tokio::test]
    async fn test_list_persons() {
        let state = test_state();
        state.directory.insert(Person::new(2, "Sara", "Karimi")).await;
        get_person_handler(State(state.clone()), Path(1)).await.unwrap();
        get_person_handler(State(state.clone()), Path(2)).await.unwrap();

        let page = list_persons_handler(State(state.clone()), Query(PageQuery::default()))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.persons.len(), 2);

        let invalid = PageQuery {
            page: 0,
            page_size: 0,
        };
        let result = list_persons_handler(State(state), Query(invalid)).await;
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = test_state();
        let response = health_handler(State(state.clone())).await;
        assert_eq!(response.status, "healthy");

        state.persons.dispose().await;
        let response = health_handler(State(state)).await;
        assert_eq!(response.status, "degraded");
    }
}
