//! API Routes
//!
//! Configures the Axum router with the sample person endpoints.

use axum::{
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    evict_person_handler, get_person_handler, health_handler, list_persons_handler, AppState,
};
use crate::store::CacheStore;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /person/:id` - Read-through person lookup
/// - `DELETE /person/:id` - Evict a person from the cache
/// - `GET /persons` - Page of cached persons (`?page=&page_size=`)
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router<S: CacheStore + 'static>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/person/:id",
            get(get_person_handler::<S>).delete(evict_person_handler::<S>),
        )
        .route("/persons", get(list_persons_handler::<S>))
        .route("/health", get(health_handler::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::models::PersonDirectory;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let config = CacheConfig::new(-1, "Person", "localhost:6379", 0);
        let state =
            AppState::from_store(MemoryStore::new(), &config, PersonDirectory::seeded(), "memory")
                .unwrap();
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_person_endpoint() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/person/1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_person_not_found() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/person/99").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_person_id_must_be_numeric() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/person/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
