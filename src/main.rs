//! Entity Cache sample server
//!
//! Serves `Person` records read through the cache, backed by Redis or by the
//! in-process store when `CACHE_BACKEND=memory`.

use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use entity_cache::api::{create_router, PERSON_SYSTEM};
use entity_cache::models::PersonDirectory;
use entity_cache::store::redact_url;
use entity_cache::{AppState, CacheConfig, CacheStore, MemoryStore, RedisConnection, ServerConfig};

/// Main entry point for the sample server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache and server configuration from environment variables
/// 3. Open the configured store and build the person cache
/// 4. Start HTTP server on configured port
/// 5. Dispose the store after graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entity_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Entity Cache sample server");

    let server = ServerConfig::from_env();
    let cache = CacheConfig {
        system_name: env::var("CACHE_SYSTEM_NAME").unwrap_or_else(|_| PERSON_SYSTEM.to_string()),
        ..CacheConfig::from_env()
    };
    cache.validate().context("invalid cache configuration")?;
    info!(
        "Configuration loaded: system={}, cache_duration={}m, port={}, memory_store={}",
        cache.system_name, cache.cache_duration_minutes, server.server_port, server.use_memory_store
    );

    let directory = PersonDirectory::seeded();
    if server.use_memory_store {
        let state = AppState::from_store(MemoryStore::new(), &cache, directory, "memory")?;
        serve(state, server.server_port).await
    } else {
        let connection = RedisConnection::connect(&cache)
            .await
            .with_context(|| format!("failed to connect to {}", redact_url(&cache.connection_endpoint)))?;
        let state = AppState::from_store(connection, &cache, directory, "redis")?;
        serve(state, server.server_port).await
    }
}

async fn serve<S: CacheStore + 'static>(state: AppState<S>, port: u16) -> anyhow::Result<()> {
    let persons = state.persons.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    persons.dispose().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
