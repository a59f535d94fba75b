//! plotnav API Server Entry Point
//!
//! Bootstraps configuration, the cache store, the registry pool, and the
//! build-worker pool, then starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use plotnav_api::{create_api_router, ApiError, ApiResult, AppState, JobRunner, ServiceConfig};
use plotnav_registry::{MockRegistry, MockRegistryFactory, RegistryFactory, RegistryPool};
use plotnav_storage::{CacheStore, MemoryStore, S3Store};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env();
    if config.registry.repositories.is_empty() {
        tracing::warn!("PLOTNAV_REPOSITORIES is empty; every submission will be rejected");
    }

    let store: Arc<dyn CacheStore> = if config.store.in_memory {
        tracing::info!("Using in-memory cache store (PLOTNAV_STORE_MODE=memory)");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!(
            endpoint = %config.store.endpoint,
            bucket = %config.store.bucket,
            "Using S3-compatible cache store"
        );
        Arc::new(
            S3Store::new(config.store.endpoint.clone(), config.store.bucket.clone())
                .with_bearer_token(config.store.bearer_token.clone()),
        )
    };

    // Registry clients are deployment-specific; the in-memory factory is
    // the development wiring, replaced with the site's registry client at
    // integration time.
    let factory = Arc::new(MockRegistryFactory::new());
    for repository in &config.registry.repositories {
        factory.insert(repository.clone(), Arc::new(MockRegistry::new()));
    }
    let pool = Arc::new(RegistryPool::new(
        config.registry.repositories.clone(),
        factory as Arc<dyn RegistryFactory>,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let jobs = JobRunner::start(
        &config.queue,
        Arc::clone(&store),
        Arc::clone(&pool),
        shutdown_rx,
    );

    let app: Router = create_api_router(AppState::new(store, Arc::clone(&pool), Arc::clone(&jobs)));

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting plotnav API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {addr}: {e}")))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    pool.shutdown();
    let metrics = jobs.metrics_snapshot();
    tracing::info!(
        submitted = metrics.submitted,
        coalesced = metrics.coalesced,
        succeeded = metrics.succeeded,
        failed = metrics.failed,
        "Build activity at shutdown"
    );
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("PLOTNAV_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("PLOTNAV_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {port_str}")))?;

    let addr = format!("{host}:{port}");
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {addr}: {e}")))
}
