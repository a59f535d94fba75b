//! Shared application state for the Axum router.

use std::sync::Arc;

use plotnav_registry::RegistryPool;
use plotnav_storage::CacheStore;

use crate::jobs::JobRunner;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The cache store the service reads from and the job runner writes to.
    pub store: Arc<dyn CacheStore>,
    /// Per-repository registry handles, created on first use.
    pub pool: Arc<RegistryPool>,
    /// The asynchronous build-job runner.
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    pub fn new(store: Arc<dyn CacheStore>, pool: Arc<RegistryPool>, jobs: Arc<JobRunner>) -> Self {
        Self { store, pool, jobs }
    }
}
