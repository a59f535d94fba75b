//! Service Configuration Module
//!
//! Configuration is loaded from `PLOTNAV_*` environment variables with
//! sensible defaults for development. Each component gets its own config
//! struct; `ServiceConfig` bundles them for the server binary.

/// Object-store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the S3-compatible endpoint.
    pub endpoint: String,
    /// Bucket holding the cache objects.
    pub bucket: String,
    /// Optional bearer token for the object-store gateway.
    pub bearer_token: Option<String>,
    /// Serve from an in-memory store instead of the S3 endpoint
    /// (development mode).
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            bucket: "plot-cache".to_string(),
            bearer_token: None,
            in_memory: false,
        }
    }
}

impl StoreConfig {
    /// Create StoreConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `PLOTNAV_S3_ENDPOINT`: S3-compatible endpoint URL (default: `http://localhost:9000`)
    /// - `PLOTNAV_S3_BUCKET`: bucket name (default: `plot-cache`)
    /// - `PLOTNAV_S3_TOKEN`: optional bearer token
    /// - `PLOTNAV_STORE_MODE`: `memory` to use the in-memory store
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("PLOTNAV_S3_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: std::env::var("PLOTNAV_S3_BUCKET").unwrap_or(defaults.bucket),
            bearer_token: std::env::var("PLOTNAV_S3_TOKEN").ok().filter(|t| !t.is_empty()),
            in_memory: std::env::var("PLOTNAV_STORE_MODE")
                .map(|m| m.eq_ignore_ascii_case("memory"))
                .unwrap_or(false),
        }
    }
}

/// Build-queue settings.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of build workers (default: 2).
    pub workers: usize,
    /// Capacity of the pending-build queue (default: 256).
    pub queue_capacity: usize,
    /// Maximum retained jobs; oldest terminal jobs are evicted past this
    /// (default: 1024).
    pub job_table_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 256,
            job_table_capacity: 1024,
        }
    }
}

impl QueueConfig {
    /// Create QueueConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `PLOTNAV_QUEUE_WORKERS`: build worker count (default: 2)
    /// - `PLOTNAV_QUEUE_CAPACITY`: pending-build queue depth (default: 256)
    /// - `PLOTNAV_JOB_TABLE_CAPACITY`: retained job cap (default: 1024)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            workers: env_parse("PLOTNAV_QUEUE_WORKERS", defaults.workers).max(1),
            queue_capacity: env_parse("PLOTNAV_QUEUE_CAPACITY", defaults.queue_capacity).max(1),
            job_table_capacity: env_parse(
                "PLOTNAV_JOB_TABLE_CAPACITY",
                defaults.job_table_capacity,
            )
            .max(1),
        }
    }

    /// Configuration for tests: one worker, tiny queue.
    pub fn development() -> Self {
        Self {
            workers: 1,
            queue_capacity: 8,
            job_table_capacity: 32,
        }
    }
}

/// Registry scoping settings.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Registered repository identifiers. Submissions and sweeps for any
    /// other identifier are rejected.
    pub repositories: Vec<String>,
}

impl RegistryConfig {
    /// Create RegistryConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `PLOTNAV_REPOSITORIES`: comma-separated repository identifiers
    pub fn from_env() -> Self {
        let repositories = std::env::var("PLOTNAV_REPOSITORIES")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { repositories }
    }
}

/// Everything the server binary needs.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub registry: RegistryConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self {
            store: StoreConfig::from_env(),
            queue: QueueConfig::from_env(),
            registry: RegistryConfig::from_env(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
