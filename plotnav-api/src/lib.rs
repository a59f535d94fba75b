//! plotnav API - REST Service Layer
//!
//! This crate exposes the summary cache over HTTP: submit a build, poll its
//! job, fetch a cached summary, and run a reconciliation sweep. It owns the
//! two active components of the system - the asynchronous build-job runner
//! and the reconciler - and wires them to the storage and registry crates.

pub mod config;
pub mod error;
pub mod jobs;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod reconcile;
pub mod routes;
pub mod state;

pub use config::{QueueConfig, RegistryConfig, ServiceConfig, StoreConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{JobMetricsSnapshot, JobRunner};
pub use reconcile::{sweep, SweepRecord, SweepReport};
pub use routes::create_api_router;
pub use state::AppState;
