//! Background build jobs for the plotnav API.
//!
//! The [`JobRunner`] owns the asynchronous population path of the cache: it
//! accepts build submissions, coalesces duplicates onto in-flight work,
//! executes builds on a worker pool, and exposes job status to pollers.
//!
//! Workers are spawned at server startup and stopped through a watch
//! channel:
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let runner = JobRunner::start(&config.queue, store, pool, shutdown_rx);
//! // on shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod runner;

pub use runner::{JobMetricsSnapshot, JobRunner};
