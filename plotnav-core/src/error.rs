//! Error types for plotnav operations

use thiserror::Error;
use uuid::Uuid;

/// Result alias used across plotnav crates.
pub type PlotnavResult<T> = Result<T, PlotnavError>;

/// Cache-key parsing errors.
///
/// A malformed key is a local bug or a corrupted listing entry; these are
/// never retryable. The reconciler treats them as skip-and-log, everything
/// else surfaces them to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("Cache key {key:?} has no repository/collection separator")]
    MissingSeparator { key: String },

    #[error("Cache key {key:?} is missing the collection_ marker")]
    MissingMarker { key: String },

    #[error("Cache key {key:?} is missing the .json.gz suffix")]
    MissingSuffix { key: String },

    #[error("Cache key {key:?} contains an invalid percent-encoded field: {reason}")]
    InvalidEncoding { key: String, reason: String },
}

/// Object store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Transient infrastructure failure (network, auth, service outage).
    /// Retryable by the caller; fatal to an in-progress sweep.
    #[error("Object store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A stored payload could not be decompressed or decoded.
    #[error("Corrupt cache payload: {reason}")]
    Payload { reason: String },
}

/// Registry client errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The named collection does not exist in the registry. User error,
    /// surfaced verbatim; retrying without a different name cannot succeed.
    #[error("Collection {collection:?} not found in registry")]
    CollectionNotFound { collection: String },

    /// The repository identifier is not in the configured set.
    #[error("Repository {repository:?} is not registered")]
    UnknownRepository { repository: String },

    /// Transport-level failure talking to the registry.
    #[error("Registry unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Build-job errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("No job found with id {id}")]
    NotFound { id: Uuid },

    #[error("Invalid job transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: crate::job::JobStatus,
        to: crate::job::JobStatus,
    },

    #[error("Build queue is shut down")]
    QueueClosed,

    #[error("Build queue is full")]
    QueueFull,
}

/// Reconciliation sweep errors.
///
/// A sweep aborts whole rather than skipping pages, so its accounting is
/// never silently incomplete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Top-level error wrapper for plotnav operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlotnavError {
    #[error(transparent)]
    KeyFormat(#[from] KeyFormatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Sweep(#[from] SweepError),
}
