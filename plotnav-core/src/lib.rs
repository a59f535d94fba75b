//! plotnav Core - Data Types
//!
//! Pure data structures shared by every plotnav crate: the summary document
//! model, the build-job state machine, and the error taxonomy. This crate
//! contains no I/O and no business logic beyond classification and
//! state-transition guards.

pub mod error;
pub mod job;
pub mod summary;

pub use error::{
    JobError, KeyFormatError, PlotnavError, PlotnavResult, RegistryError, StoreError, SweepError,
};
pub use job::{new_job_id, Job, JobId, JobStatus};
pub use summary::{
    DatasetRecord, DatasetRefSummary, DatasetTypeInfo, PlotBucket, Summary, PLOT_STORAGE_CLASS,
};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
