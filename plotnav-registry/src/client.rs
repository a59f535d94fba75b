//! Registry capability interface.

use std::sync::Arc;

use async_trait::async_trait;
use plotnav_core::{DatasetRecord, DatasetTypeInfo, RegistryError};

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Handle to one repository's registry.
///
/// Implementations are remote clients against the source-of-truth service;
/// queries are slow relative to the cache, which is the reason the summary
/// cache exists at all.
#[async_trait]
pub trait Registry: Send + Sync {
    /// The dataset types recorded in `collection`.
    ///
    /// Fails with [`RegistryError::CollectionNotFound`] when the collection
    /// does not exist, distinct from transport failures.
    async fn dataset_types(&self, collection: &str) -> RegistryResult<Vec<DatasetTypeInfo>>;

    /// One batched find-first query: for every `(type, dataId)` combination
    /// across all of `dataset_types`, the first matching dataset reference
    /// in `collection`. Callers issue one call per bucket, never one per
    /// type; per-type fan-out against the registry is too slow.
    async fn find_first_datasets(
        &self,
        dataset_types: &[DatasetTypeInfo],
        collection: &str,
    ) -> RegistryResult<Vec<DatasetRecord>>;

    /// Collection names currently matching `pattern` (exact name, or a
    /// registry search expression). An empty result means no such
    /// collection exists.
    async fn matching_collections(&self, pattern: &str) -> RegistryResult<Vec<String>>;
}

/// Creates registry handles on demand, one per repository identifier.
pub trait RegistryFactory: Send + Sync {
    fn connect(&self, repository: &str) -> RegistryResult<Arc<dyn Registry>>;
}
