//! Reconciliation sweep.
//!
//! The cache is append/overwrite-only on the build path: when a collection
//! is deleted from the registry its cache entry silently goes stale. The
//! sweep is the only mechanism that removes entries. It walks every cache
//! object under a repository's key prefix, decodes the collection name out
//! of each key, asks the registry whether any matching collection still
//! exists, and deletes the entries whose collection is gone.
//!
//! Error discipline: malformed or foreign keys are logged, skipped, and
//! recorded; a store or registry transport error aborts the whole sweep so
//! its accounting is never silently incomplete.

use futures_util::TryStreamExt;
use plotnav_core::{RegistryError, SweepError};
use plotnav_registry::Registry;
use plotnav_storage::{CacheKey, CacheStore};
use serde::{Deserialize, Serialize};

/// Decision taken for one cache entry during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SweepRecord {
    /// The flat storage key of the entry.
    pub key: String,
    /// The decoded collection name; `None` when the key did not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Whether a matching collection still exists in the registry.
    pub existed: bool,
    /// Whether the entry was deleted in this sweep.
    pub deleted: bool,
    /// Whether the entry was skipped because its key did not parse.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

/// Full accounting of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SweepReport {
    pub repository: String,
    pub dry_run: bool,
    pub records: Vec<SweepRecord>,
    pub kept: usize,
    pub deleted: usize,
    pub skipped: usize,
}

/// Walk all cache entries of `repository` and delete the stale ones.
///
/// With `dry_run` set, nothing is deleted but every verdict is still
/// reported. Re-running a completed sweep with no intervening registry
/// changes deletes nothing further.
pub async fn sweep(
    store: &dyn CacheStore,
    registry: &dyn Registry,
    repository: &str,
    dry_run: bool,
) -> Result<SweepReport, SweepError> {
    let prefix = CacheKey::repository_prefix(repository);
    tracing::info!(repository, dry_run, prefix = %prefix, "Starting reconciliation sweep");

    let mut records = Vec::new();
    let mut entries = store.list_prefix(prefix);
    while let Some(entry) = entries.try_next().await? {
        let key = match CacheKey::decode(&entry.key) {
            Ok(key) => key,
            Err(e) => {
                // Not a key this service wrote; leave the object alone.
                tracing::warn!(key = %entry.key, error = %e, "Skipping unparseable cache key");
                records.push(SweepRecord {
                    key: entry.key,
                    collection: None,
                    existed: false,
                    deleted: false,
                    skipped: true,
                });
                continue;
            }
        };

        let existed = match registry.matching_collections(key.collection()).await {
            Ok(matches) => {
                if matches.len() > 1 {
                    // Ambiguous matches count as "exists": deletion is the
                    // irreversible operation, so the sweep stays conservative.
                    tracing::debug!(
                        collection = key.collection(),
                        matches = matches.len(),
                        "Ambiguous collection match, keeping entry"
                    );
                }
                !matches.is_empty()
            }
            Err(RegistryError::CollectionNotFound { .. }) => false,
            Err(e) => return Err(SweepError::Registry(e)),
        };

        let mut deleted = false;
        if !existed && !dry_run {
            store.delete(&entry.key).await?;
            deleted = true;
            tracing::info!(key = %entry.key, "Deleted stale cache entry");
        }

        records.push(SweepRecord {
            key: entry.key,
            collection: Some(key.collection().to_string()),
            existed,
            deleted,
            skipped: false,
        });
    }
    drop(entries);

    let kept = records.iter().filter(|r| r.existed).count();
    let deleted = records.iter().filter(|r| r.deleted).count();
    let skipped = records.iter().filter(|r| r.skipped).count();
    tracing::info!(
        repository,
        entries = records.len(),
        kept,
        deleted,
        skipped,
        "Reconciliation sweep completed"
    );

    Ok(SweepReport {
        repository: repository.to_string(),
        dry_run,
        records,
        kept,
        deleted,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotnav_core::StoreError;
    use plotnav_registry::MockRegistry;
    use plotnav_storage::MemoryStore;

    /// Five entries, three of which still have a live collection.
    async fn populated() -> (MemoryStore, MockRegistry) {
        let store = MemoryStore::with_page_size(2);
        let registry = MockRegistry::new();
        for name in ["alive1", "alive2", "alive3", "stale1", "stale2"] {
            let key = CacheKey::new("main", name).encode();
            store.put(&key, name.as_bytes().to_vec()).await.unwrap();
        }
        for name in ["alive1", "alive2", "alive3"] {
            registry.add_collection(name, vec![], vec![]);
        }
        (store, registry)
    }

    #[tokio::test]
    async fn sweep_deletes_exactly_the_stale_entries() {
        let (store, registry) = populated().await;

        let report = sweep(&store, &registry, "main", false).await.unwrap();
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.kept, 3);
        assert_eq!(store.len(), 3);

        for record in &report.records {
            let alive = record
                .collection
                .as_deref()
                .is_some_and(|c| c.starts_with("alive"));
            assert_eq!(record.existed, alive);
            assert_eq!(record.deleted, !alive);
        }
    }

    #[tokio::test]
    async fn second_sweep_deletes_nothing() {
        let (store, registry) = populated().await;
        sweep(&store, &registry, "main", false).await.unwrap();

        let second = sweep(&store, &registry, "main", false).await.unwrap();
        assert_eq!(second.records.len(), 3);
        assert_eq!(second.deleted, 0);
        assert!(second.records.iter().all(|r| r.existed));
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn dry_run_reports_but_keeps_everything() {
        let (store, registry) = populated().await;

        let report = sweep(&store, &registry, "main", true).await.unwrap();
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.records.iter().filter(|r| !r.existed).count(), 2);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn sweep_is_scoped_to_the_repository_prefix() {
        let (store, registry) = populated().await;
        let other = CacheKey::new("other-repo", "stale-elsewhere").encode();
        store.put(&other, b"x".to_vec()).await.unwrap();

        let report = sweep(&store, &registry, "main", false).await.unwrap();
        assert_eq!(report.records.len(), 5);
        assert!(store.get(&other).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn malformed_keys_are_skipped_and_reported_not_fatal() {
        let (store, registry) = populated().await;
        // Lands under the prefix but is missing the .json.gz suffix.
        store
            .put("main/collection_truncated.json", b"x".to_vec())
            .await
            .unwrap();

        let report = sweep(&store, &registry, "main", false).await.unwrap();
        assert_eq!(report.records.len(), 6);
        assert_eq!(report.skipped, 1);
        // The unparseable object is never deleted.
        assert!(store
            .get("main/collection_truncated.json")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn ambiguous_match_counts_as_exists() {
        let store = MemoryStore::new();
        let registry = MockRegistry::new();
        registry.add_collection("nightly/a", vec![], vec![]);
        registry.add_collection("nightly/b", vec![], vec![]);
        let key = CacheKey::new("main", "nightly/*").encode();
        store.put(&key, b"x".to_vec()).await.unwrap();

        let report = sweep(&store, &registry, "main", false).await.unwrap();
        assert!(report.records[0].existed);
        assert_eq!(report.deleted, 0);
        assert!(store.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn store_outage_aborts_the_whole_sweep() {
        let (store, registry) = populated().await;
        store.set_unavailable(true);

        let err = sweep(&store, &registry, "main", false).await.unwrap_err();
        assert!(matches!(
            err,
            SweepError::Store(StoreError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn registry_outage_aborts_the_whole_sweep() {
        let (store, registry) = populated().await;
        registry.set_unavailable(true);

        let err = sweep(&store, &registry, "main", false).await.unwrap_err();
        assert!(matches!(
            err,
            SweepError::Registry(RegistryError::Unavailable { .. })
        ));
        assert_eq!(store.len(), 5);
    }
}
