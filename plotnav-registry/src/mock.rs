//! Programmable in-memory registry for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dashmap::DashMap;
use plotnav_core::{DatasetRecord, DatasetTypeInfo, RegistryError};

use crate::client::{Registry, RegistryFactory, RegistryResult};

#[derive(Debug, Clone, Default)]
struct MockCollection {
    dataset_types: Vec<DatasetTypeInfo>,
    records: Vec<DatasetRecord>,
}

/// In-memory [`Registry`] with programmable collections and failure
/// injection. Query counters let tests assert batching behavior.
#[derive(Default)]
pub struct MockRegistry {
    collections: RwLock<BTreeMap<String, MockCollection>>,
    unavailable: AtomicBool,
    find_first_calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection with its dataset types and the records a
    /// find-first query over it returns.
    pub fn add_collection(
        &self,
        name: impl Into<String>,
        dataset_types: Vec<DatasetTypeInfo>,
        records: Vec<DatasetRecord>,
    ) {
        self.collections.write().unwrap().insert(
            name.into(),
            MockCollection {
                dataset_types,
                records,
            },
        );
    }

    /// Remove a collection, as if it were deleted from the registry.
    pub fn remove_collection(&self, name: &str) {
        self.collections.write().unwrap().remove(name);
    }

    /// Make every subsequent query fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of find-first queries issued so far.
    pub fn find_first_calls(&self) -> usize {
        self.find_first_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> RegistryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable {
                reason: "injected outage".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn dataset_types(&self, collection: &str) -> RegistryResult<Vec<DatasetTypeInfo>> {
        self.check_available()?;
        let collections = self.collections.read().unwrap();
        collections
            .get(collection)
            .map(|c| c.dataset_types.clone())
            .ok_or_else(|| RegistryError::CollectionNotFound {
                collection: collection.to_string(),
            })
    }

    async fn find_first_datasets(
        &self,
        dataset_types: &[DatasetTypeInfo],
        collection: &str,
    ) -> RegistryResult<Vec<DatasetRecord>> {
        self.check_available()?;
        self.find_first_calls.fetch_add(1, Ordering::SeqCst);
        let collections = self.collections.read().unwrap();
        let entry =
            collections
                .get(collection)
                .ok_or_else(|| RegistryError::CollectionNotFound {
                    collection: collection.to_string(),
                })?;
        let requested: Vec<&str> = dataset_types.iter().map(|t| t.name.as_str()).collect();
        Ok(entry
            .records
            .iter()
            .filter(|r| requested.contains(&r.dataset_type.as_str()))
            .cloned()
            .collect())
    }

    async fn matching_collections(&self, pattern: &str) -> RegistryResult<Vec<String>> {
        self.check_available()?;
        let collections = self.collections.read().unwrap();
        // Trailing '*' gives prefix-expression semantics; anything else is
        // an exact name lookup.
        let matches: Vec<String> = match pattern.strip_suffix('*') {
            Some(prefix) => collections
                .keys()
                .filter(|name| name.starts_with(prefix))
                .cloned()
                .collect(),
            None => collections
                .keys()
                .filter(|name| name.as_str() == pattern)
                .cloned()
                .collect(),
        };
        Ok(matches)
    }
}

/// [`RegistryFactory`] serving pre-built mock registries by repository.
#[derive(Default)]
pub struct MockRegistryFactory {
    registries: DashMap<String, Arc<MockRegistry>>,
    connects: AtomicUsize,
}

impl MockRegistryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, repository: impl Into<String>, registry: Arc<MockRegistry>) {
        self.registries.insert(repository.into(), registry);
    }

    /// Number of successful connects handed out, for lifecycle assertions.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl RegistryFactory for MockRegistryFactory {
    fn connect(&self, repository: &str) -> RegistryResult<Arc<dyn Registry>> {
        let registry =
            self.registries
                .get(repository)
                .ok_or_else(|| RegistryError::Unavailable {
                    reason: format!("no mock registry for repository {repository:?}"),
                })?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&*registry) as Arc<dyn Registry>)
    }
}
