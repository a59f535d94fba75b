//! Per-repository registry handle pool.
//!
//! Registry handles are expensive to create and safe to share, so the
//! service keeps one per repository. The pool is an explicit component with
//! a defined lifecycle: a handle is created on first use for a registered
//! repository identifier and dropped at [`RegistryPool::shutdown`]; nothing
//! is cached in globals.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use plotnav_core::RegistryError;

use crate::client::{Registry, RegistryFactory, RegistryResult};

pub struct RegistryPool {
    repositories: BTreeSet<String>,
    factory: Arc<dyn RegistryFactory>,
    handles: DashMap<String, Arc<dyn Registry>>,
}

impl RegistryPool {
    /// Create a pool scoped to the registered `repositories`.
    pub fn new<I, S>(repositories: I, factory: Arc<dyn RegistryFactory>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repositories: repositories.into_iter().map(Into::into).collect(),
            factory,
            handles: DashMap::new(),
        }
    }

    /// Whether `repository` is in the registered set.
    pub fn is_registered(&self, repository: &str) -> bool {
        self.repositories.contains(repository)
    }

    /// The registered repository identifiers, sorted.
    pub fn repositories(&self) -> Vec<String> {
        self.repositories.iter().cloned().collect()
    }

    /// The registry handle for `repository`, creating it on first use.
    pub fn get(&self, repository: &str) -> RegistryResult<Arc<dyn Registry>> {
        if !self.is_registered(repository) {
            return Err(RegistryError::UnknownRepository {
                repository: repository.to_string(),
            });
        }
        if let Some(handle) = self.handles.get(repository) {
            return Ok(Arc::clone(&handle));
        }
        // Entry API so concurrent first uses connect at most once.
        match self.handles.entry(repository.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => Ok(Arc::clone(occupied.get())),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let handle = self.factory.connect(repository)?;
                tracing::info!(repository, "Connected registry handle");
                vacant.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    /// Drop every cached handle. Called at process shutdown.
    pub fn shutdown(&self) {
        let dropped = self.handles.len();
        self.handles.clear();
        tracing::debug!(dropped, "Registry pool shut down");
    }
}
