//! In-memory cache store.
//!
//! Backs tests and local development. Listing is paginated internally (the
//! page size is configurable) so consumers exercise the same
//! continuation-following path they hit against a real object service, and
//! failures can be injected to exercise sweep-abort behavior.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use plotnav_core::StoreError;

use crate::store::{now, CacheStore, ObjectEntry, StoreResult};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    payload: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// In-memory [`CacheStore`] over a sorted key map.
#[derive(Debug)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    page_size: usize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Use a small page size to force multi-page listings in tests.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "injected outage".to_string(),
            });
        }
        Ok(())
    }

    fn lock_err() -> StoreError {
        StoreError::Unavailable {
            reason: "store lock poisoned".to_string(),
        }
    }

    /// Collect one page of entries under `prefix` strictly after `after`.
    ///
    /// Factored out of the listing stream so the read guard is released
    /// before any `await`, keeping the resulting stream `Send`.
    fn collect_page(&self, prefix: &str, after: Option<&str>) -> StoreResult<Vec<ObjectEntry>> {
        let objects = self.objects.read().map_err(|_| Self::lock_err())?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| after.is_none_or(|a| k.as_str() > a))
            .take(self.page_size)
            .map(|(k, o)| ObjectEntry {
                key: k.clone(),
                last_modified: o.last_modified,
            })
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn put(&self, key: &str, payload: Vec<u8>) -> StoreResult<()> {
        self.check_available()?;
        let mut objects = self.objects.write().map_err(|_| Self::lock_err())?;
        objects.insert(
            key.to_string(),
            StoredObject {
                payload,
                last_modified: now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_available()?;
        let objects = self.objects.read().map_err(|_| Self::lock_err())?;
        Ok(objects.get(key).map(|o| o.payload.clone()))
    }

    fn list_prefix(&self, prefix: String) -> BoxStream<'_, StoreResult<ObjectEntry>> {
        Box::pin(try_stream! {
            let mut after: Option<String> = None;
            loop {
                // Availability is re-checked per page so an outage can cut
                // a walk off mid-stream, as a real backend would.
                self.check_available()?;
                let page: Vec<ObjectEntry> = self.collect_page(&prefix, after.as_deref())?;
                match page.last() {
                    Some(last) => after = Some(last.key.clone()),
                    None => break,
                }
                for entry in page {
                    yield entry;
                }
            }
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_available()?;
        let mut objects = self.objects.write().map_err(|_| Self::lock_err())?;
        // Idempotent: removing an absent key is fine.
        objects.remove(key);
        Ok(())
    }
}
