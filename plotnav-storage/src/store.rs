//! Cache store contract.
//!
//! A thin async contract over a keyed object storage service. The cache is
//! a set of independent keys with no cross-key transactions: `put` is an
//! unconditional full replace (last writer wins), `delete` is idempotent,
//! and listing transparently follows the backing service's pagination.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use plotnav_core::StoreError;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One listed object: its flat key and server-side modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Keyed object store backing the summary cache.
///
/// All operations may fail with [`StoreError::Unavailable`]; failures are
/// surfaced, never swallowed. Consumers of [`CacheStore::list_prefix`] must
/// treat a mid-stream error as fatal to the whole walk: the stream is
/// restartable from the start but not resumable mid-way.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Write `payload` under `key`, replacing any existing object.
    async fn put(&self, key: &str, payload: Vec<u8>) -> StoreResult<()>;

    /// Read the object at `key`, or `None` if no such object exists.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Lazily list all objects whose key starts with `prefix`, following
    /// the backend's continuation tokens across pages.
    fn list_prefix(&self, prefix: String) -> BoxStream<'_, StoreResult<ObjectEntry>>;

    /// Delete the object at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Clock helper for backends that stamp entries themselves.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
