//! plotnav Storage - Key Codec and Cache Store
//!
//! Defines the bijective cache-key encoding, the object-store contract the
//! rest of plotnav programs against, the gzip payload codec, and two
//! backends: an in-memory store for tests and an S3-compatible HTTP store
//! for production.

pub mod key;
pub mod memory;
pub mod payload;
pub mod s3;
pub mod store;

pub use key::CacheKey;
pub use memory::MemoryStore;
pub use payload::{decode_summary, encode_summary};
pub use s3::S3Store;
pub use store::{CacheStore, ObjectEntry, StoreResult};
