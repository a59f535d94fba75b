//! Bijective cache-key codec.
//!
//! A [`CacheKey`] identifies one cache entry by `(repository, collection)`.
//! Both fields are opaque byte strings chosen by operators and pipeline
//! authors: they routinely contain `/`, spaces, `%`, non-ASCII characters,
//! and can even contain the literal substring `collection_`. The codec
//! percent-encodes both fields independently, so the single unencoded `/`
//! in an encoded key is always the repository/collection boundary:
//!
//! ```text
//! {encoded_repository}/collection_{encoded_collection}.json.gz
//! ```
//!
//! `decode` is total and symmetric: it recovers both fields from a key
//! without any caller-supplied context.

use std::fmt;

use plotnav_core::KeyFormatError;

/// Marker between the repository segment and the encoded collection.
const COLLECTION_MARKER: &str = "collection_";

/// Fixed suffix of every cache key.
const KEY_SUFFIX: &str = ".json.gz";

/// Identity of one cache entry: a `(repository, collection)` pair.
///
/// Fields are private so a key can only be built through [`CacheKey::new`]
/// or recovered through [`CacheKey::decode`]; there is no way to hold a key
/// whose encoding would not round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    repository: String,
    collection: String,
}

impl CacheKey {
    pub fn new(repository: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            collection: collection.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Encode to the flat storage key.
    ///
    /// Every byte outside `[A-Za-z0-9_.~-]` is percent-encoded in both
    /// fields, which makes the encoding injective: two distinct pairs can
    /// never collide on one key.
    pub fn encode(&self) -> String {
        format!(
            "{}/{}{}{}",
            urlencoding::encode(&self.repository),
            COLLECTION_MARKER,
            urlencoding::encode(&self.collection),
            KEY_SUFFIX
        )
    }

    /// Decode a storage key back into its `(repository, collection)` pair.
    ///
    /// Fails with [`KeyFormatError`] on keys this codec did not produce:
    /// a missing `/` boundary, a missing `collection_` marker, a missing
    /// `.json.gz` suffix, raw `/` bytes inside a field segment, or percent
    /// sequences that do not decode to UTF-8.
    pub fn decode(key: &str) -> Result<Self, KeyFormatError> {
        let (encoded_repository, rest) =
            key.split_once('/')
                .ok_or_else(|| KeyFormatError::MissingSeparator {
                    key: key.to_string(),
                })?;

        let rest = rest
            .strip_prefix(COLLECTION_MARKER)
            .ok_or_else(|| KeyFormatError::MissingMarker {
                key: key.to_string(),
            })?;

        let encoded_collection =
            rest.strip_suffix(KEY_SUFFIX)
                .ok_or_else(|| KeyFormatError::MissingSuffix {
                    key: key.to_string(),
                })?;

        // A key produced by encode() has exactly one unencoded slash.
        if encoded_collection.contains('/') {
            return Err(KeyFormatError::InvalidEncoding {
                key: key.to_string(),
                reason: "unencoded '/' inside collection segment".to_string(),
            });
        }

        let repository = urlencoding::decode(encoded_repository)
            .map_err(|e| KeyFormatError::InvalidEncoding {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .into_owned();

        let collection = urlencoding::decode(encoded_collection)
            .map_err(|e| KeyFormatError::InvalidEncoding {
                key: key.to_string(),
                reason: e.to_string(),
            })?
            .into_owned();

        Ok(Self {
            repository,
            collection,
        })
    }

    /// Listing prefix that scopes all cache entries of one repository.
    ///
    /// Every key produced by [`CacheKey::encode`] for `repository` starts
    /// with this prefix, and no key of another repository does.
    pub fn repository_prefix(repository: &str) -> String {
        format!("{}/{}", urlencoding::encode(repository), COLLECTION_MARKER)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_matches_persisted_layout() {
        let key = CacheKey::new("main", "nightly/2026-01-01");
        assert_eq!(key.encode(), "main/collection_nightly%2F2026-01-01.json.gz");
    }

    #[test]
    fn roundtrip_with_slashes_in_both_fields() {
        let key = CacheKey::new("repo/embargo", "u/someone/DM-12345/run1");
        assert_eq!(CacheKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn roundtrip_with_percent_and_spaces() {
        let key = CacheKey::new("50% done", "weird name %2F");
        assert_eq!(CacheKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn roundtrip_with_literal_collection_marker() {
        let key = CacheKey::new("collection_", "collection_collection_.json.gz");
        assert_eq!(CacheKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn roundtrip_with_unicode() {
        let key = CacheKey::new("データ", "koleksi/ünïcode✓");
        assert_eq!(CacheKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn roundtrip_with_empty_fields() {
        let key = CacheKey::new("", "");
        assert_eq!(CacheKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn decode_rejects_missing_separator() {
        assert!(matches!(
            CacheKey::decode("no-separator-here.json.gz"),
            Err(KeyFormatError::MissingSeparator { .. })
        ));
    }

    #[test]
    fn decode_rejects_missing_marker() {
        assert!(matches!(
            CacheKey::decode("repo/summary_abc.json.gz"),
            Err(KeyFormatError::MissingMarker { .. })
        ));
    }

    #[test]
    fn decode_rejects_missing_suffix() {
        assert!(matches!(
            CacheKey::decode("repo/collection_abc.json"),
            Err(KeyFormatError::MissingSuffix { .. })
        ));
    }

    #[test]
    fn decode_rejects_foreign_key_with_extra_segments() {
        // A foreign object that happens to sit under the same bucket.
        assert!(CacheKey::decode("repo/collection_a/b.json.gz").is_err());
        assert!(CacheKey::decode("repo/other/collection_a.json.gz").is_err());
    }

    #[test]
    fn repository_prefix_scopes_exactly_one_repository() {
        let prefix = CacheKey::repository_prefix("repo/embargo");
        let ours = CacheKey::new("repo/embargo", "c1").encode();
        let theirs = CacheKey::new("repo/embargo-2", "c1").encode();
        assert!(ours.starts_with(&prefix));
        assert!(!theirs.starts_with(&prefix));
    }
}
