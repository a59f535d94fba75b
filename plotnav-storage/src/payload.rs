//! Gzip payload codec for summary documents.
//!
//! Cache entries are gzip-compressed UTF-8 JSON. The codec is deliberately
//! strict on the read side: a payload that does not decompress to valid
//! summary JSON is a corrupt entry, reported as [`StoreError::Payload`].

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use plotnav_core::{StoreError, Summary};

/// Serialize and gzip-compress a summary for storage.
pub fn encode_summary(summary: &Summary) -> Result<Vec<u8>, StoreError> {
    let json = serde_json::to_vec(summary).map_err(|e| StoreError::Payload {
        reason: format!("serialize: {e}"),
    })?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(|e| StoreError::Payload {
        reason: format!("compress: {e}"),
    })?;
    encoder.finish().map_err(|e| StoreError::Payload {
        reason: format!("compress: {e}"),
    })
}

/// Decompress and deserialize a stored summary payload.
pub fn decode_summary(payload: &[u8]) -> Result<Summary, StoreError> {
    let mut decoder = GzDecoder::new(payload);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| StoreError::Payload {
            reason: format!("decompress: {e}"),
        })?;
    serde_json::from_slice(&json).map_err(|e| StoreError::Payload {
        reason: format!("deserialize: {e}"),
    })
}
