//! S3-compatible object store backend.
//!
//! Speaks plain HTTP to an S3-compatible endpoint (bucket-in-path, optional
//! bearer token), which is how the cache bucket is fronted in deployment.
//! Listing uses ListObjectsV2 (`list-type=2`) and follows
//! `NextContinuationToken` across pages; only the handful of response
//! fields the cache needs are extracted from each page.

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use once_cell::sync::Lazy;
use plotnav_core::StoreError;
use regex::Regex;

use crate::store::{CacheStore, ObjectEntry, StoreResult};

static CONTENTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<Contents>(.*?)</Contents>").unwrap());
static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<Key>(.*?)</Key>").unwrap());
static LAST_MODIFIED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<LastModified>(.*?)</LastModified>").unwrap());
static IS_TRUNCATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<IsTruncated>(true|false)</IsTruncated>").unwrap());
static NEXT_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<NextContinuationToken>(.*?)</NextContinuationToken>").unwrap());

/// [`CacheStore`] backed by an S3-compatible HTTP object service.
#[derive(Debug, Clone)]
pub struct S3Store {
    endpoint: String,
    bucket: String,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl S3Store {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            bearer_token: None,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.is_empty());
        self
    }

    fn bucket_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }

    /// Object URL with each key segment re-escaped, so the percent signs
    /// inside an encoded cache key survive the server's URL decoding.
    fn object_url(&self, key: &str) -> String {
        let escaped: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.bucket_url(), escaped.join("/"))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn transport_error(operation: &str, err: &reqwest::Error) -> StoreError {
        StoreError::Unavailable {
            reason: format!("{operation}: {err}"),
        }
    }

    fn status_error(operation: &str, key: &str, status: reqwest::StatusCode) -> StoreError {
        StoreError::Unavailable {
            reason: format!("{operation} {key:?} returned HTTP {status}"),
        }
    }
}

#[async_trait]
impl CacheStore for S3Store {
    async fn put(&self, key: &str, payload: Vec<u8>) -> StoreResult<()> {
        let response = self
            .authorize(self.client.put(self.object_url(key)))
            .body(payload)
            .send()
            .await
            .map_err(|e| Self::transport_error("put", &e))?;
        if !response.status().is_success() {
            return Err(Self::status_error("put", key, response.status()));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let response = self
            .authorize(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| Self::transport_error("get", &e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error("get", key, response.status()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error("get", &e))?;
        Ok(Some(bytes.to_vec()))
    }

    fn list_prefix(&self, prefix: String) -> BoxStream<'_, StoreResult<ObjectEntry>> {
        Box::pin(try_stream! {
            let mut token: Option<String> = None;
            loop {
                let mut request = self
                    .authorize(self.client.get(self.bucket_url()))
                    .query(&[("list-type", "2"), ("prefix", prefix.as_str())]);
                if let Some(token) = &token {
                    request = request.query(&[("continuation-token", token.as_str())]);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|e| Self::transport_error("list", &e))
                    .and_then(|response| {
                        if response.status().is_success() {
                            Ok(response)
                        } else {
                            Err(Self::status_error("list", &prefix, response.status()))
                        }
                    })?;
                let body = response
                    .text()
                    .await
                    .map_err(|e| Self::transport_error("list", &e))?;

                let page = parse_list_page(&body)?;
                tracing::debug!(
                    prefix = %prefix,
                    entries = page.entries.len(),
                    truncated = page.next_token.is_some(),
                    "Listed object page"
                );
                for entry in page.entries {
                    yield entry;
                }
                match page.next_token {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let response = self
            .authorize(self.client.delete(self.object_url(key)))
            .send()
            .await
            .map_err(|e| Self::transport_error("delete", &e))?;
        // Deleting an absent key is idempotent success.
        if response.status() == reqwest::StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(Self::status_error("delete", key, response.status()))
    }
}

#[derive(Debug)]
struct ListPage {
    entries: Vec<ObjectEntry>,
    next_token: Option<String>,
}

fn parse_list_page(xml: &str) -> Result<ListPage, StoreError> {
    let mut entries = Vec::new();
    for contents in CONTENTS_RE.captures_iter(xml) {
        let block = &contents[1];
        let key = KEY_RE
            .captures(block)
            .map(|c| xml_unescape(&c[1]))
            .ok_or_else(|| StoreError::Unavailable {
                reason: "listing entry without <Key>".to_string(),
            })?;
        let last_modified = LAST_MODIFIED_RE
            .captures(block)
            .and_then(|c| DateTime::parse_from_rfc3339(&c[1]).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| StoreError::Unavailable {
                reason: format!("listing entry {key:?} without a valid <LastModified>"),
            })?;
        entries.push(ObjectEntry { key, last_modified });
    }

    let truncated = IS_TRUNCATED_RE
        .captures(xml)
        .is_some_and(|c| &c[1] == "true");
    let next_token = if truncated {
        let token = NEXT_TOKEN_RE
            .captures(xml)
            .map(|c| xml_unescape(&c[1]))
            .ok_or_else(|| StoreError::Unavailable {
                reason: "truncated listing without <NextContinuationToken>".to_string(),
            })?;
        Some(token)
    } else {
        None
    };

    Ok(ListPage {
        entries,
        next_token,
    })
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
