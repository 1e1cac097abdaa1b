//! The cache store abstraction shared by every backend.
//!
//! A backend holds any number of named stores. Each store maps a request
//! (method, URL, and the request headers named by the response's `Vary`)
//! to a response. Stores are created by [`CacheStorage::open`] or implicitly
//! by the first write, and only disappear through [`CacheStorage::delete`].
//!
//! Concurrent writes to the same key are not serialized: the last write wins.

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::cache::hash::compute_cache_key;
use crate::message::{Request, Response, ResponseSource, headers_from_pairs, headers_to_pairs};

/// Persistent storage of named cache stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Whether a store with this name exists.
    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Names of all stores, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and every entry in it. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up the response stored for `request`.
    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Store `response` for `request`, replacing any previous entry.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store every pair or none of them.
    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    /// URLs of the requests stored in a store.
    async fn requests(&self, name: &str) -> Result<Vec<String>, Error>;
}

/// A request/response pair in its persisted form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    /// Request header values captured for each name in the response's `Vary`.
    pub vary: Vec<(String, Option<String>)>,
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredEntry {
    /// Validate and capture a pair for storage.
    pub fn capture(request: &Request, response: &Response) -> Result<Self, Error> {
        if request.method != Method::GET {
            return Err(Error::StoreRejected(format!("{} requests cannot be cached", request.method)));
        }
        if response.status == StatusCode::PARTIAL_CONTENT {
            return Err(Error::StoreRejected("partial (206) responses cannot be cached".into()));
        }

        let vary_names = response.vary();
        if vary_names.iter().any(|name| name == "*") {
            return Err(Error::StoreRejected("responses with Vary: * cannot be cached".into()));
        }

        let vary = vary_names
            .into_iter()
            .map(|name| {
                let value = request_header(request, &name);
                (name, value)
            })
            .collect();

        let mut url = request.url.clone();
        url.set_fragment(None);

        Ok(Self {
            key_hash: compute_cache_key(request.method.as_str(), &url),
            method: request.method.as_str().to_string(),
            url: url.to_string(),
            vary,
            status_code: response.status.as_u16(),
            headers: headers_to_pairs(&response.headers),
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Whether `request` carries the same values for every varying header.
    pub fn vary_matches(&self, request: &Request) -> bool {
        self.vary.iter().all(|(name, value)| request_header(request, name) == *value)
    }

    /// Rebuild the response this entry was captured from.
    pub fn to_response(&self) -> Result<Response, Error> {
        let status = StatusCode::from_u16(self.status_code)
            .map_err(|e| Error::Serialization(format!("stored status {}: {e}", self.status_code)))?;
        Ok(Response::new(status, headers_from_pairs(&self.headers), self.body.clone(), ResponseSource::Cache))
    }
}

/// All values of a request header joined the way HTTP folds them.
fn request_header(request: &Request, name: &str) -> Option<String> {
    let values: Vec<&str> = request
        .headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() { None } else { Some(values.join(", ")) }
}
