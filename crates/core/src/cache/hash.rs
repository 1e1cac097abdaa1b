//! Cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the entry key for a request within a cache store.
///
/// Fragments never take part in matching, so they are stripped first.
pub fn compute_cache_key(method: &str, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
