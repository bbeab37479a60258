//! Request identity keys.

use sha2::{Digest, Sha256};

use crate::request::CacheRequest;

/// Compute the storage key for a request: SHA-256 over method and URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage key for an intercepted request (fragment stripped).
pub fn request_key(request: &CacheRequest) -> String {
    compute_request_key(&request.method, &request.identity_url())
}
