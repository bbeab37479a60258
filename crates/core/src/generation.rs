//! Structured cache generation identifiers.
//!
//! A generation is one versioned bucket. Buckets are compared by
//! `(namespace, version)` equality, never by matching on the rendered name,
//! so a bucket owned by an unrelated application that happens to share a
//! prefix is never mistaken for one of ours.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one cache generation (namespace + version).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationId {
    pub namespace: String,
    pub version: String,
}

impl GenerationId {
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), version: version.into() }
    }

    /// Storage bucket name for this generation.
    pub fn bucket_name(&self) -> String {
        format!("{}-{}", self.namespace, self.version)
    }

    /// True when `other` belongs to the same namespace but a different version.
    pub fn supersedes(&self, other: &GenerationId) -> bool {
        self.namespace == other.namespace && self.version != other.version
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bucket_name())
    }
}
