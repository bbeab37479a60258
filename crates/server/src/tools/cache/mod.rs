//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and maintaining cache buckets.

pub mod get;
pub mod keys;
pub mod purge;
pub mod trim;

pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};
pub use purge::{CachePurgeParams, purge_impl};
pub use trim::{CacheTrimParams, trim_impl};
