//! Core types and shared functionality for the RailBook offline worker.
//!
//! This crate provides:
//! - Cache storage with SQLite backend, grouped into versioned generations
//! - Request and response snapshot types plus request classification
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod generation;
pub mod request;

pub use cache::{BucketInfo, CacheDb, CacheStorage, StoredKey};
pub use classify::{Classifier, RequestClass, SkipReason};
pub use config::{AppConfig, ConfigError, NavigationStore};
pub use error::Error;
pub use generation::GenerationId;
pub use request::{CacheRequest, RequestMode, ResponseSnapshot};
