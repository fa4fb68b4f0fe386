//! Job Store: a Firestore REST client plus typed repositories for jobs,
//! subtitle segments, thumbnail layouts, clip-dedup history, the clip
//! blacklist, and per-tenant word replacement dictionaries.
//!
//! ## Modules
//! - `client` - Firestore REST API client with CAS-aware document updates
//! - `token_cache` - thread-safe OAuth access token caching
//! - `retry` - retry policy with exponential backoff and jitter
//! - `metrics` - Prometheus metrics collection
//! - `repos` - typed repositories
//! - `types` - Firestore document wire types and value conversions

pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{StoreError, StoreResult};
pub use repos::{
    BlacklistRepository, JobRepository, LayoutRepository, ReplacementDictionaryRepository,
    SubtitleRepository, UsedClipRepository,
};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
