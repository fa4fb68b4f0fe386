//! Blob Store Adapter (§3 component A).
//!
//! Puts, gets, and deletes opaque objects — source audio, rendered video,
//! subtitle files, and thumbnails — against an S3-compatible endpoint, and
//! returns a stable URL for each stored object.

pub mod client;
pub mod error;
pub mod keys;

pub use client::{BlobStoreClient, BlobStoreConfig, ObjectInfo};
pub use error::{StorageError, StorageResult};
pub use keys::{artifact_key, ArtifactKind};
