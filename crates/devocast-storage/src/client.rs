//! S3-compatible Blob Store Adapter client.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the blob store client.
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    /// S3-compatible API endpoint (e.g. an R2 account endpoint).
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Public base URL returned to callers as the "stable URL" for a stored
    /// object, distinct from the API endpoint used to reach it.
    pub public_base_url: String,
    pub region: String,
}

impl BlobStoreConfig {
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("BLOB_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("BLOB_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("BLOB_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("BLOB_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("BLOB_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("BLOB_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("BLOB_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("BLOB_BUCKET_NAME not set"))?,
            public_base_url: std::env::var("BLOB_PUBLIC_BASE_URL")
                .map_err(|_| StorageError::config_error("BLOB_PUBLIC_BASE_URL not set"))?,
            region: std::env::var("BLOB_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// Blob Store Adapter (§3 component A): put/get/delete opaque objects,
/// return a stable URL for each.
#[derive(Clone)]
pub struct BlobStoreClient {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl BlobStoreClient {
    pub async fn new(config: BlobStoreConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "devocast-storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn from_env() -> StorageResult<Self> {
        Self::new(BlobStoreConfig::from_env()?).await
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Upload bytes under `key`, returning the stable URL.
    pub async fn put_bytes(&self, data: Vec<u8>, key: &str, content_type: &str) -> StorageResult<String> {
        debug!(bytes = data.len(), key, "uploading object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!(key, "uploaded object");
        Ok(self.url_for(key))
    }

    /// Upload a local file under `key`, returning the stable URL.
    pub async fn put_file(&self, path: impl AsRef<Path>, key: &str, content_type: &str) -> StorageResult<String> {
        let path = path.as_ref();
        debug!(path = %path.display(), key, "uploading file");

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!(path = %path.display(), key, "uploaded file");
        Ok(self.url_for(key))
    }

    /// Download an object's bytes by key.
    pub async fn get_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!(key, "downloading object");

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Download an object to a local file, creating parent directories as needed.
    pub async fn get_to_file(&self, key: &str, path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        let bytes = self.get_bytes(key).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;

        info!(key, path = %path.display(), "downloaded object to file");
        Ok(())
    }

    /// Delete an object by key. Idempotent: deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        debug!(key, "deleting object");

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    /// Head-bucket connectivity check, used by the worker's startup health check.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("blob store connectivity check failed: {e}")))?;
        Ok(())
    }
}

/// Metadata about a stored object, returned by listing operations.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<u64>,
}
