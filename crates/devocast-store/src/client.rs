//! Firestore REST API client, used as the Job Store's backing store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gcp_auth::TokenProvider;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::token_cache::TokenCache;
use crate::types::{Document, ListDocumentsResponse, Value};

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database_id: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl FirestoreConfig {
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            project_id: std::env::var("GCP_PROJECT_ID")
                .map_err(|_| StoreError::auth_error("GCP_PROJECT_ID not set"))?,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        })
    }
}

pub struct FirestoreClient {
    http: Client,
    tokens: Arc<TokenCache>,
    config: FirestoreConfig,
    base_url: String,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            tokens: Arc::clone(&self.tokens),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> StoreResult<Self> {
        let auth: Arc<dyn TokenProvider> = gcp_auth::provider()
            .await
            .map_err(|e| StoreError::auth_error(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(StoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self {
            http,
            tokens: Arc::new(TokenCache::new(auth)),
            config,
            base_url,
        })
    }

    pub async fn from_env() -> StoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    pub async fn get_document(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);
        let token = self.tokens.get_token().await?;

        let response = self.http.get(&url).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("GET {url} failed with {status}: {body}")))
            }
        }
    }

    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> StoreResult<Document> {
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let token = self.tokens.get_token().await?;
        let body = Document::new(fields);

        let response = self.http.post(&url).bearer_auth(&token).json(&body).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
            StatusCode::CONFLICT => Err(StoreError::AlreadyExists(format!("{collection}/{doc_id}"))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("POST {url} failed with {status}: {body}")))
            }
        }
    }

    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> StoreResult<Document> {
        self.update_document_with_precondition(collection, doc_id, fields, update_mask, None)
            .await
    }

    /// Update with an `updateTime` precondition so concurrent writers lose the
    /// race cleanly instead of silently clobbering each other (§5 "Locking /
    /// transactions"). Pass `None` to skip the precondition (plain merge).
    pub async fn update_document_with_precondition(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
        update_time: Option<&str>,
    ) -> StoreResult<Document> {
        let mut url = self.document_path(collection, doc_id);
        let mut params: Vec<String> = Vec::new();

        if let Some(mask) = update_mask {
            params.extend(mask.iter().map(|f| format!("updateMask.fieldPaths={f}")));
        }
        if let Some(ts) = update_time {
            params.push(format!("currentDocument.updateTime={}", urlencoding::encode(ts)));
        }
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }

        let token = self.tokens.get_token().await?;
        let body = Document::new(fields);

        let response = self.http.patch(&url).bearer_auth(&token).json(&body).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::PreconditionFailed(format!("PATCH {url} precondition failed: {body}")))
            }
            StatusCode::NOT_FOUND => Err(StoreError::not_found(format!("{collection}/{doc_id}"))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("PATCH {url} failed with {status}: {body}")))
            }
        }
    }

    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<()> {
        let url = self.document_path(collection, doc_id);
        let token = self.tokens.get_token().await?;

        let response = self.http.delete(&url).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(collection, doc_id, "document already deleted");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("DELETE {url} failed with {status}: {body}")))
            }
        }
    }

    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> StoreResult<ListDocumentsResponse> {
        let mut url = format!("{}/{}", self.base_url, collection);
        let mut params = Vec::new();
        if let Some(size) = page_size {
            params.push(format!("pageSize={size}"));
        }
        if let Some(token) = page_token {
            params.push(format!("pageToken={token}"));
        }
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }

        let token = self.tokens.get_token().await?;
        let response = self.http.get(&url).bearer_auth(&token).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::request_failed(format!("LIST {url} failed with {status}: {body}")))
            }
        }
    }

    /// Run `operation` with exponential backoff, honoring `max_retries` (§4.L).
    pub async fn with_retry<T, F, Fut>(&self, operation_name: &str, operation: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        crate::retry::with_retry(
            &crate::retry::RetryConfig {
                max_retries: self.config.max_retries,
                ..Default::default()
            },
            operation_name,
            operation,
        )
        .await
    }
}
