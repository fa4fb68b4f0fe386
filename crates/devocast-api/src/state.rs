//! Application state.

use std::sync::Arc;

use devocast_queue::JobQueue;
use devocast_quota::QuotaRepository;
use devocast_store::{FirestoreClient, FirestoreConfig, JobRepository};

use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub job_repo: JobRepository,
    pub quota_repo: QuotaRepository,
    pub queue: Arc<JobQueue>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let firestore = FirestoreClient::new(FirestoreConfig::from_env()?).await?;
        let queue = JobQueue::from_env()?;

        Ok(Self {
            config,
            job_repo: JobRepository::new(firestore.clone()),
            quota_repo: QuotaRepository::new(firestore),
            queue: Arc::new(queue),
        })
    }
}
