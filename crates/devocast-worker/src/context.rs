//! Builds the shared [`devocast_pipeline::Collaborators`] bundle once per
//! worker process from environment configuration (§4.O).

use std::sync::Arc;

use devocast_clients::{ClipSearchClient, QueryPlannerClient, TranscriberClient, VisionModeratorClient};
use devocast_pipeline::Collaborators;
use devocast_quota::QuotaRepository;
use devocast_storage::{BlobStoreClient, BlobStoreConfig};
use devocast_store::{
    BlacklistRepository, FirestoreClient, FirestoreConfig, JobRepository, LayoutRepository,
    ReplacementDictionaryRepository, SubtitleRepository, UsedClipRepository,
};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// Build every collaborator the pipeline needs from environment variables,
/// sharing one `FirestoreClient` across all Job Store repositories.
pub async fn build_collaborators(config: &WorkerConfig) -> WorkerResult<Collaborators> {
    let firestore = FirestoreClient::new(FirestoreConfig::from_env()?).await?;

    let blob_store = BlobStoreClient::new(BlobStoreConfig::from_env()?).await?;

    tokio::fs::create_dir_all(&config.clip_pool_dir).await?;
    tokio::fs::create_dir_all(&config.clip_cache_dir).await?;

    Ok(Collaborators {
        job_repo: JobRepository::new(firestore.clone()),
        blacklist_repo: BlacklistRepository::new(firestore.clone()),
        used_clip_repo: UsedClipRepository::new(firestore.clone()),
        layout_repo: LayoutRepository::new(firestore.clone()),
        subtitle_repo: SubtitleRepository::new(firestore.clone()),
        replacement_repo: ReplacementDictionaryRepository::new(firestore.clone()),
        quota_repo: QuotaRepository::new(firestore),
        blob_store,
        transcriber: TranscriberClient::from_env()?,
        query_planner: QueryPlannerClient::from_env()?,
        clip_search: ClipSearchClient::from_env()?,
        vision_moderator: VisionModeratorClient::from_env()?,
        progress: devocast_queue::ProgressChannel::new(&devocast_queue::QueueConfig::from_env().redis_url)?,
        clip_pool_dir: config.clip_pool_dir.clone().into(),
        clip_cache_dir: config.clip_cache_dir.clone().into(),
    })
}

pub async fn build_shared_collaborators(config: &WorkerConfig) -> WorkerResult<Arc<Collaborators>> {
    Ok(Arc::new(build_collaborators(config).await?))
}
