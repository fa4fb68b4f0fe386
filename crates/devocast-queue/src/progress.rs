//! Progress events via Redis Pub/Sub, persisted history for recovery, worker
//! heartbeats, and a fast-poll `JobStatusCache` mirror of the Job Store
//! record so `get_job` doesn't have to round-trip to Firestore on every call.

use chrono::{DateTime, Utc};
use devocast_models::{JobId, JobStatus, StageName};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueueResult;

const HEARTBEAT_KEY_PREFIX: &str = "heartbeat:";
const PROGRESS_HISTORY_PREFIX: &str = "progress:history:";
const JOB_STATUS_PREFIX: &str = "job:status:";
const ACTIVE_JOBS_KEY: &str = "jobs:active";

/// Heartbeat TTL; a job is considered dead once its key expires without a refresh (§9).
pub const HEARTBEAT_TTL_SECS: u64 = 60;
/// How long Pub/Sub history is retained for clients that reconnect mid-job.
pub const PROGRESS_HISTORY_TTL_SECS: u64 = 3600;
/// How long the fast-poll cache entry survives after a job goes terminal.
pub const JOB_STATUS_TTL_SECS: u64 = 86400;
/// The worker writes a heartbeat this often while a job is running (§9).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;
/// The reaper promotes a `running` job back to `queued` once its heartbeat is
/// older than this (§4.M).
pub const HEARTBEAT_STALE_SECS: i64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub stage: Option<StageName>,
    pub progress: u8,
    pub message: String,
    #[serde(default = "default_timestamp")]
    pub timestamp_ms: i64,
    #[serde(default)]
    pub seq: u64,
}

fn default_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

impl ProgressEvent {
    pub fn new(job_id: JobId, stage: Option<StageName>, progress: u8, message: impl Into<String>) -> Self {
        Self { job_id, stage, progress, message: message.into(), timestamp_ms: Utc::now().timestamp_millis(), seq: 0 }
    }
}

/// Fast-poll mirror of a Job row, kept in Redis so `get_job` avoids a
/// round-trip to the Job Store on the common case of a still-running job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusCache {
    pub job_id: JobId,
    pub tenant_id: String,
    pub status: JobStatus,
    pub stage: Option<StageName>,
    pub progress: u8,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusCache {
    pub fn new(job_id: JobId, tenant_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            tenant_id: tenant_id.into(),
            status: JobStatus::Queued,
            stage: None,
            progress: 0,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_progress(&mut self, stage: StageName, progress: u8) {
        self.status = JobStatus::Running;
        self.stage = Some(stage);
        self.progress = self.progress.max(progress.min(100));
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.status = JobStatus::Succeeded;
        self.progress = 100;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, detail: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_detail = Some(detail.into());
        self.updated_at = Utc::now();
    }

    pub fn cancel(&mut self) {
        self.status = JobStatus::Cancelled;
        self.updated_at = Utc::now();
    }
}

#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        Ok(Self { client: redis::Client::open(redis_url)? })
    }

    pub fn channel_name(job_id: &JobId) -> String {
        format!("progress:{job_id}")
    }

    /// Publish with both real-time Pub/Sub delivery and persisted history.
    pub async fn publish(&self, event: &ProgressEvent) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&event.job_id);
        let history_key = format!("{PROGRESS_HISTORY_PREFIX}{}", event.job_id);
        let payload = serde_json::to_string(event)?;
        let score = event.timestamp_ms as f64;

        debug!(channel, "publishing progress event");

        redis::pipe()
            .publish(&channel, &payload)
            .ignore()
            .zadd(&history_key, &payload, score)
            .ignore()
            .expire(&history_key, PROGRESS_HISTORY_TTL_SECS as i64)
            .ignore()
            .exec_async(&mut conn)
            .await?;

        Ok(())
    }

    /// Subscribe to live progress events for a job.
    pub async fn subscribe(&self, job_id: &JobId) -> QueueResult<impl futures_util::Stream<Item = ProgressEvent>> {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(Self::channel_name(job_id)).await?;

        Ok(pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        }))
    }

    pub async fn get_history_since(&self, job_id: &JobId, since_ms: i64) -> QueueResult<Vec<ProgressEvent>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{PROGRESS_HISTORY_PREFIX}{job_id}");
        let events: Vec<String> = conn.zrangebyscore(&key, since_ms as f64, "+inf").await?;
        Ok(events.into_iter().filter_map(|s| serde_json::from_str(&s).ok()).collect())
    }

    // -- heartbeat ----------------------------------------------------------

    pub async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{HEARTBEAT_KEY_PREFIX}{job_id}");
        conn.set_ex::<_, _, ()>(&key, Utc::now().timestamp(), HEARTBEAT_TTL_SECS).await?;
        Ok(())
    }

    pub async fn get_last_heartbeat(&self, job_id: &JobId) -> QueueResult<Option<i64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{HEARTBEAT_KEY_PREFIX}{job_id}");
        Ok(conn.get(&key).await?)
    }

    pub async fn clear_heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(format!("{HEARTBEAT_KEY_PREFIX}{job_id}")).await?;
        Ok(())
    }

    /// Whether a heartbeat seen at `last_heartbeat_secs` is old enough for
    /// the reaper to promote the job back to `queued` (§4.M).
    pub fn is_stale(last_heartbeat_secs: i64) -> bool {
        Utc::now().timestamp() - last_heartbeat_secs > HEARTBEAT_STALE_SECS
    }

    // -- fast-poll job status cache ------------------------------------------

    pub async fn init_job_status(&self, job_id: &JobId, tenant_id: &str) -> QueueResult<()> {
        self.update_job_status(job_id, &JobStatusCache::new(job_id.clone(), tenant_id)).await?;
        self.add_to_active_jobs(job_id).await
    }

    pub async fn update_job_status(&self, job_id: &JobId, status: &JobStatusCache) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{JOB_STATUS_PREFIX}{job_id}");
        conn.set_ex::<_, _, ()>(&key, serde_json::to_string(status)?, JOB_STATUS_TTL_SECS).await?;
        Ok(())
    }

    pub async fn get_job_status(&self, job_id: &JobId) -> QueueResult<Option<JobStatusCache>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{JOB_STATUS_PREFIX}{job_id}");
        let value: Option<String> = conn.get(&key).await?;
        Ok(value.and_then(|s| serde_json::from_str(&s).ok()))
    }

    pub async fn finish_job_status(&self, job_id: &JobId) -> QueueResult<()> {
        self.remove_from_active_jobs(job_id).await?;
        self.clear_heartbeat(job_id).await
    }

    async fn add_to_active_jobs(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.zadd::<_, _, _, ()>(ACTIVE_JOBS_KEY, job_id.to_string(), Utc::now().timestamp_millis() as f64).await?;
        Ok(())
    }

    async fn remove_from_active_jobs(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.zrem::<_, _, ()>(ACTIVE_JOBS_KEY, job_id.to_string()).await?;
        Ok(())
    }

    /// All jobs the reaper should check for a stale heartbeat.
    pub async fn get_active_job_ids(&self) -> QueueResult<Vec<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.zrange(ACTIVE_JOBS_KEY, 0, -1).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_progress_is_monotonic() {
        let mut cache = JobStatusCache::new(JobId::new(), "tenant-1");
        cache.set_progress(StageName::Transcribe, 15);
        cache.set_progress(StageName::Transcribe, 5);
        assert_eq!(cache.progress, 15);
    }

    #[test]
    fn stale_heartbeat_is_detected_past_threshold() {
        let ten_minutes_ago = Utc::now().timestamp() - HEARTBEAT_STALE_SECS - 1;
        assert!(ProgressChannel::is_stale(ten_minutes_ago));
        assert!(!ProgressChannel::is_stale(Utc::now().timestamp()));
    }
}
