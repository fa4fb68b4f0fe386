//! Durable FIFO job queue on Redis Streams with a consumer group, a
//! dead-letter stream, and `XPENDING`/`XCLAIM`-based reaping of messages
//! left behind by a crashed worker (§4.M, §9 "Resolved for this
//! implementation").

use std::time::Duration;

use devocast_models::JobId;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::QueueMessage;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub stream_name: String,
    pub consumer_group: String,
    pub dlq_stream_name: String,
    pub max_retries: u32,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "devocast:jobs".to_string(),
            consumer_group: "devocast:workers".to_string(),
            dlq_stream_name: "devocast:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or_else(|_| "devocast:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or_else(|_| "devocast:workers".to_string()),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM").unwrap_or_else(|_| "devocast:dlq".to_string()),
            max_retries: std::env::var("QUEUE_MAX_RETRIES").ok().and_then(|s| s.parse().ok()).unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT").ok().and_then(|s| s.parse().ok()).unwrap_or(600),
            ),
        }
    }
}

pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Create the consumer group if it doesn't already exist.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!(group = %self.config.consumer_group, "created consumer group"),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(group = %self.config.consumer_group, "consumer group already exists");
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a job for processing. Returns the stream message id.
    pub async fn enqueue(&self, job_id: &JobId) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let message = QueueMessage::new(job_id.clone());
        let payload = serde_json::to_string(&message)?;
        let idempotency_key = message.idempotency_key();

        let dedup_key = format!("devocast:dedup:{idempotency_key}");
        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!(job_id = %job_id, "duplicate enqueue rejected");
            return Err(QueueError::enqueue_failed("duplicate job"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", 3600).await?;

        info!(job_id = %job_id, message_id = %message_id, "enqueued job");
        Ok(message_id)
    }

    /// Acknowledge and remove a message after its job reaches a terminal state.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL").arg(&self.config.stream_name).arg(message_id).query_async::<()>(&mut conn).await?;

        debug!(message_id, "acknowledged message");
        Ok(())
    }

    /// Clear the dedup key, allowing the same job id to be re-enqueued (e.g.
    /// after the reaper gives up and the job is marked failed).
    pub async fn clear_dedup(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(format!("devocast:dedup:{job_id}")).await?;
        Ok(())
    }

    /// Move a message to the dead-letter stream after exhausting retries.
    pub async fn dlq(&self, message_id: &str, job_id: &JobId, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("job_id")
            .arg(job_id.to_string())
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;
        warn!(job_id = %job_id, message_id, error, "moved job to dead-letter stream");
        Ok(())
    }

    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.xlen(&self.config.stream_name).await?)
    }

    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.xlen(&self.config.dlq_stream_name).await?)
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Block for up to `block_ms` waiting for new messages, returning at most
    /// `count` of them.
    pub async fn consume(&self, consumer_name: &str, block_ms: u64, count: usize) -> QueueResult<Vec<(String, QueueMessage)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut messages = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueueMessage>(&payload_str) {
                        Ok(message) => {
                            debug!(job_id = %message.job_id, "consumed message from stream");
                            messages.push((message_id, message));
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to parse message payload, acking to drop it");
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(messages)
    }

    /// Reclaim messages idle for longer than `min_idle_ms`, left behind by a
    /// worker that crashed mid-job (§4.M, §9 reaper note).
    pub async fn claim_pending(&self, consumer_name: &str, min_idle_ms: u64, count: usize) -> QueueResult<Vec<(String, QueueMessage)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending_count: usize = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await
            .map(|reply: redis::streams::StreamPendingReply| reply.count())
            .unwrap_or(0);

        if pending_count == 0 {
            return Ok(Vec::new());
        }

        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut ids_to_claim = Vec::new();
        for detail in pending_details {
            if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Int(idle_ms))) = (detail.first(), detail.get(2)) {
                if *idle_ms as u64 >= min_idle_ms {
                    if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                        ids_to_claim.push(id);
                    }
                }
            }
        }

        if ids_to_claim.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name).arg(&self.config.consumer_group).arg(consumer_name).arg(min_idle_ms);
        for id in &ids_to_claim {
            cmd.arg(id);
        }

        let claimed: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut messages = Vec::new();
        for entry in claimed {
            let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Array(fields))) = (entry.first(), entry.get(1)) else {
                continue;
            };
            let Ok(message_id) = String::from_utf8(id_bytes.clone()) else { continue };

            let mut job_payload = None;
            let mut i = 0;
            while i + 1 < fields.len() {
                if let (Some(redis::Value::BulkString(field)), Some(redis::Value::BulkString(value))) = (fields.get(i), fields.get(i + 1)) {
                    if field.as_slice() == b"job" {
                        job_payload = String::from_utf8(value.clone()).ok();
                        break;
                    }
                }
                i += 2;
            }

            match job_payload.and_then(|p| serde_json::from_str::<QueueMessage>(&p).ok()) {
                Some(message) => {
                    info!(job_id = %message.job_id, "reclaimed pending message from crashed worker");
                    messages.push((message_id, message));
                }
                None => {
                    warn!(message_id, "failed to parse reclaimed message payload, acking to drop it");
                    self.ack(&message_id).await.ok();
                }
            }
        }

        Ok(messages)
    }

    /// Reset a message's idle timer without transferring its payload; call
    /// periodically while a job is actively being worked.
    pub async fn refresh_visibility(&self, consumer_name: &str, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _res: redis::Value = redis::cmd("XCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_ten_minute_visibility_timeout() {
        let config = QueueConfig::default();
        assert_eq!(config.visibility_timeout, Duration::from_secs(600));
        assert_eq!(config.max_retries, 3);
    }
}
