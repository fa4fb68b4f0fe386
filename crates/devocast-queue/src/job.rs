//! The durable queue envelope. Distinct from the Job record itself: the
//! queue only ever carries a `job_id` reference (GLOSSARY "QueueMessage").

use chrono::{DateTime, Utc};
use devocast_models::JobId;
use serde::{Deserialize, Serialize};

/// Wraps a `job_id` as it moves through the Worker Pool's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub job_id: JobId,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery_count: u32,
}

impl QueueMessage {
    pub fn new(job_id: JobId) -> Self {
        Self { job_id, enqueued_at: Utc::now(), delivery_count: 0 }
    }

    /// Deduplication key: one job is only ever enqueued once under its own id.
    pub fn idempotency_key(&self) -> String {
        self.job_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_is_the_job_id() {
        let job_id = JobId::new();
        let message = QueueMessage::new(job_id.clone());
        assert_eq!(message.idempotency_key(), job_id.to_string());
    }
}
