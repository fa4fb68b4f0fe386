//! Durable job queue (§4.M): Redis Streams with a consumer group and
//! dead-letter stream for the `job_id` envelope, plus a Pub/Sub progress
//! channel, worker heartbeats, and a fast-poll job status mirror.

pub mod error;
pub mod job;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::QueueMessage;
pub use progress::{
    JobStatusCache, ProgressChannel, ProgressEvent, HEARTBEAT_INTERVAL_SECS, HEARTBEAT_STALE_SECS,
    HEARTBEAT_TTL_SECS, JOB_STATUS_TTL_SECS, PROGRESS_HISTORY_TTL_SECS,
};
pub use queue::{JobQueue, QueueConfig};
