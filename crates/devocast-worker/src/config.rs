//! Worker configuration (§4.M).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs this worker process runs concurrently.
    pub max_concurrent_jobs: usize,
    /// Graceful shutdown timeout once a shutdown signal arrives.
    pub shutdown_timeout: Duration,
    /// Scratch directory a fresh `work_dir` is created under per job.
    pub work_dir: String,
    /// How often the claim task scans the stream for pending messages left
    /// behind by a crashed worker's consumer (§4.M, §9).
    pub claim_interval: Duration,
    /// Minimum idle time before a pending stream message can be reclaimed.
    pub claim_min_idle: Duration,
    /// How often the heartbeat reaper scans for `Running` jobs whose
    /// `devocast-queue` heartbeat has gone stale (§4.M, §9).
    pub reap_interval: Duration,
    /// How often a running job refreshes its own heartbeat.
    pub job_heartbeat_interval: Duration,
    /// Local pool of pre-normalized clips (§4.G step 1); empty if unset.
    pub clip_pool_dir: String,
    /// Content-addressed cache of downloaded, normalized clips (§4.G step 2).
    pub clip_cache_dir: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/devocast".to_string(),
            claim_interval: Duration::from_secs(60),
            claim_min_idle: Duration::from_secs(600),
            reap_interval: Duration::from_secs(60),
            job_heartbeat_interval: Duration::from_secs(devocast_queue::HEARTBEAT_INTERVAL_SECS),
            clip_pool_dir: "/tmp/devocast/clip_pool".to_string(),
            clip_cache_dir: "/tmp/devocast/clip_cache".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_concurrent_jobs),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.shutdown_timeout.as_secs()),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(default.work_dir),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.claim_interval.as_secs()),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.claim_min_idle.as_secs()),
            ),
            reap_interval: Duration::from_secs(
                std::env::var("WORKER_REAP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.reap_interval.as_secs()),
            ),
            job_heartbeat_interval: Duration::from_secs(
                std::env::var("WORKER_HEARTBEAT_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.job_heartbeat_interval.as_secs()),
            ),
            clip_pool_dir: std::env::var("WORKER_CLIP_POOL_DIR").unwrap_or(default.clip_pool_dir),
            clip_cache_dir: std::env::var("WORKER_CLIP_CACHE_DIR").unwrap_or(default.clip_cache_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_two_job_concurrency_limit() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.job_heartbeat_interval, Duration::from_secs(devocast_queue::HEARTBEAT_INTERVAL_SECS));
    }
}
