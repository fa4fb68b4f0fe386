//! Stage sequencing (§4.L): run the nine stages in order, retrying each one
//! per its own policy, persisting the job after every successful stage, and
//! tearing down the quota hold on any terminal outcome that isn't a success.

use std::sync::Arc;
use std::time::Duration;

use devocast_models::{ErrorKind, Job, JobStatus, StageName};
use tracing::{error, info, warn};

use crate::context::{Collaborators, JobContext};
use crate::error::{PipelineError, PipelineResult};
use crate::retry::RetryConfig;
use crate::stage;

/// Hard wall-clock ceiling for one job run, independent of any per-stage
/// timeout (§5 "a job that has not reached a terminal state within 45
/// minutes of `started_at` is failed outright").
pub const JOB_DEADLINE: Duration = Duration::from_secs(45 * 60);

pub struct Orchestrator {
    collaborators: Arc<Collaborators>,
}

impl Orchestrator {
    pub fn new(collaborators: Arc<Collaborators>) -> Self {
        Self { collaborators }
    }

    /// Run a freshly claimed job from `queued` (or a stage partway through,
    /// on worker restart) through to a terminal state. Never returns an
    /// error: every failure is folded into the job's own `Failed`/`Cancelled`
    /// transition and persisted before this returns.
    pub async fn run(&self, job: Job, update_time: Option<String>, work_dir: std::path::PathBuf) {
        let job_id = job.job_id.clone();
        let tenant_id = job.tenant_id.clone();
        let deadline = tokio::time::Instant::now() + JOB_DEADLINE;

        let mut ctx = JobContext::new(job, update_time, work_dir.clone(), self.collaborators.clone());
        ctx.job = ctx.job.clone().start();
        if let Err(e) = self.persist(&mut ctx).await {
            error!(job_id = %job_id, error = %e, "failed to persist running transition, abandoning job");
            return;
        }

        let outcome = self.run_stages(&mut ctx, deadline).await;

        match outcome {
            Ok(()) => {
                info!(job_id = %job_id, "pipeline completed successfully");
            }
            Err(e) => {
                let kind = e.to_error_kind();
                warn!(job_id = %job_id, error = %e, ?kind, "pipeline failed");
                // The hold is only released by `finalize` on success; every
                // other terminal path, cancellation included, must release it
                // here so it doesn't linger until the quota period rolls over.
                if let Err(release_err) =
                    self.collaborators.quota_repo.release(&tenant_id, job_id.as_str()).await
                {
                    error!(job_id = %job_id, error = %release_err, "failed to release quota hold after job failure");
                }
                ctx.job = if matches!(kind, ErrorKind::Cancelled) {
                    ctx.job.clone().cancel()
                } else {
                    ctx.job.clone().fail(kind, e.to_string())
                };
                if let Err(persist_err) = self.persist(&mut ctx).await {
                    error!(job_id = %job_id, error = %persist_err, "failed to persist terminal job state");
                }
            }
        }

        let _ = tokio::fs::remove_dir_all(&work_dir).await;
    }

    async fn run_stages(&self, ctx: &mut JobContext, deadline: tokio::time::Instant) -> PipelineResult<()> {
        let mut stage_name = StageName::ValidateInput;
        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(PipelineError::Timeout(JOB_DEADLINE));
            }
            if ctx.cancel_requested().await.unwrap_or(false) {
                return Err(PipelineError::Cancelled);
            }

            self.run_stage_with_retry(stage_name, ctx).await?;
            self.persist(ctx).await?;

            match stage_name.next() {
                Some(next) => stage_name = next,
                None => return Ok(()),
            }
        }
    }

    /// Run one stage, retrying on a retryable error up to its own
    /// `max_attempts`, and enforcing its own wall-clock timeout per attempt
    /// (§4.L "stage timeout", "on exhausting retries the last error is fatal").
    async fn run_stage_with_retry(&self, stage_name: StageName, ctx: &mut JobContext) -> PipelineResult<()> {
        let config = RetryConfig::for_stage(stage_name);
        let mut attempt = 0u32;
        loop {
            let result = tokio::time::timeout(stage_name.timeout(), stage::dispatch(stage_name, ctx))
                .await
                .unwrap_or(Err(PipelineError::Timeout(stage_name.timeout())));

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        job_id = %ctx.job.job_id,
                        stage = stage_name.as_str(),
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "stage attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Persist the job via the CAS precondition, updating `ctx.update_time`
    /// from the response so the next write's precondition stays current.
    async fn persist(&self, ctx: &mut JobContext) -> PipelineResult<()> {
        let doc = self
            .collaborators
            .job_repo
            .save_with_precondition(&ctx.job, ctx.update_time.as_deref())
            .await?;
        ctx.update_time = doc.update_time;

        let event = devocast_queue::ProgressEvent::new(
            ctx.job.job_id.clone(),
            ctx.job.stage,
            ctx.job.progress,
            match ctx.job.status {
                JobStatus::Succeeded => "succeeded".to_string(),
                JobStatus::Failed => ctx.job.error_detail.clone().unwrap_or_else(|| "failed".to_string()),
                JobStatus::Cancelled => "cancelled".to_string(),
                _ => ctx.job.stage.map(|s| s.as_str().to_string()).unwrap_or_default(),
            },
        );
        if let Err(e) = self.collaborators.progress.publish(&event).await {
            warn!(job_id = %ctx.job.job_id, error = %e, "failed to publish progress event");
        }
        Ok(())
    }
}
