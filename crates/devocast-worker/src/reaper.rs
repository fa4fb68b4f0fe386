//! Heartbeat-based reaper (§4.M, §9 "Worker reaper vs. heartbeat"): promotes
//! a `Running` job back to `Queued` once its `devocast-queue` heartbeat has
//! gone stale, independent of `JobQueue::claim_pending`'s stream-level
//! idle-time reaping of messages a crashed worker's consumer never acked.
//! The heartbeat is the reliable liveness signal; the stream-level mechanism
//! is a backstop for the case where the consumer group itself gets stuck.

use std::sync::Arc;
use std::time::Duration;

use devocast_models::JobStatus;
use devocast_queue::{JobQueue, ProgressChannel};
use devocast_store::JobRepository;
use tracing::{info, warn};

pub async fn run(
    job_repo: JobRepository,
    progress: ProgressChannel,
    queue: Arc<JobQueue>,
    interval: Duration,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep(&job_repo, &progress, &queue).await {
                    warn!(error = %e, "heartbeat reaper sweep failed");
                }
            }
        }
    }
}

async fn sweep(job_repo: &JobRepository, progress: &ProgressChannel, queue: &JobQueue) -> devocast_queue::QueueResult<()> {
    let active_ids = progress.get_active_job_ids().await?;
    for id in active_ids {
        let job_id = devocast_models::JobId::from_string(id);
        let Some(last_heartbeat) = progress.get_last_heartbeat(&job_id).await? else {
            continue;
        };
        if !ProgressChannel::is_stale(last_heartbeat) {
            continue;
        }

        let Ok(Some((job, update_time))) = job_repo.get_with_update_time(&job_id).await else {
            continue;
        };
        if job.status != JobStatus::Running {
            let _ = progress.finish_job_status(&job_id).await;
            continue;
        }

        warn!(job_id = %job_id, "job heartbeat stale, requeueing");
        let mut requeued = job;
        requeued.status = JobStatus::Queued;
        requeued.stage = None;
        if job_repo.save_with_precondition(&requeued, update_time.as_deref()).await.is_ok() {
            if let Err(e) = queue.enqueue(&job_id).await {
                warn!(job_id = %job_id, error = %e, "failed to re-enqueue stale job");
            } else {
                info!(job_id = %job_id, "requeued stale job for another worker");
            }
        }
        let _ = progress.finish_job_status(&job_id).await;
    }
    Ok(())
}
