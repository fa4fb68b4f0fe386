//! Job executor (§4.M): pull job ids off the queue, run each through the
//! pipeline orchestrator, and ack once it reaches a terminal state.

use std::sync::Arc;
use std::time::Duration;

use devocast_pipeline::Orchestrator;
use devocast_queue::JobQueue;
use devocast_store::JobRepository;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::reaper;

pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    job_repo: JobRepository,
    orchestrator: Arc<Orchestrator>,
    progress: devocast_queue::ProgressChannel,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(
        config: WorkerConfig,
        queue: JobQueue,
        job_repo: JobRepository,
        orchestrator: Orchestrator,
        progress: devocast_queue::ProgressChannel,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            job_repo,
            orchestrator: Arc::new(orchestrator),
            progress,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    pub async fn run(&self) -> WorkerResult<()> {
        info!(consumer = %self.consumer_name, max_concurrent_jobs = self.config.max_concurrent_jobs, "starting job executor");

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        let claim_task = tokio::spawn(Self::claim_loop(
            Arc::clone(&self.queue),
            self.job_repo.clone(),
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.job_semaphore),
            self.progress.clone(),
            self.consumer_name.clone(),
            self.config.clone(),
            self.shutdown.subscribe(),
        ));

        let reap_task = tokio::spawn(reaper::run(
            self.job_repo.clone(),
            self.progress.clone(),
            Arc::clone(&self.queue),
            self.config.reap_interval,
            self.shutdown.subscribe(),
        ));

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!(error = %e, "error consuming jobs");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();
        reap_task.abort();

        info!("waiting for in-flight jobs to complete");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("job executor stopped");
        Ok(())
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let messages = self.queue.consume(&self.consumer_name, 1000, available.min(5)).await?;
        if messages.is_empty() {
            return Ok(());
        }
        debug!(count = messages.len(), "consumed messages from queue");

        for (message_id, message) in messages {
            let queue = Arc::clone(&self.queue);
            let job_repo = self.job_repo.clone();
            let orchestrator = Arc::clone(&self.orchestrator);
            let progress = self.progress.clone();
            let heartbeat_interval = self.config.job_heartbeat_interval;
            let work_dir = std::path::PathBuf::from(&self.config.work_dir).join(message.job_id.as_str());
            let permit = self.job_semaphore.clone().acquire_owned().await.expect("semaphore never closes");

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(orchestrator, job_repo, queue, progress, heartbeat_interval, message_id, message, work_dir).await;
            });
        }

        Ok(())
    }

    async fn claim_loop(
        queue: Arc<JobQueue>,
        job_repo: JobRepository,
        orchestrator: Arc<Orchestrator>,
        semaphore: Arc<Semaphore>,
        progress: devocast_queue::ProgressChannel,
        consumer_name: String,
        config: WorkerConfig,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut interval = tokio::time::interval(config.claim_interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    match queue.claim_pending(&consumer_name, config.claim_min_idle.as_millis() as u64, 5).await {
                        Ok(messages) if !messages.is_empty() => {
                            info!(count = messages.len(), "reclaimed pending messages from a crashed worker");
                            for (message_id, message) in messages {
                                let Ok(permit) = semaphore.clone().acquire_owned().await else { break };
                                let queue = Arc::clone(&queue);
                                let job_repo = job_repo.clone();
                                let orchestrator = Arc::clone(&orchestrator);
                                let progress = progress.clone();
                                let work_dir = std::path::PathBuf::from(&config.work_dir).join(message.job_id.as_str());
                                let heartbeat_interval = config.job_heartbeat_interval;
                                tokio::spawn(async move {
                                    let _permit = permit;
                                    Self::execute_job(orchestrator, job_repo, queue, progress, heartbeat_interval, message_id, message, work_dir).await;
                                });
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "failed to claim pending messages"),
                    }
                }
            }
        }
    }

    /// Run one job's pipeline to completion and settle the queue message.
    /// The orchestrator never returns an error — it always leaves the job in
    /// a terminal state before returning — so this only has queue-level
    /// bookkeeping to do once it's done.
    async fn execute_job(
        orchestrator: Arc<Orchestrator>,
        job_repo: JobRepository,
        queue: Arc<JobQueue>,
        progress: devocast_queue::ProgressChannel,
        heartbeat_interval: Duration,
        message_id: String,
        message: devocast_queue::QueueMessage,
        work_dir: std::path::PathBuf,
    ) {
        let job_id = message.job_id.clone();

        let fetched = match job_repo.get_with_update_time(&job_id).await {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                warn!(job_id = %job_id, "queued job has no Job Store record, dropping message");
                let _ = queue.ack(&message_id).await;
                return;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "failed to load job, leaving message for redelivery");
                return;
            }
        };
        let (job, update_time) = fetched;

        if job.is_terminal() {
            debug!(job_id = %job_id, "job already terminal, acking stale message");
            let _ = queue.ack(&message_id).await;
            let _ = queue.clear_dedup(&job_id).await;
            return;
        }

        if let Err(e) = tokio::fs::create_dir_all(&work_dir).await {
            error!(job_id = %job_id, error = %e, "failed to create job work directory, leaving message for redelivery");
            return;
        }

        if let Err(e) = progress.init_job_status(&job_id, &job.tenant_id).await {
            warn!(job_id = %job_id, error = %e, "failed to record active job status");
        }

        let heartbeat_progress = progress.clone();
        let heartbeat_job_id = job_id.clone();
        let heartbeat_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = heartbeat_progress.heartbeat(&heartbeat_job_id).await {
                    warn!(job_id = %heartbeat_job_id, error = %e, "failed to refresh job heartbeat");
                }
            }
        });

        info!(job_id = %job_id, "running pipeline");
        orchestrator.run(job, update_time, work_dir).await;

        heartbeat_task.abort();
        let _ = progress.finish_job_status(&job_id).await;

        if let Err(e) = queue.ack(&message_id).await {
            error!(job_id = %job_id, error = %e, "failed to ack completed job message");
        }
        if let Err(e) = queue.clear_dedup(&job_id).await {
            warn!(job_id = %job_id, error = %e, "failed to clear dedup key");
        }
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
