//! Worker Pool binary (§4.M).

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use devocast_queue::JobQueue;
use devocast_worker::{build_shared_collaborators, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("devocast=info".parse().unwrap()))
        .init();

    info!("starting devocast-worker");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "failed to create job queue");
            std::process::exit(1);
        }
    };

    let collaborators = match build_shared_collaborators(&config).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to build pipeline collaborators");
            std::process::exit(1);
        }
    };

    let job_repo = collaborators.job_repo.clone();
    let progress = collaborators.progress.clone();
    let orchestrator = devocast_pipeline::Orchestrator::new(collaborators);
    let executor = JobExecutor::new(config, queue, job_repo, orchestrator, progress);

    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
    });

    if let Err(e) = executor.run().await {
        error!(error = %e, "executor error");
        std::process::exit(1);
    }

    shutdown_handle.await.ok();
    info!("worker shutdown complete");
}
