//! Worker error types — failures in moving a job between the queue and the
//! pipeline orchestrator. A stage failure inside the pipeline itself never
//! surfaces here: the orchestrator folds it into the job's own `Failed`
//! transition and always returns.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("queue error: {0}")]
    Queue(#[from] devocast_queue::QueueError),

    #[error("store error: {0}")]
    Store(#[from] devocast_store::StoreError),

    #[error("storage error: {0}")]
    Storage(#[from] devocast_storage::StorageError),

    #[error("client error: {0}")]
    Client(#[from] devocast_clients::ClientError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
