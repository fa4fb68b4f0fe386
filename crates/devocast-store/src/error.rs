//! Job Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    AuthError(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
}

impl StoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Network(_) | StoreError::RateLimited(_))
    }

    /// True for a failed `updateTime` precondition — the caller's CAS lost the race (§5).
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, StoreError::PreconditionFailed(_))
            || matches!(
                self,
                StoreError::RequestFailed(msg)
                if msg.contains("FAILED_PRECONDITION") || msg.contains("Precondition")
            )
    }

    /// Maps into the cross-crate `ErrorKind` at the pipeline boundary (§7).
    pub fn to_error_kind(&self) -> devocast_models::ErrorKind {
        devocast_models::ErrorKind::StorageError
    }
}
