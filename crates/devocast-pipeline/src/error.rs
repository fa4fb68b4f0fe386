//! The orchestrator's own error type. Every crate below it speaks its own
//! `thiserror` enum; this is the one place those get folded into the
//! cross-crate `ErrorKind` taxonomy (§7).

use devocast_models::ErrorKind;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Media(#[from] devocast_media::MediaError),

    #[error(transparent)]
    Storage(#[from] devocast_storage::StorageError),

    #[error(transparent)]
    Store(#[from] devocast_store::StoreError),

    #[error(transparent)]
    Quota(#[from] devocast_quota::QuotaError),

    #[error(transparent)]
    Client(#[from] devocast_clients::ClientError),

    #[error(transparent)]
    Queue(#[from] devocast_queue::QueueError),

    #[error("no clip found for slot {slot_index} after relaxation ({attempted} queries tried)")]
    ContentFiltered { slot_index: u32, attempted: u32 },

    #[error("too few clips accepted for slot {slot_index}")]
    TooFewClips { slot_index: u32 },

    #[error("{0}")]
    BadInput(String),

    #[error("job was cancelled")]
    Cancelled,

    #[error("stage timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("fetching {url} failed: {message}")]
    Fetch { url: String, message: String },
}

impl PipelineError {
    pub fn to_error_kind(&self) -> ErrorKind {
        match self {
            Self::Media(e) => e.to_error_kind(),
            Self::Storage(e) => e.to_error_kind(),
            Self::Store(e) => e.to_error_kind(),
            Self::Quota(e) => e.to_error_kind(),
            Self::Client(e) => e.to_error_kind(),
            Self::Queue(e) => e.to_error_kind(),
            Self::ContentFiltered { .. } => ErrorKind::ContentFiltered,
            Self::TooFewClips { .. } => ErrorKind::UpstreamUnavailable,
            Self::BadInput(_) => ErrorKind::BadInput,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout(_) => ErrorKind::UpstreamTimeout,
            Self::Fetch { .. } => ErrorKind::UpstreamUnavailable,
        }
    }

    /// Whether a stage returning this error should be retried, per the
    /// kind's retry policy plus the two pipeline-local kinds that behave
    /// like a transient upstream condition (§4.G step 4, §7).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TooFewClips { .. }) || self.to_error_kind().is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_clips_is_retryable_but_not_a_retryable_error_kind() {
        let err = PipelineError::TooFewClips { slot_index: 3 };
        assert!(err.is_retryable());
        assert_eq!(err.to_error_kind(), ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn content_filtered_is_fatal() {
        let err = PipelineError::ContentFiltered { slot_index: 1, attempted: 3 };
        assert!(!err.is_retryable());
    }
}
