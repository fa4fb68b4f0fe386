//! The cross-crate error taxonomy (§7).
//!
//! `ErrorKind` is the stable, machine-readable tag stored on a failed/cancelled
//! `Job`. Every crate below the orchestrator defines its own `thiserror` error
//! type; `devocast-pipeline` is the only place that converts those into an
//! `ErrorKind` at the stage boundary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    QuotaExceeded,
    BadInput,
    UpstreamTimeout,
    UpstreamUnavailable,
    UpstreamRejected,
    /// All candidates rejected, relaxation exhausted (§4.G).
    ContentFiltered,
    InternalMediaError,
    StorageError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota_exceeded",
            Self::BadInput => "bad_input",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamRejected => "upstream_rejected",
            Self::ContentFiltered => "content_filtered",
            Self::InternalMediaError => "internal_media_error",
            Self::StorageError => "storage_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a stage returning this kind should be retried per policy (§7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout | Self::UpstreamUnavailable | Self::StorageError
        )
    }

    /// `BadInput`/`QuotaExceeded`/`Cancelled` are fatal immediately (§7).
    pub fn is_immediately_fatal(&self) -> bool {
        matches!(self, Self::BadInput | Self::QuotaExceeded | Self::Cancelled)
    }

    /// A human-readable, localization-ready message for the inbound surface.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "You have no weekly credits remaining.",
            Self::BadInput => "The submitted audio could not be processed.",
            Self::UpstreamTimeout => "A dependent service took too long to respond.",
            Self::UpstreamUnavailable => "A dependent service is temporarily unavailable.",
            Self::UpstreamRejected => "A dependent service rejected the request.",
            Self::ContentFiltered => "No suitable background clips could be found for this talk.",
            Self::InternalMediaError => "Video composition failed.",
            Self::StorageError => "A storage operation failed.",
            Self::Cancelled => "The job was cancelled.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_and_fatal_kinds_are_disjoint() {
        for kind in [
            ErrorKind::QuotaExceeded,
            ErrorKind::BadInput,
            ErrorKind::UpstreamTimeout,
            ErrorKind::UpstreamUnavailable,
            ErrorKind::UpstreamRejected,
            ErrorKind::ContentFiltered,
            ErrorKind::InternalMediaError,
            ErrorKind::StorageError,
            ErrorKind::Cancelled,
        ] {
            assert!(!(kind.is_retryable() && kind.is_immediately_fatal()));
        }
    }
}
