//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use devocast_models::ErrorKind;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an FFprobe failure error.
    pub fn ffprobe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FfprobeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Map this error onto the cross-crate taxonomy the pipeline orchestrator
    /// dispatches retry/terminal behavior on.
    pub fn to_error_kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::UpstreamTimeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::FfmpegNotFound
            | Self::FfprobeNotFound
            | Self::FfmpegFailed { .. }
            | Self::FfprobeFailed { .. }
            | Self::InvalidTimestamp(_)
            | Self::FileNotFound(_)
            | Self::Io(_)
            | Self::JsonParse(_)
            | Self::InvalidVideo(_)
            | Self::UnsupportedFormat(_)
            | Self::Internal(_) => ErrorKind::InternalMediaError,
        }
    }
}
