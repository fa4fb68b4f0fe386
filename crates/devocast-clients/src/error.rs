//! Shared error type for the outbound STT/query-planner/clip-search/vision clients.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {service} timed out")]
    Timeout { service: &'static str },

    #[error("{service} is unavailable: {message}")]
    Unavailable { service: &'static str, message: String },

    #[error("{service} rejected the request: {message}")]
    Rejected { service: &'static str, message: String },

    #[error("bad input for {service}: {message}")]
    BadInput { service: &'static str, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    pub fn to_error_kind(&self) -> devocast_models::ErrorKind {
        match self {
            Self::Timeout { .. } => devocast_models::ErrorKind::UpstreamTimeout,
            Self::Unavailable { .. } => devocast_models::ErrorKind::UpstreamUnavailable,
            Self::Rejected { .. } => devocast_models::ErrorKind::UpstreamRejected,
            Self::BadInput { .. } => devocast_models::ErrorKind::BadInput,
            Self::Network(e) if e.is_timeout() => devocast_models::ErrorKind::UpstreamTimeout,
            Self::Network(_) => devocast_models::ErrorKind::UpstreamUnavailable,
        }
    }
}
