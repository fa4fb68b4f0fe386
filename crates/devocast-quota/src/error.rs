//! Quota Ledger error types.

use thiserror::Error;

pub type QuotaResult<T> = Result<T, QuotaError>;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("tenant {tenant_id} has no quota record")]
    TenantNotFound { tenant_id: String },

    #[error("tenant {tenant_id} requested {requested} credits but only {available} are available")]
    Exceeded {
        tenant_id: String,
        requested: u32,
        available: u32,
    },

    #[error("quota operation lost the optimistic-concurrency race {retries} times in a row")]
    RetriesExhausted { retries: u32 },

    #[error(transparent)]
    Store(#[from] devocast_store::StoreError),
}

impl QuotaError {
    /// Maps into the cross-crate `ErrorKind` at the pipeline boundary (§7).
    /// Exhausting CAS retries is a transient storage condition, not a real
    /// `QuotaExceeded` — only an actual insufficient-balance check is (§4.N).
    pub fn to_error_kind(&self) -> devocast_models::ErrorKind {
        match self {
            Self::Exceeded { .. } => devocast_models::ErrorKind::QuotaExceeded,
            Self::TenantNotFound { .. } => devocast_models::ErrorKind::BadInput,
            Self::RetriesExhausted { .. } => devocast_models::ErrorKind::StorageError,
            Self::Store(e) => e.to_error_kind(),
        }
    }
}
