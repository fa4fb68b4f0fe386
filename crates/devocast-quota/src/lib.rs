//! Quota Ledger: hold/commit/release on a tenant's weekly credit counter (§4.N).
//!
//! `validate_input` calls [`QuotaRepository::check_and_hold`] before a job
//! runs; `finalize` calls [`QuotaRepository::commit`] on success; any
//! failure or cancellation calls [`QuotaRepository::release`].

pub mod error;
pub mod repo;

pub use error::{QuotaError, QuotaResult};
pub use repo::QuotaRepository;
