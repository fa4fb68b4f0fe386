//! Inbound Surface (§6): a thin, auth-free Axum HTTP wrapper around the four
//! operations the pipeline core requires — `submit_job`, `get_job`,
//! `cancel_job`, `regenerate_job`. The caller supplies `tenant_id`/`user_id`
//! directly; session/auth middleware is out of scope.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
