//! Pipeline Orchestrator: turns a queued `Job` into a rendered, persisted
//! devotional video by running the nine stages in `stages/` in order (§4.L).

pub mod clip_source;
pub mod context;
pub mod download;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod stage;
pub mod stages;

pub use context::{Collaborators, JobContext, Scratch};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Orchestrator;

/// Quota units a single job consumes. The quota ledger (§4.N) tracks a flat
/// per-period allowance with no stated per-job weighting, so every job costs
/// the same unit.
pub const JOB_COST: u32 = 1;

/// Boundary behaviors (§8): audio shorter than this is rejected as bad input.
pub const MIN_AUDIO_DURATION_SECONDS: f64 = 2.0;

/// Boundary behaviors (§8): audio longer than this is rejected as bad input.
pub const MAX_AUDIO_DURATION_SECONDS: f64 = 1800.0;
