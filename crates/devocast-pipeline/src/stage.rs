//! The stage contract (§4.L): `(JobContext) -> Ok | RetryableError | FatalError | Cancelled`.
//!
//! A stage function takes `&mut JobContext`, does its work, and either
//! mutates `ctx.job` in place and returns `Ok(())`, or returns a
//! [`crate::error::PipelineError`]. The orchestrator reads
//! `PipelineError::is_retryable` to tell a `RetryableError` from a
//! `FatalError`, and `PipelineError::Cancelled` stands in for the
//! `Cancelled` variant directly. A stage never calls the Job Store itself;
//! [`crate::orchestrator::Orchestrator`] persists `ctx.job` once a stage
//! returns `Ok`.

use crate::context::JobContext;
use crate::error::PipelineResult;
use devocast_models::StageName;

/// Dispatch one stage by name. Each arm lives in `crate::stages`.
pub async fn dispatch(name: StageName, ctx: &mut JobContext) -> PipelineResult<()> {
    match name {
        StageName::ValidateInput => crate::stages::validate_input::run(ctx).await,
        StageName::Transcribe => crate::stages::transcribe::run(ctx).await,
        StageName::PostProcessSubtitles => crate::stages::post_process_subtitles::run(ctx).await,
        StageName::PlanQueries => crate::stages::plan_queries::run(ctx).await,
        StageName::AcquireClips => crate::stages::acquire_clips::run(ctx).await,
        StageName::ComposeBody => crate::stages::compose_body::run(ctx).await,
        StageName::ApplyIntroOutro => crate::stages::apply_intro_outro::run(ctx).await,
        StageName::PersistArtifacts => crate::stages::persist_artifacts::run(ctx).await,
        StageName::Finalize => crate::stages::finalize::run(ctx).await,
    }
}
