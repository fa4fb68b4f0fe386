//! `transcribe` (§4.L band 5-20, §4.D): audio bytes in, raw `SubtitleSegment`s out.

use devocast_models::StageName;
use tracing::info;

use crate::context::JobContext;
use crate::error::{PipelineError, PipelineResult};

/// No per-tenant language selection exists on `JobSubmission`; every talk is
/// transcribed as English.
const LANGUAGE: &str = "en";

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let audio_path = ctx
        .scratch
        .source_audio_path
        .clone()
        .ok_or_else(|| PipelineError::BadInput("validate_input did not leave a source audio file".to_string()))?;

    let bytes = tokio::fs::read(&audio_path).await.map_err(devocast_media::MediaError::Io)?;

    let segments = ctx.collaborators.transcriber.transcribe(&bytes, LANGUAGE).await?;

    info!(job_id = %ctx.job.job_id, segment_count = segments.len(), "transcribed audio");
    ctx.scratch.raw_segments = segments;
    ctx.job = ctx.job.clone().with_progress(StageName::Transcribe, 20);
    Ok(())
}
