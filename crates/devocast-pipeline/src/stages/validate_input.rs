//! `validate_input` (§4.L band 0-5): normalize inputs, place the quota hold.

use devocast_models::StageName;
use tracing::info;

use crate::context::JobContext;
use crate::error::{PipelineError, PipelineResult};
use crate::{MAX_AUDIO_DURATION_SECONDS, MIN_AUDIO_DURATION_SECONDS};

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let audio_path = ctx.scratch_path("source_audio");
    let (bytes, content_type) =
        crate::download::fetch_with_content_type(&ctx.job.audio_blob_url, std::time::Duration::from_secs(120)).await?;

    devocast_clients::TranscriberClient::validate_content_type(&content_type)
        .map_err(crate::error::PipelineError::Client)?;

    tokio::fs::write(&audio_path, &bytes).await.map_err(devocast_media::MediaError::Io)?;
    ctx.scratch.source_audio_path = Some(audio_path.clone());

    let duration = devocast_media::get_duration(&audio_path).await?;
    if !(MIN_AUDIO_DURATION_SECONDS..=MAX_AUDIO_DURATION_SECONDS).contains(&duration) {
        return Err(PipelineError::BadInput(format!(
            "audio duration {duration:.1}s outside accepted [{MIN_AUDIO_DURATION_SECONDS}, {MAX_AUDIO_DURATION_SECONDS}] range"
        )));
    }
    ctx.scratch.audio_duration_seconds = Some(duration);

    ctx.collaborators
        .quota_repo
        .check_and_hold(&ctx.job.tenant_id, ctx.job.job_id.as_str(), crate::JOB_COST)
        .await?;

    info!(job_id = %ctx.job.job_id, duration, "validated input and placed quota hold");
    ctx.job = ctx.job.clone().with_progress(StageName::ValidateInput, 5);
    Ok(())
}
