//! `finalize` (§4.L band 98-100): commit the quota hold, record used clips,
//! and transition the job to `Succeeded`.

use devocast_models::UsedClip;
use tracing::info;

use crate::context::JobContext;
use crate::error::{PipelineError, PipelineResult};

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let video_url = ctx.job.video_blob_url.clone().ok_or_else(|| {
        PipelineError::BadInput("persist_artifacts did not leave a video_blob_url".to_string())
    })?;
    let thumbnail_url = ctx.job.thumbnail_blob_url.clone().ok_or_else(|| {
        PipelineError::BadInput("persist_artifacts did not leave a thumbnail_blob_url".to_string())
    })?;
    let subtitle_url = ctx.job.subtitle_blob_url.clone().ok_or_else(|| {
        PipelineError::BadInput("persist_artifacts did not leave a subtitle_blob_url".to_string())
    })?;
    let duration_seconds = ctx.scratch.audio_duration_seconds.unwrap_or(0.0);

    ctx.collaborators.quota_repo.commit(&ctx.job.tenant_id, ctx.job.job_id.as_str()).await?;

    for external_clip_id in ctx.scratch.pending_used_clip_ids.drain(..).collect::<Vec<_>>() {
        let used = UsedClip {
            tenant_id: ctx.job.tenant_id.clone(),
            job_id: ctx.job.job_id.to_string(),
            external_clip_id,
            used_at: chrono::Utc::now(),
        };
        ctx.collaborators.used_clip_repo.record(&used).await?;
    }

    info!(job_id = %ctx.job.job_id, "job succeeded");
    ctx.job = ctx.job.clone().complete(video_url, subtitle_url, thumbnail_url, duration_seconds);
    Ok(())
}
