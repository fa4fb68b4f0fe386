//! `acquire_clips` (§4.L band 30-55, §4.G, §4.I): resolve one local
//! NormalizedClip per planned slot, trimmed to the slot's duration.

use devocast_media::ClipInput;
use devocast_models::StageName;
use tracing::info;

use crate::clip_source::resolve_clip;
use crate::context::JobContext;
use crate::error::{PipelineError, PipelineResult};

/// Trim an already-normalized clip to `duration_seconds` with a stream-copy
/// (no re-encode needed; the clip already matches the output codec).
async fn trim_to_duration(input: &std::path::Path, output: &std::path::Path, duration_seconds: f64) -> PipelineResult<()> {
    let result = tokio::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-v",
            "error",
            "-i",
        ])
        .arg(input)
        .args(["-t", &format!("{duration_seconds:.3}"), "-c", "copy"])
        .arg(output)
        .output()
        .await
        .map_err(devocast_media::MediaError::Io)?;

    if !result.status.success() {
        return Err(devocast_media::MediaError::ffmpeg_failed(
            "clip trim failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        )
        .into());
    }
    Ok(())
}

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let band = StageName::AcquireClips.progress_band();
    let slot_count = ctx.scratch.slots.len();
    let mut resolved = Vec::with_capacity(slot_count);

    for (i, slot) in ctx.scratch.slots.clone().into_iter().enumerate() {
        if ctx.cancel_requested().await.unwrap_or(false) {
            return Err(PipelineError::Cancelled);
        }

        let clip = resolve_clip(
            &ctx.collaborators,
            &ctx.job.tenant_id,
            &slot,
            ctx.job.clip_overrides.as_deref(),
            &ctx.work_dir,
        )
        .await?;

        let trimmed_path = ctx.scratch_path(&format!("slot_{}.mp4", slot.index));
        trim_to_duration(&clip.path, &trimmed_path, slot.duration_seconds).await?;
        let info = devocast_media::probe_video(&trimmed_path).await?;

        ctx.scratch.pending_used_clip_ids.push(clip.external_clip_id);
        resolved.push(ClipInput { path: trimmed_path, fingerprint: info.fingerprint() });

        if slot_count > 0 {
            let fraction = (i + 1) as f64 / slot_count as f64;
            let progress = band.0 + ((band.1 - band.0) as f64 * fraction) as u8;
            ctx.job = ctx.job.clone().with_progress(StageName::AcquireClips, progress);
        }
    }

    if resolved.len() != slot_count {
        return Err(PipelineError::TooFewClips { slot_index: resolved.len() as u32 });
    }

    info!(job_id = %ctx.job.job_id, clip_count = resolved.len(), "acquired all slot clips");
    ctx.scratch.selected_clips = resolved;
    ctx.job = ctx.job.clone().with_progress(StageName::AcquireClips, band.1);
    Ok(())
}
