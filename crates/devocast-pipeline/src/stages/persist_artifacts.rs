//! `persist_artifacts` (§4.L band 90-98, §6): upload the rendered video,
//! subtitle file, and thumbnail to the Blob Store Adapter.

use devocast_models::StageName;
use devocast_storage::{artifact_key, ArtifactKind};
use tracing::info;

use crate::context::JobContext;
use crate::error::{PipelineError, PipelineResult};

/// Grab a representative still from the final video for a thumbnail when the
/// job has no `ThumbnailLayout` to render one from.
async fn extract_frame(video_path: &std::path::Path, output: &std::path::Path) -> PipelineResult<()> {
    let result = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-ss", "1", "-i"])
        .arg(video_path)
        .args(["-frames:v", "1"])
        .arg(output)
        .output()
        .await
        .map_err(devocast_media::MediaError::Io)?;
    if !result.status.success() {
        return Err(devocast_media::MediaError::ffmpeg_failed(
            "thumbnail frame extraction failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        )
        .into());
    }
    Ok(())
}

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let video_path = ctx
        .scratch
        .final_video_path
        .clone()
        .ok_or_else(|| PipelineError::BadInput("apply_intro_outro did not leave a final video".to_string()))?;

    let tenant_id = ctx.job.tenant_id.clone();
    let job_id = ctx.job.job_id.to_string();

    let video_key = artifact_key(&tenant_id, &job_id, ArtifactKind::RenderedVideo);
    let video_url = ctx.collaborators.blob_store.put_file(&video_path, &video_key, "video/mp4").await?;
    ctx.job = ctx.job.clone().with_progress(StageName::PersistArtifacts, 93);

    // Every succeeded job gets a subtitle row, even with zero segments (§8):
    // `to_srt(&[])` is a valid empty-string SRT, not an error.
    let srt_path = match ctx.scratch.srt_path.clone() {
        Some(path) => path,
        None => {
            let path = ctx.scratch_path("subtitles.srt");
            devocast_media::write_srt(&ctx.scratch.final_segments, &path).await?;
            ctx.scratch.srt_path = Some(path.clone());
            path
        }
    };
    let subtitle_key = artifact_key(&tenant_id, &job_id, ArtifactKind::Subtitles);
    let subtitle_url = ctx.collaborators.blob_store.put_file(&srt_path, &subtitle_key, "application/x-subrip").await?;
    ctx.job = ctx.job.clone().with_progress(StageName::PersistArtifacts, 95);

    let thumbnail_path = ctx.scratch_path("thumbnail.jpg");
    if let Some(layout) = &ctx.scratch.layout {
        let text_boxes: Vec<&devocast_models::TextBox> = layout.visible_text_boxes().collect();
        let background_path = ctx.scratch_path("layout_background");
        devocast_media::render_still(&background_path, &text_boxes, &thumbnail_path).await?;
    } else {
        extract_frame(&video_path, &thumbnail_path).await?;
    }
    let thumbnail_key = artifact_key(&tenant_id, &job_id, ArtifactKind::Thumbnail);
    let thumbnail_url = ctx.collaborators.blob_store.put_file(&thumbnail_path, &thumbnail_key, "image/jpeg").await?;

    info!(job_id, "persisted rendered artifacts");
    ctx.scratch.thumbnail_path = Some(thumbnail_path);
    ctx.job.video_blob_url = Some(video_url);
    ctx.job.subtitle_blob_url = Some(subtitle_url);
    ctx.job.thumbnail_blob_url = Some(thumbnail_url);
    ctx.job = ctx.job.clone().with_progress(StageName::PersistArtifacts, 98);
    Ok(())
}
