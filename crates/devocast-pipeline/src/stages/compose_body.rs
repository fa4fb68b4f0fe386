//! `compose_body` (§4.L band 55-80, §4.J): stitch slot clips, burn subtitles,
//! mix voice audio plus optional BGM into the body video (no intro/outro yet).

use devocast_media::Bgm;
use devocast_models::{EncodingConfig, StageName};
use tracing::info;

use crate::context::JobContext;
use crate::error::PipelineResult;

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let encoding = EncodingConfig::default();

    let visual_path = ctx.scratch_path("body_visual.mp4");
    devocast_media::compose_body(&ctx.scratch.selected_clips, &visual_path, &ctx.work_dir, &encoding).await?;
    ctx.job = ctx.job.clone().with_progress(StageName::ComposeBody, 65);

    let voice_path = ctx
        .scratch
        .source_audio_path
        .clone()
        .ok_or_else(|| crate::error::PipelineError::BadInput("missing source audio for mux".to_string()))?;

    let srt_path = if ctx.scratch.final_segments.is_empty() {
        None
    } else {
        let path = ctx.scratch_path("subtitles.srt");
        devocast_media::write_srt(&ctx.scratch.final_segments, &path).await?;
        ctx.scratch.srt_path = Some(path.clone());
        Some(path)
    };

    let subtitle_spans: Vec<(f64, f64)> =
        ctx.scratch.final_segments.iter().map(|s| (s.start_seconds, s.end_seconds)).collect();

    let bgm_path = if let Some(url) = ctx.job.bgm_blob_url.clone() {
        let path = ctx.scratch_path("bgm.m4a");
        crate::download::fetch_to_file(&url, &path, std::time::Duration::from_secs(60)).await?;
        Some(path)
    } else {
        None
    };
    let bgm = bgm_path.as_deref().map(|path| Bgm { path, gain: ctx.job.bgm_gain as f64 });

    let body_path = ctx.scratch_path("body_final.mp4");
    devocast_media::mux_final(&visual_path, &voice_path, bgm, srt_path.as_deref(), &subtitle_spans, &body_path, &encoding)
        .await?;

    info!(job_id = %ctx.job.job_id, "composed body video");
    ctx.scratch.body_video_path = Some(body_path);
    ctx.job = ctx.job.clone().with_progress(StageName::ComposeBody, 80);
    Ok(())
}
