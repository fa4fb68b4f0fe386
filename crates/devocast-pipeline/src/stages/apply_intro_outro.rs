//! `apply_intro_outro` (§4.L band 80-90, §4.K): prepend/append a still-image
//! segment rendered from the job's `ThumbnailLayout`, crossfaded into the body.

use devocast_media::Position;
use devocast_models::layout::INTRO_OUTRO_CROSSFADE_SECONDS;
use devocast_models::{EncodingConfig, StageName, ThumbnailLayout};
use tracing::info;

use crate::context::JobContext;
use crate::error::{PipelineError, PipelineResult};

pub async fn run(ctx: &mut JobContext) -> PipelineResult<()> {
    let body_path = ctx
        .scratch
        .body_video_path
        .clone()
        .ok_or_else(|| PipelineError::BadInput("compose_body did not leave a body video".to_string()))?;

    let Some(layout_id) = ctx.job.layout_id.clone() else {
        ctx.scratch.final_video_path = Some(body_path);
        ctx.job = ctx.job.clone().with_progress(StageName::ApplyIntroOutro, 90);
        return Ok(());
    };

    let layout: ThumbnailLayout = ctx
        .collaborators
        .layout_repo
        .get(&layout_id)
        .await?
        .ok_or_else(|| PipelineError::BadInput(format!("layout {layout_id} not found")))?;

    if !layout.intro_settings.enabled && !layout.outro_settings.enabled {
        ctx.scratch.final_video_path = Some(body_path);
        ctx.scratch.layout = Some(layout);
        ctx.job = ctx.job.clone().with_progress(StageName::ApplyIntroOutro, 90);
        return Ok(());
    }

    let encoding = EncodingConfig::default();
    let background_path = ctx.scratch_path("layout_background");
    crate::download::fetch_to_file(&layout.background_image_url, &background_path, std::time::Duration::from_secs(60))
        .await?;

    // BGM spans the entire final video including intro/outro (§9): each still's
    // audio track continues from wherever the track already stands in the
    // timeline, rather than restarting at 0.
    let bgm_path = if let Some(url) = ctx.job.bgm_blob_url.clone() {
        let path = ctx.scratch_path("intro_outro_bgm");
        crate::download::fetch_to_file(&url, &path, std::time::Duration::from_secs(60)).await?;
        Some(path)
    } else {
        None
    };
    let bgm_gain = ctx.job.bgm_gain as f64;
    let still_bgm = |start_offset_seconds: f64| {
        bgm_path.as_deref().map(|path| devocast_media::StillBgm {
            path,
            gain: bgm_gain,
            start_offset_seconds,
        })
    };

    let mut current = body_path;

    if layout.intro_settings.enabled {
        let text_boxes: Vec<&devocast_models::TextBox> = layout.visible_text_boxes().collect();
        let still = ctx.scratch_path("intro_still.jpg");
        devocast_media::render_still(&background_path, &text_boxes, &still).await?;

        let clip = ctx.scratch_path("intro_clip.mp4");
        devocast_media::render_still_clip(
            &still,
            layout.intro_settings.duration_seconds,
            &clip,
            &encoding,
            still_bgm(0.0),
        )
        .await?;

        let body_duration = devocast_media::get_duration(&current).await?;
        let combined = ctx.scratch_path("with_intro.mp4");
        devocast_media::crossfade_attach(
            &clip,
            &current,
            body_duration,
            layout.intro_settings.duration_seconds,
            Position::Intro,
            INTRO_OUTRO_CROSSFADE_SECONDS,
            &combined,
            &encoding,
        )
        .await?;
        current = combined;
    }
    ctx.job = ctx.job.clone().with_progress(StageName::ApplyIntroOutro, 85);

    if layout.outro_settings.enabled {
        let still = ctx.scratch_path("outro_still.jpg");
        devocast_media::render_still(&background_path, &[], &still).await?;

        let body_duration = devocast_media::get_duration(&current).await?;
        let clip = ctx.scratch_path("outro_clip.mp4");
        devocast_media::render_still_clip(
            &still,
            layout.outro_settings.duration_seconds,
            &clip,
            &encoding,
            still_bgm(body_duration),
        )
        .await?;

        let combined = ctx.scratch_path("with_outro.mp4");
        devocast_media::crossfade_attach(
            &clip,
            &current,
            body_duration,
            layout.outro_settings.duration_seconds,
            Position::Outro,
            INTRO_OUTRO_CROSSFADE_SECONDS,
            &combined,
            &encoding,
        )
        .await?;
        current = combined;
    }

    info!(job_id = %ctx.job.job_id, "applied intro/outro overlay");
    ctx.scratch.final_video_path = Some(current);
    ctx.scratch.layout = Some(layout);
    ctx.job = ctx.job.clone().with_progress(StageName::ApplyIntroOutro, 90);
    Ok(())
}
