//! Intro/outro still overlay: render a titled still from a ThumbnailLayout,
//! then crossfade it onto the front or back of the body video (§4.K).

use std::path::Path;

use devocast_models::{EncodingConfig, NORMALIZED_FPS, NORMALIZED_HEIGHT, NORMALIZED_WIDTH};

use crate::error::{MediaError, MediaResult};

/// Background music to continue into an intro/outro still's audio track.
/// `start_offset_seconds` is the position in the BGM file the still should
/// pick up from, so the track sounds continuous across the intro/body/outro
/// seam instead of restarting at 0 for every still.
pub struct StillBgm<'a> {
    pub path: &'a Path,
    pub gain: f64,
    pub start_offset_seconds: f64,
}

/// Render a still image into a video clip of `duration_seconds`, looping the
/// frame. With no `bgm`, the audio track is synthesized silence so the clip
/// can still be crossfaded against the body (which always carries audio).
/// With `bgm`, the still's audio track is the BGM segment at the job's
/// configured gain, padded with silence if the track runs out.
pub async fn render_still_clip(
    still_image: impl AsRef<Path>,
    duration_seconds: f64,
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
    bgm: Option<StillBgm<'_>>,
) -> MediaResult<()> {
    let still_image = still_image.as_ref();
    let output = output.as_ref();

    let mut args: Vec<String> = vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        still_image.to_string_lossy().to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!(
            "anullsrc=channel_layout=stereo:sample_rate={}",
            encoding.audio_sample_rate
        ),
    ];

    if let Some(b) = &bgm {
        args.push("-ss".to_string());
        args.push(format!("{:.3}", b.start_offset_seconds));
        args.push("-i".to_string());
        args.push(b.path.to_string_lossy().to_string());
    }

    args.push("-t".to_string());
    args.push(format!("{duration_seconds:.3}"));
    args.push("-vf".to_string());
    args.push(format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},fps={fps}",
        w = NORMALIZED_WIDTH,
        h = NORMALIZED_HEIGHT,
        fps = NORMALIZED_FPS as u32,
    ));

    if let Some(b) = &bgm {
        args.push("-filter_complex".to_string());
        args.push(format!(
            "[2:a]volume={:.3}[bgmvol];[1:a][bgmvol]amix=inputs=2:duration=first:dropout_transition=0[aout]",
            b.gain
        ));
        args.push("-map".to_string());
        args.push("0:v".to_string());
        args.push("-map".to_string());
        args.push("[aout]".to_string());
    }

    args.push("-c:v".to_string());
    args.push(encoding.codec.clone());
    args.push("-preset".to_string());
    args.push(encoding.preset.clone());
    args.push("-crf".to_string());
    args.push(encoding.crf.to_string());
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push("-c:a".to_string());
    args.push(encoding.audio_codec.clone());
    args.push("-b:a".to_string());
    args.push(encoding.audio_bitrate.clone());
    args.push("-shortest".to_string());
    args.push(output.to_string_lossy().to_string());

    let result = tokio::process::Command::new("ffmpeg").args(&args).output().await?;
    if !result.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "still clip render failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        ));
    }
    Ok(())
}

/// Where the still clip attaches relative to the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Intro,
    Outro,
}

/// Crossfade `still` onto `body` using `xfade`/`acrossfade`, writing the
/// combined result to `output`. `still_duration_seconds` must match the clip
/// rendered by [`render_still_clip`].
pub async fn crossfade_attach(
    still: impl AsRef<Path>,
    body: impl AsRef<Path>,
    body_duration_seconds: f64,
    still_duration_seconds: f64,
    position: Position,
    crossfade_seconds: f64,
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let still = still.as_ref();
    let body = body.as_ref();
    let output = output.as_ref();

    let (first, second, first_duration) = match position {
        Position::Intro => (still, body, still_duration_seconds),
        Position::Outro => (body, still, body_duration_seconds),
    };
    let offset = (first_duration - crossfade_seconds).max(0.0);

    let args: Vec<String> = vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        "-i".to_string(),
        first.to_string_lossy().to_string(),
        "-i".to_string(),
        second.to_string_lossy().to_string(),
        "-filter_complex".to_string(),
        format!(
            "[0:v][1:v]xfade=transition=fade:duration={cf:.3}:offset={offset:.3}[vout];\
             [0:a][1:a]acrossfade=d={cf:.3}[aout]",
            cf = crossfade_seconds,
        ),
        "-map".to_string(),
        "[vout]".to_string(),
        "-map".to_string(),
        "[aout]".to_string(),
        "-c:v".to_string(),
        encoding.codec.clone(),
        "-preset".to_string(),
        encoding.preset.clone(),
        "-crf".to_string(),
        encoding.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        encoding.audio_codec.clone(),
        "-b:a".to_string(),
        encoding.audio_bitrate.clone(),
        output.to_string_lossy().to_string(),
    ];

    let result = tokio::process::Command::new("ffmpeg").args(&args).output().await?;
    if !result.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "intro/outro crossfade failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_offset_uses_still_duration() {
        let offset = (3.0_f64 - 0.5).max(0.0);
        assert!((offset - 2.5).abs() < 0.001);
    }
}
