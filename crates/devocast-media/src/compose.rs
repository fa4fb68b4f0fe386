//! Stitch slot clips into a silent body visual track, choosing the lossless
//! concat-demuxer path when every clip conforms to the NormalizedClip
//! contract and falling back to a filter-graph re-encode otherwise (§4.J).

use std::path::{Path, PathBuf};

use devocast_models::{ClipFingerprint, EncodingConfig};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// One slot's already-normalized-or-not background clip, ready to stitch.
#[derive(Debug, Clone)]
pub struct ClipInput {
    pub path: PathBuf,
    pub fingerprint: ClipFingerprint,
}

/// Whether the concat-demuxer fast path applies to this clip sequence.
pub fn all_clips_conform(clips: &[ClipInput]) -> bool {
    clips.iter().all(|c| c.fingerprint.conforms_to_contract())
}

/// Produce a silent visual track at `output` by stitching `clips` in order.
/// Picks fast (stream-copy) or slow (filter-graph) path per §4.J's decision rule.
pub async fn compose_body(
    clips: &[ClipInput],
    output: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    if clips.is_empty() {
        return Err(MediaError::InvalidVideo("no clips to compose".to_string()));
    }

    if all_clips_conform(clips) {
        info!(clip_count = clips.len(), "composing body via concat-demuxer fast path");
        concat_stream_copy(clips, output, work_dir).await
    } else {
        info!(clip_count = clips.len(), "composing body via filter-graph slow path");
        stitch_filter_complex(clips, output, encoding).await
    }
}

/// Write an FFmpeg concat-demuxer playlist manifest listing each clip path.
async fn write_concat_manifest(clips: &[ClipInput], manifest_path: &Path) -> MediaResult<()> {
    let mut manifest = String::new();
    for clip in clips {
        // FFmpeg's concat demuxer requires single-quoted paths with internal
        // single quotes escaped as '\''.
        let escaped = clip.path.to_string_lossy().replace('\'', r"'\''");
        manifest.push_str(&format!("file '{escaped}'\n"));
    }
    tokio::fs::write(manifest_path, manifest).await?;
    Ok(())
}

async fn concat_stream_copy(
    clips: &[ClipInput],
    output: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
) -> MediaResult<()> {
    let manifest_path = work_dir.as_ref().join("concat_manifest.txt");
    write_concat_manifest(clips, &manifest_path).await?;

    let cmd = FfmpegCommand::new(&manifest_path, output)
        .input_arg("-f")
        .input_arg("concat")
        .input_arg("-safe")
        .input_arg("0")
        .output_arg("-c")
        .output_arg("copy")
        .output_arg("-an");

    FfmpegRunner::new().run(&cmd).await
}

/// Slow path: scale/pad every clip to the contract canvas inline and
/// concatenate with the `concat` filter, re-encoding once for the full sequence.
async fn stitch_filter_complex(
    clips: &[ClipInput],
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let output = output.as_ref();

    let mut args: Vec<String> = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];
    for clip in clips {
        args.push("-i".to_string());
        args.push(clip.path.to_string_lossy().to_string());
    }

    let scale_pad = "scale=1920:1080:force_original_aspect_ratio=decrease,pad=1920:1080:(ow-iw)/2:(oh-ih)/2,fps=30,setsar=1";
    let mut filter = String::new();
    for i in 0..clips.len() {
        filter.push_str(&format!("[{i}:v]{scale_pad}[v{i}];"));
    }
    for i in 0..clips.len() {
        filter.push_str(&format!("[v{i}]"));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=0[vout]", clips.len()));

    args.push("-filter_complex".to_string());
    args.push(filter);
    args.push("-map".to_string());
    args.push("[vout]".to_string());
    args.push("-c:v".to_string());
    args.push(encoding.codec.clone());
    args.push("-preset".to_string());
    args.push(encoding.preset.clone());
    args.push("-crf".to_string());
    args.push(encoding.crf.to_string());
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push("-an".to_string());
    args.push(output.to_string_lossy().to_string());

    debug!(args = ?args, "running filter-graph concat");

    let result = tokio::process::Command::new("ffmpeg").args(&args).output().await?;

    if !result.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "filter-graph concat failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conforming_fingerprint() -> ClipFingerprint {
        ClipFingerprint {
            codec: "h264".to_string(),
            width: 1920,
            height: 1080,
            fps: 30.0,
            pixel_format: "yuv420p".to_string(),
            has_audio: false,
        }
    }

    #[test]
    fn all_conform_picks_fast_path() {
        let clips = vec![
            ClipInput { path: "a.mp4".into(), fingerprint: conforming_fingerprint() },
            ClipInput { path: "b.mp4".into(), fingerprint: conforming_fingerprint() },
        ];
        assert!(all_clips_conform(&clips));
    }

    #[test]
    fn one_nonconforming_clip_forces_slow_path() {
        let mut bad = conforming_fingerprint();
        bad.width = 1280;
        let clips = vec![
            ClipInput { path: "a.mp4".into(), fingerprint: conforming_fingerprint() },
            ClipInput { path: "b.mp4".into(), fingerprint: bad },
        ];
        assert!(!all_clips_conform(&clips));
    }
}
