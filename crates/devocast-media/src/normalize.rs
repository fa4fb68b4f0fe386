//! Conform a background clip to the NormalizedClip contract: 1920x1080,
//! 30fps, h264/yuv420p, no audio (§3, §4.I).

use std::path::Path;

use devocast_models::{NORMALIZED_FPS, NORMALIZED_HEIGHT, NORMALIZED_VIDEO_CODEC, NORMALIZED_WIDTH};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Scale-and-pad filter that letterboxes the source into the target canvas
/// without distorting its aspect ratio.
fn scale_pad_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps}",
        w = NORMALIZED_WIDTH,
        h = NORMALIZED_HEIGHT,
        fps = NORMALIZED_FPS as u32,
    )
}

/// Re-encode `input` into `output` so it meets the NormalizedClip contract,
/// stripping any audio track. Used by the Composer's slow path whenever a
/// slot's clip fails `ClipFingerprint::conforms_to_contract`.
pub async fn normalize_clip(input: impl AsRef<Path>, output: impl AsRef<Path>) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    debug!(input = %input.display(), output = %output.display(), "normalizing clip to contract");

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(scale_pad_filter())
        .video_codec(NORMALIZED_VIDEO_CODEC_FFMPEG)
        .output_arg("-pix_fmt")
        .output_arg("yuv420p")
        .output_arg("-an")
        .preset("faster")
        .crf(23);

    FfmpegRunner::new().run(&cmd).await
}

/// `h264` is the fingerprint name; FFmpeg's libx264 encoder is invoked under
/// a different name.
const NORMALIZED_VIDEO_CODEC_FFMPEG: &str = "libx264";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_contract_dimensions() {
        let filter = scale_pad_filter();
        assert!(filter.contains("1920"));
        assert!(filter.contains("1080"));
        assert!(filter.contains("fps=30"));
    }

    #[test]
    fn codec_constant_is_h264_family() {
        assert_eq!(NORMALIZED_VIDEO_CODEC, "h264");
    }
}
