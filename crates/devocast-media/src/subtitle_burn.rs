//! Final mux: burns subtitles into the silent body visual track and mixes
//! the voice audio plus optional BGM (§4.J "Subtitle burn-in", "Audio mix").

use std::path::Path;

use devocast_models::{EncodingConfig, SubtitleSegment};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Styled `subtitles` filter: white text, thin outline, bottom-center,
/// auto-wrapped by libass at the default wrap point (~40 chars at this font size).
const SUBTITLE_FORCE_STYLE: &str =
    "FontSize=22,PrimaryColour=&H00FFFFFF,OutlineColour=&H00000000,BorderStyle=1,Outline=1,Alignment=2";

/// Write a finalized segment list to `path` as a standard SRT file.
pub async fn write_srt(segments: &[SubtitleSegment], path: impl AsRef<Path>) -> MediaResult<()> {
    let srt = devocast_models::to_srt(segments);
    tokio::fs::write(path, srt).await?;
    Ok(())
}

/// Escape a path for embedding inside an FFmpeg filtergraph argument: the
/// `subtitles` filter treats `:` and `\` specially, and the whole path must
/// itself be wrapped for the outer filter string.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', r"\\\\")
        .replace(':', r"\:")
        .replace('\'', r"\'")
}

/// An optional background-music track mixed at the job's configured gain.
pub struct Bgm<'a> {
    pub path: &'a Path,
    pub gain: f64,
}

/// Combine the silent `visual` track with `voice_audio`, an optional `bgm`
/// ducked by -6dB during subtitle spans, and (if present) burn in `srt_path`.
/// Produces the final muxed output at `output`.
pub async fn mux_final(
    visual: impl AsRef<Path>,
    voice_audio: impl AsRef<Path>,
    bgm: Option<Bgm<'_>>,
    srt_path: Option<&Path>,
    subtitle_spans: &[(f64, f64)],
    output: impl AsRef<Path>,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let visual = visual.as_ref();
    let voice_audio = voice_audio.as_ref();
    let output = output.as_ref();

    let mut args: Vec<String> = vec!["-y".to_string(), "-v".to_string(), "error".to_string()];
    args.push("-i".to_string());
    args.push(visual.to_string_lossy().to_string());
    args.push("-i".to_string());
    args.push(voice_audio.to_string_lossy().to_string());
    if let Some(b) = &bgm {
        args.push("-i".to_string());
        args.push(b.path.to_string_lossy().to_string());
    }

    let mut filter = String::new();

    let video_label = if let Some(srt) = srt_path {
        let escaped = escape_filter_path(srt);
        filter.push_str(&format!(
            "[0:v]subtitles='{escaped}':force_style='{SUBTITLE_FORCE_STYLE}'[vout];"
        ));
        "[vout]"
    } else {
        "[0:v]"
    };

    let audio_label = if let Some(b) = &bgm {
        let mut duck = format!("[2:a]volume={:.3}", b.gain);
        for (start, end) in subtitle_spans {
            duck.push_str(&format!(",volume=enable='between(t,{start:.3},{end:.3})':volume=-6dB"));
        }
        duck.push_str("[bgm];");
        filter.push_str(&duck);
        filter.push_str("[1:a][bgm]amix=inputs=2:duration=first:dropout_transition=0[aout];");
        "[aout]"
    } else {
        "[1:a]"
    };

    debug!(filter = %filter, "mux filter graph");

    args.push("-filter_complex".to_string());
    args.push(filter);
    args.push("-map".to_string());
    args.push(video_label.to_string());
    args.push("-map".to_string());
    args.push(audio_label.to_string());
    args.extend(encoding.to_ffmpeg_args());
    args.push(output.to_string_lossy().to_string());

    let result = tokio::process::Command::new("ffmpeg").args(&args).output().await?;

    if !result.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "final mux failed",
            Some(String::from_utf8_lossy(&result.stderr).to_string()),
            result.status.code(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn escapes_colons_in_windows_style_paths() {
        let escaped = escape_filter_path(&PathBuf::from("/tmp/job:1/subs.srt"));
        assert!(escaped.contains(r"\:"));
    }
}
