#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for devocast's video-assembly pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and progress parsing from `-progress pipe:2`
//! - Probing clips into a `ClipFingerprint` for the Composer's fast-path eligibility check
//! - Clip normalization to the NormalizedClip contract
//! - Body composition (concat-demuxer fast path / filter-graph slow path)
//! - Subtitle burn-in and final audio mix (voice + ducked BGM)
//! - Thumbnail/intro/outro still compositing from a ThumbnailLayout

pub mod command;
pub mod compose;
pub mod error;
pub mod fs_utils;
pub mod introoutro;
pub mod normalize;
pub mod probe;
pub mod progress;
pub mod subtitle_burn;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{all_clips_conform, compose_body, ClipInput};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use introoutro::{crossfade_attach, render_still_clip, Position, StillBgm};
pub use normalize::normalize_clip;
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use subtitle_burn::{mux_final, write_srt, Bgm};
pub use thumbnail::render_still;
