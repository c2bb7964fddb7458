//! Media tool wrappers for the ReelForge pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with timeouts
//! - A single-operation `MediaTransform` interface (trim, crop/scale, concat, mux, mix)
//! - Source fetching through yt-dlp
//! - Whisper transcription and command-line narration
//! - ASS subtitle generation for burned-in captions

pub mod command;
pub mod error;
pub mod fetch;
pub mod narrate;
pub mod subtitles;
pub mod transcribe;
pub mod transform;

pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, FfmpegProgress, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fetch::{MediaKind, SourceFetcher, YtDlpFetcher};
pub use narrate::{CommandNarrator, Narrator};
pub use subtitles::{format_ass_time, write_ass_subtitles};
pub use transcribe::{Transcriber, WhisperTranscriber};
pub use transform::{FfmpegTransform, MediaTransform, TimeRange, TransformOp};
