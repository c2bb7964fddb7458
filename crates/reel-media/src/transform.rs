//! Single-operation media transforms.
//!
//! The pipeline never builds FFmpeg arguments itself. It describes one
//! operation as a [`TransformOp`] and hands it to a [`MediaTransform`],
//! which returns the path it wrote.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use reel_models::AspectFormat;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default volume of a secondary track under the main audio.
pub const DEFAULT_MIX_VOLUME: f32 = 0.15;

/// Time window inside a source file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start_sec: f64,
    pub duration_sec: f64,
}

impl TimeRange {
    pub fn new(start_sec: f64, duration_sec: f64) -> Self {
        Self {
            start_sec,
            duration_sec,
        }
    }
}

/// One media operation.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    /// Cut `range` out of `input`.
    Trim {
        input: PathBuf,
        output: PathBuf,
        range: TimeRange,
    },
    /// Center-crop and scale to the format, optionally burning in ASS subtitles.
    CropScale {
        input: PathBuf,
        output: PathBuf,
        format: AspectFormat,
        subtitles: Option<PathBuf>,
        keep_audio: bool,
    },
    /// Join clips in order. All inputs must share codec and resolution.
    Concat {
        inputs: Vec<PathBuf>,
        output: PathBuf,
    },
    /// Replace the audio of `video` with `audio`.
    MuxAudio {
        video: PathBuf,
        audio: PathBuf,
        output: PathBuf,
    },
    /// Mix `track` under the existing audio of `video` at `volume`.
    MixAudio {
        video: PathBuf,
        track: PathBuf,
        output: PathBuf,
        volume: f32,
    },
}

impl TransformOp {
    pub fn name(&self) -> &'static str {
        match self {
            TransformOp::Trim { .. } => "trim",
            TransformOp::CropScale { .. } => "crop_scale",
            TransformOp::Concat { .. } => "concat",
            TransformOp::MuxAudio { .. } => "mux_audio",
            TransformOp::MixAudio { .. } => "mix_audio",
        }
    }

    pub fn output(&self) -> &Path {
        match self {
            TransformOp::Trim { output, .. }
            | TransformOp::CropScale { output, .. }
            | TransformOp::Concat { output, .. }
            | TransformOp::MuxAudio { output, .. }
            | TransformOp::MixAudio { output, .. } => output,
        }
    }
}

/// Asynchronous media operation: params in, output path or error out.
#[async_trait]
pub trait MediaTransform: Send + Sync {
    async fn apply(&self, op: TransformOp) -> MediaResult<PathBuf>;
}

/// [`MediaTransform`] backed by the FFmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTransform {
    runner: FfmpegRunner,
}

impl FfmpegTransform {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// Build the FFmpeg command for an operation.
    ///
    /// `Concat` additionally needs its list file written; see [`concat_list`].
    pub fn build_command(op: &TransformOp) -> MediaResult<FfmpegCommand> {
        let cmd = match op {
            TransformOp::Trim {
                input,
                output,
                range,
            } => {
                if range.duration_sec <= 0.0 || !range.duration_sec.is_finite() {
                    return Err(MediaError::invalid_input(format!(
                        "trim duration must be positive, got {}",
                        range.duration_sec
                    )));
                }
                FfmpegCommand::new(input, output)
                    .seek(range.start_sec.max(0.0))
                    .duration(range.duration_sec)
                    .video_codec("libx264")
                    .preset("veryfast")
                    .crf(18)
                    .audio_codec("aac")
                    .audio_bitrate("192k")
                    .output_args(["-avoid_negative_ts", "make_zero"])
            }
            TransformOp::CropScale {
                input,
                output,
                format,
                subtitles,
                keep_audio,
            } => {
                let mut filter = fit_filter(*format);
                if let Some(subs) = subtitles {
                    filter.push_str(&format!(",subtitles='{}'", escape_filter_path(subs)));
                }
                let cmd = FfmpegCommand::new(input, output)
                    .video_filter(filter)
                    .video_codec("libx264")
                    .preset("faster")
                    .crf(18);
                if *keep_audio {
                    cmd.audio_codec("aac").audio_bitrate("192k")
                } else {
                    cmd.no_audio()
                }
            }
            TransformOp::Concat { inputs, output } => {
                if inputs.is_empty() {
                    return Err(MediaError::invalid_input("concat needs at least one input"));
                }
                FfmpegCommand::new(concat_list_path(output), output)
                    .input_arg("-f")
                    .input_arg("concat")
                    .input_arg("-safe")
                    .input_arg("0")
                    .output_args(["-c", "copy", "-movflags", "+faststart"])
            }
            TransformOp::MuxAudio {
                video,
                audio,
                output,
            } => FfmpegCommand::new(video, output)
                .add_input(audio)
                .video_codec("copy")
                .audio_codec("aac")
                .output_args(["-ar", "44100", "-ac", "2"])
                .audio_bitrate("192k")
                .map("0:v:0")
                .map("1:a:0")
                .output_arg("-shortest"),
            TransformOp::MixAudio {
                video,
                track,
                output,
                volume,
            } => FfmpegCommand::new(video, output)
                .add_input(track)
                .filter_complex(format!(
                    "[1:a]volume={:.2}[music];[0:a][music]amix=inputs=2:duration=first[audio]",
                    volume.clamp(0.0, 1.0)
                ))
                .map("0:v")
                .map("[audio]")
                .video_codec("copy")
                .audio_codec("aac")
                .audio_bitrate("192k"),
        };
        Ok(cmd)
    }
}

#[async_trait]
impl MediaTransform for FfmpegTransform {
    async fn apply(&self, op: TransformOp) -> MediaResult<PathBuf> {
        let cmd = Self::build_command(&op)?;

        let list_file = match &op {
            TransformOp::Concat { inputs, output } => {
                let list = concat_list_path(output);
                tokio::fs::write(&list, concat_list(inputs)).await?;
                Some(list)
            }
            _ => None,
        };

        let result = self.runner.run(&cmd).await;

        if let Some(list) = list_file {
            let _ = tokio::fs::remove_file(list).await;
        }
        result?;

        let output = op.output().to_path_buf();
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(output));
        }

        info!(op = op.name(), output = %output.display(), "Transform complete");
        Ok(output)
    }
}

/// Scale to cover the target, center-crop, normalize frame rate and pixel format.
fn fit_filter(format: AspectFormat) -> String {
    let (w, h) = format.resolution();
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase:flags=lanczos,crop={w}:{h},fps=30,format=yuv420p"
    )
}

/// Escape a path for use inside a single-quoted filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "'\\''")
}

fn concat_list_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "concat".to_string());
    name.push_str("_list.txt");
    output.with_file_name(name)
}

/// Concat demuxer list file contents.
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}
