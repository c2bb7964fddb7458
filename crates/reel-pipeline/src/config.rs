//! Pipeline configuration.

use std::path::PathBuf;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scratch directory for downloads and intermediate files
    pub work_dir: PathBuf,
    /// Where rendered clips are written
    pub clips_dir: PathBuf,
    /// Where script-mode videos are written
    pub outputs_dir: PathBuf,
    /// URL prefix under which `clips_dir` is served
    pub clips_url_prefix: String,
    /// URL prefix under which `outputs_dir` is served
    pub outputs_url_prefix: String,
    /// Maximum render tasks in flight per run
    pub render_concurrency: usize,
    /// Number of ranked candidates rendered per clip run
    pub max_clips: usize,
    /// Volume of background music under narration
    pub music_volume: f32,
    /// Per-operation FFmpeg timeout
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Python interpreter used for Whisper
    pub python_bin: String,
    /// Whisper helper script
    pub whisper_script: PathBuf,
    /// Directory of local stock footage
    pub footage_dir: Option<PathBuf>,
    /// Directory of background music tracks
    pub music_dir: Option<PathBuf>,
    /// Text-to-speech command template
    pub tts_command: Option<String>,
    /// Voice used when a request names none
    pub default_voice: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/reelforge"),
            clips_dir: PathBuf::from("/tmp/reelforge/clips"),
            outputs_dir: PathBuf::from("/tmp/reelforge/outputs"),
            clips_url_prefix: "/clips".to_string(),
            outputs_url_prefix: "/outputs".to_string(),
            render_concurrency: 2,
            max_clips: 3,
            music_volume: 0.15,
            ffmpeg_timeout_secs: None,
            python_bin: "python3".to_string(),
            whisper_script: PathBuf::from("transcribe_whisper.py"),
            footage_dir: None,
            music_dir: None,
            tts_command: None,
            default_voice: "en".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let work_dir = std::env::var("REEL_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        Self {
            clips_dir: std::env::var("REEL_CLIPS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("clips")),
            outputs_dir: std::env::var("REEL_OUTPUTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("outputs")),
            clips_url_prefix: std::env::var("REEL_CLIPS_URL_PREFIX")
                .unwrap_or(defaults.clips_url_prefix),
            outputs_url_prefix: std::env::var("REEL_OUTPUTS_URL_PREFIX")
                .unwrap_or(defaults.outputs_url_prefix),
            render_concurrency: std::env::var("REEL_RENDER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|k: &usize| *k >= 1)
                .unwrap_or(2),
            max_clips: std::env::var("REEL_MAX_CLIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            music_volume: std::env::var("REEL_MUSIC_VOLUME")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.15),
            ffmpeg_timeout_secs: std::env::var("REEL_FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            python_bin: std::env::var("REEL_PYTHON_BIN").unwrap_or(defaults.python_bin),
            whisper_script: std::env::var("REEL_WHISPER_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.whisper_script),
            footage_dir: std::env::var("REEL_FOOTAGE_DIR").ok().map(PathBuf::from),
            music_dir: std::env::var("REEL_MUSIC_DIR").ok().map(PathBuf::from),
            tts_command: std::env::var("REEL_TTS_COMMAND")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            default_voice: std::env::var("REEL_DEFAULT_VOICE").unwrap_or(defaults.default_voice),
            work_dir,
        }
    }

    /// Public URL of a rendered clip file.
    pub fn clip_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.clips_url_prefix.trim_end_matches('/'), file_name)
    }

    /// Public URL of a script-mode output file.
    pub fn output_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.outputs_url_prefix.trim_end_matches('/'), file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_join_cleanly() {
        let config = PipelineConfig {
            clips_url_prefix: "/clips/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.clip_url("clip_1.mp4"), "/clips/clip_1.mp4");
        assert_eq!(config.output_url("video_1.mp4"), "/outputs/video_1.mp4");
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.render_concurrency, 2);
        assert_eq!(config.max_clips, 3);
    }
}
