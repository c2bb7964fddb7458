//! Speech-to-text through a local Whisper script.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use reel_models::TranscriptWord;

use crate::error::{MediaError, MediaResult};

/// Turns an audio file into time-stamped words.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> MediaResult<Vec<TranscriptWord>>;
}

/// JSON printed by the Whisper helper script.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    text: String,
    /// Milliseconds
    start: f64,
    /// Milliseconds
    end: f64,
}

/// Runs `<python> <script> <audio>` and parses its JSON output.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    python_bin: String,
    script: PathBuf,
}

impl WhisperTranscriber {
    pub fn new(python_bin: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            python_bin: python_bin.into(),
            script: script.into(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> MediaResult<Vec<TranscriptWord>> {
        which::which(&self.python_bin)
            .map_err(|_| MediaError::ToolNotFound(self.python_bin.clone()))?;
        if !tokio::fs::try_exists(&self.script).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(self.script.clone()));
        }

        info!(audio = %audio.display(), "Transcribing with Whisper");

        let output = Command::new(&self.python_bin)
            .arg(&self.script)
            .arg(audio)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("whisper stderr: {}", stderr);
            return Err(MediaError::transcription_failed(format!(
                "whisper exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("no output")
            )));
        }

        let words = parse_whisper_output(&output.stdout)?;
        info!(word_count = words.len(), "Transcription complete");
        Ok(words)
    }
}

/// Parse Whisper helper output into ordered words.
///
/// Blank tokens are dropped and timings are forced to be non-decreasing.
pub fn parse_whisper_output(stdout: &[u8]) -> MediaResult<Vec<TranscriptWord>> {
    let parsed: WhisperOutput = serde_json::from_slice(stdout)?;

    let mut words = Vec::with_capacity(parsed.words.len());
    let mut last_start = 0u64;
    for w in parsed.words {
        let text = w.text.trim();
        if text.is_empty() {
            continue;
        }
        let start = (w.start.max(0.0) as u64).max(last_start);
        let end = (w.end.max(0.0) as u64).max(start);
        last_start = start;
        words.push(TranscriptWord::new(text, start, end));
    }
    Ok(words)
}
