//! Narration through an external text-to-speech command.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Produces one continuous narration track for a script.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, text: &str, voice: Option<&str>, output: &Path)
        -> MediaResult<PathBuf>;
}

/// Runs a command template such as `espeak-ng -v {voice} -w {output} {text}`.
///
/// The template is split on whitespace before substitution, so narration text
/// is always passed as a single argument.
#[derive(Debug, Clone)]
pub struct CommandNarrator {
    template: Vec<String>,
    default_voice: String,
}

impl CommandNarrator {
    /// Parse a command template. Returns `None` for an empty template.
    pub fn from_template(template: &str, default_voice: impl Into<String>) -> Option<Self> {
        let template: Vec<String> = template.split_whitespace().map(String::from).collect();
        if template.is_empty() {
            return None;
        }
        Some(Self {
            template,
            default_voice: default_voice.into(),
        })
    }

    fn build_argv(&self, text: &str, voice: &str, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.template
            .iter()
            .map(|part| {
                part.replace("{voice}", voice)
                    .replace("{output}", &output)
                    .replace("{text}", text)
            })
            .collect()
    }
}

#[async_trait]
impl Narrator for CommandNarrator {
    async fn narrate(
        &self,
        text: &str,
        voice: Option<&str>,
        output: &Path,
    ) -> MediaResult<PathBuf> {
        let argv = self.build_argv(text, voice.unwrap_or(&self.default_voice), output);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| MediaError::narration_failed("empty narration command"))?;

        which::which(program).map_err(|_| MediaError::ToolNotFound(program.clone()))?;

        info!(chars = text.len(), output = %output.display(), "Generating narration");

        let result = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            debug!("narration stderr: {}", stderr);
            return Err(MediaError::narration_failed(format!(
                "{} exited with {}",
                program, result.status
            )));
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(MediaError::narration_failed("narration file not created"));
        }

        Ok(output.to_path_buf())
    }
}
