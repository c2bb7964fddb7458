//! Run request types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::format::AspectFormat;
use crate::script::Scene;
use crate::utils::validate_source_url;

/// Maximum script length accepted for segmentation.
pub const MAX_SCRIPT_LENGTH: usize = 20_000;

/// Maximum number of pre-parsed scenes per run.
pub const MAX_SCENES: usize = 50;

/// Speech-to-text backend requested for a clip run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionMethod {
    /// Local Whisper model
    #[default]
    Whisper,
    /// Hosted AssemblyAI service
    #[serde(alias = "assembly_ai")]
    AssemblyAi,
}

impl TranscriptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionMethod::Whisper => "whisper",
            TranscriptionMethod::AssemblyAi => "assemblyai",
        }
    }
}

/// Start a clip run from a source video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoRequest {
    #[serde(alias = "youtubeUrl")]
    pub source_url: String,
    pub transcription_method: TranscriptionMethod,
    #[serde(default)]
    pub format: AspectFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ProcessVideoRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        validate_source_url(&self.source_url).map(|_| ())
    }
}

/// Start a script run from free text or pre-parsed scenes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<Scene>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub format: AspectFormat,
}

impl GenerateVideoRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        let has_scenes = self.scenes.as_ref().is_some_and(|s| !s.is_empty());
        let has_script = self
            .script
            .as_ref()
            .is_some_and(|s| !s.trim().is_empty());

        if !has_scenes && !has_script {
            return Err("Either scenes or script is required".to_string());
        }

        if let Some(scenes) = &self.scenes {
            if scenes.len() > MAX_SCENES {
                return Err(format!("At most {} scenes are allowed", MAX_SCENES));
            }
            if scenes.iter().any(|s| s.narration.trim().is_empty()) {
                return Err("Every scene needs narration text".to_string());
            }
        }

        if let Some(script) = &self.script {
            if script.len() > MAX_SCRIPT_LENGTH {
                return Err(format!(
                    "Script exceeds maximum length of {} characters",
                    MAX_SCRIPT_LENGTH
                ));
            }
        }

        Ok(())
    }
}

/// Segment a script without starting a run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParseScriptRequest {
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ParseScriptRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.script.trim().is_empty() {
            return Err("Script is required".to_string());
        }
        if self.script.len() > MAX_SCRIPT_LENGTH {
            return Err(format!(
                "Script exceeds maximum length of {} characters",
                MAX_SCRIPT_LENGTH
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_request_accepts_youtube_url_alias() {
        let req: ProcessVideoRequest = serde_json::from_str(
            r#"{"youtubeUrl":"https://youtu.be/dQw4w9WgXcQ","transcriptionMethod":"whisper"}"#,
        )
        .unwrap();
        assert_eq!(req.transcription_method, TranscriptionMethod::Whisper);
        assert_eq!(req.format, AspectFormat::Portrait);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_process_request_rejects_bad_url() {
        let req = ProcessVideoRequest {
            source_url: "javascript:alert(1)".to_string(),
            transcription_method: TranscriptionMethod::Whisper,
            format: AspectFormat::Portrait,
            language: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_generate_request_needs_source() {
        assert!(GenerateVideoRequest::default().validate().is_err());

        let blank = GenerateVideoRequest {
            script: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        let ok = GenerateVideoRequest {
            script: Some("A short story about rivers.".to_string()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_generate_request_rejects_empty_narration() {
        let req = GenerateVideoRequest {
            scenes: Some(vec![Scene {
                narration: " ".to_string(),
                keywords: vec![],
                duration_sec: 3.0,
                description: None,
            }]),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
