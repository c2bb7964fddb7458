//! Progress event types.
//!
//! Every event is framed on the wire as one JSON object
//! `{step, percent, message, payload?}`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clip::ClipDescriptor;

/// Lifecycle stage of a run.
///
/// Clip runs walk `init → fetching → transcribing → analyzing → rendering → complete`.
/// Script runs walk `init → parsing → narrating → rendering → assembling → mixing →
/// finalizing → complete`. `error` is reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Init,
    Parsing,
    Fetching,
    Transcribing,
    Analyzing,
    Narrating,
    Rendering,
    Assembling,
    Mixing,
    Finalizing,
    Complete,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Parsing => "parsing",
            Stage::Fetching => "fetching",
            Stage::Transcribing => "transcribing",
            Stage::Analyzing => "analyzing",
            Stage::Narrating => "narrating",
            Stage::Rendering => "rendering",
            Stage::Assembling => "assembling",
            Stage::Mixing => "mixing",
            Stage::Finalizing => "finalizing",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }

    /// Position in the forward order shared by both run modes.
    ///
    /// `Error` has no position; it may follow any non-terminal stage.
    pub fn order(&self) -> Option<u8> {
        let rank = match self {
            Stage::Init => 0,
            Stage::Parsing => 1,
            Stage::Fetching => 2,
            Stage::Transcribing => 3,
            Stage::Analyzing => 4,
            Stage::Narrating => 5,
            Stage::Rendering => 6,
            Stage::Assembling => 7,
            Stage::Mixing => 8,
            Stage::Finalizing => 9,
            Stage::Complete => 10,
            Stage::Error => return None,
        };
        Some(rank)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranked clips produced by a clip run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipSet {
    pub clips: Vec<ClipDescriptor>,
    pub source_url: String,
    pub title: String,
}

/// Single video produced by a script run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedVideo {
    pub video_url: String,
    pub title: String,
}

/// Final result fields, carried only by the terminal `complete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RunPayload {
    Clips(ClipSet),
    Video(RenderedVideo),
}

/// Snapshot of run state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    #[serde(rename = "step")]
    pub stage: Stage,
    /// Progress value (0-100)
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<RunPayload>,
}

impl ProgressEvent {
    /// Create a progress event.
    pub fn new(stage: Stage, percent: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            message: message.into(),
            payload: None,
        }
    }

    /// Create the terminal success event.
    pub fn complete(payload: RunPayload, message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Complete,
            percent: 100,
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// Create the terminal failure event.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Error,
            percent: 0,
            message: message.into(),
            payload: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_serialization() {
        let event = ProgressEvent::new(Stage::Transcribing, 150, "Transcribing");
        let json = event.to_json().unwrap();
        assert!(json.contains("\"step\":\"transcribing\""));
        assert!(json.contains("\"percent\":100"));
        assert!(!json.contains("payload"));
    }

    #[test]
    fn test_error_event_is_terminal() {
        let event = ProgressEvent::error("Error: fetch failed");
        assert!(event.is_terminal());
        assert_eq!(event.percent, 0);
        let json = event.to_json().unwrap();
        assert!(json.contains("\"step\":\"error\""));
    }

    #[test]
    fn test_video_payload_shape() {
        let event = ProgressEvent::complete(
            RunPayload::Video(RenderedVideo {
                video_url: "/outputs/video_ab12cd34.mp4".to_string(),
                title: "Demo".to_string(),
            }),
            "Video ready!",
        );
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["step"], "complete");
        assert_eq!(value["payload"]["videoUrl"], "/outputs/video_ab12cd34.mp4");

        let back: ProgressEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_stage_order_is_forward_for_both_modes() {
        let clips = [
            Stage::Init,
            Stage::Fetching,
            Stage::Transcribing,
            Stage::Analyzing,
            Stage::Rendering,
            Stage::Complete,
        ];
        let script = [
            Stage::Init,
            Stage::Parsing,
            Stage::Narrating,
            Stage::Rendering,
            Stage::Assembling,
            Stage::Mixing,
            Stage::Finalizing,
            Stage::Complete,
        ];
        for seq in [&clips[..], &script[..]] {
            assert!(seq.windows(2).all(|w| w[0].order() < w[1].order()));
        }
        assert_eq!(Stage::Error.order(), None);
    }
}
