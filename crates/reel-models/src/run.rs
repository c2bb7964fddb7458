//! Run definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::progress::{ProgressEvent, RunPayload, Stage};

/// Unique identifier for a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used to name per-run artifacts.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, pipeline not yet started
    #[default]
    Pending,
    /// Pipeline executing
    Running,
    /// Finished with a result
    Complete,
    /// Finished with an error
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Complete => "complete",
            RunStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Error)
    }
}

/// What kind of output a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Source video cut into ranked short clips
    Clips,
    /// Free-text script turned into one narrated video
    Script,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Clips => "clips",
            RunMode::Script => "script",
        }
    }
}

/// State of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: RunId,
    pub mode: RunMode,
    pub status: RunStatus,
    pub current_stage: Stage,
    pub percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RunPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    /// Create a pending run.
    pub fn new(id: RunId, mode: RunMode) -> Self {
        let now = Utc::now();
        Self {
            id,
            mode,
            status: RunStatus::Pending,
            current_stage: Stage::Init,
            percent: 0,
            message: "Queued".to_string(),
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a published progress event into the run state.
    pub fn apply_event(&mut self, event: &ProgressEvent) {
        self.current_stage = event.stage;
        self.percent = event.percent;
        self.message = event.message.clone();
        self.updated_at = Utc::now();

        match event.stage {
            Stage::Complete => {
                self.status = RunStatus::Complete;
                self.result = event.payload.clone();
            }
            Stage::Error => {
                self.status = RunStatus::Error;
                self.error_message = Some(event.message.clone());
            }
            _ => self.status = RunStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_short() {
        let id = RunId::from_string("0123456789abcdef");
        assert_eq!(id.short(), "01234567");

        let tiny = RunId::from_string("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_apply_event_tracks_status() {
        let mut run = Run::new(RunId::new(), RunMode::Clips);
        assert_eq!(run.status, RunStatus::Pending);

        run.apply_event(&ProgressEvent::new(Stage::Fetching, 10, "Downloading audio"));
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.current_stage, Stage::Fetching);
        assert_eq!(run.percent, 10);

        run.apply_event(&ProgressEvent::error("Error: boom"));
        assert_eq!(run.status, RunStatus::Error);
        assert_eq!(run.error_message.as_deref(), Some("Error: boom"));
        assert!(run.is_terminal());
    }

    #[test]
    fn test_run_serializes_camel_case() {
        let run = Run::new(RunId::from_string("r1"), RunMode::Script);
        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("\"currentStage\":\"init\""));
        assert!(json.contains("\"status\":\"pending\""));
        assert!(!json.contains("errorMessage"));
    }
}
