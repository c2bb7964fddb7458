//! Pipeline error types.

use thiserror::Error;

use reel_media::MediaError;
use reel_session::SessionError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before a run is created.
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("No clip candidates found: {0}")]
    NoCandidates(String),

    #[error("Render task {index} failed: {message}")]
    RenderTask { index: usize, message: String },

    #[error("Script processing failed: {0}")]
    Script(String),

    #[error("Narration failed: {0}")]
    Narration(String),

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Stage order violated: {0}")]
    StageOrder(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription(msg.into())
    }

    pub fn no_candidates(msg: impl Into<String>) -> Self {
        Self::NoCandidates(msg.into())
    }

    pub fn render_task(index: usize, msg: impl Into<String>) -> Self {
        Self::RenderTask {
            index,
            message: msg.into(),
        }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    /// Check if the error rejects a request before any run exists.
    pub fn is_input_error(&self) -> bool {
        matches!(self, PipelineError::Input(_))
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Input(_) => "input",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Transcription(_) => "transcription",
            PipelineError::NoCandidates(_) => "no_candidates",
            PipelineError::RenderTask { .. } => "render_task",
            PipelineError::Script(_) => "script",
            PipelineError::Narration(_) => "narration",
            PipelineError::Assembly(_) => "assembly",
            PipelineError::Cancelled => "cancelled",
            PipelineError::StageOrder(_) => "stage_order",
            PipelineError::Media(_) => "media",
            PipelineError::Session(_) => "session",
            PipelineError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_task_message() {
        let err = PipelineError::render_task(1, "ffmpeg exited 1");
        assert_eq!(err.to_string(), "Render task 1 failed: ffmpeg exited 1");
        assert_eq!(err.kind(), "render_task");
        assert!(!err.is_input_error());
        assert!(PipelineError::input("missing url").is_input_error());
    }
}
