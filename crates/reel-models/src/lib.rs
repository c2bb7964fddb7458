//! Shared data models for the ReelForge pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Runs, their status and lifecycle stages
//! - Progress events streamed to observers
//! - Time-stamped transcripts and clip candidates
//! - Script scenes and output formats
//! - Run requests and their validation

pub mod clip;
pub mod format;
pub mod progress;
pub mod request;
pub mod run;
pub mod script;
pub mod transcript;
pub mod utils;

// Re-export common types
pub use clip::{ClipCandidate, ClipDescriptor, ClipWord};
pub use format::AspectFormat;
pub use progress::{ClipSet, ProgressEvent, RenderedVideo, RunPayload, Stage};
pub use request::{
    GenerateVideoRequest, ParseScriptRequest, ProcessVideoRequest, TranscriptionMethod,
};
pub use run::{Run, RunId, RunMode, RunStatus};
pub use script::{ParsedScript, Scene};
pub use transcript::{Sentence, TranscriptWord};
pub use utils::{extract_source_id, validate_source_url};
