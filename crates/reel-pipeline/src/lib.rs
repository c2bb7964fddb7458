//! Stage pipeline for ReelForge runs.
//!
//! This crate provides:
//! - `SegmentScorer`: transcript windowing and virality scoring
//! - `run_bounded`: a concurrency-capped batch executor with fail-fast semantics
//! - `StagePipeline`: clip and script runs driven through ordered stages
//! - Script segmentation and local footage/music sources
//! - Structured run logging and pipeline metrics

pub mod assets;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod scorer;
pub mod segment;

pub use assets::{FootageSource, LocalFootageLibrary, LocalMusicLibrary, MusicSource};
pub use batch::{dispatch_percent, run_bounded, BatchError};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::RunLogger;
pub use pipeline::{Collaborators, StagePipeline, StageTracker};
pub use scorer::{ScorerConfig, SegmentScorer};
pub use segment::{RuleBasedSegmenter, ScriptSegment, ScriptSegmenter};
