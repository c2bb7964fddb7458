//! Application state.

use std::sync::Arc;

use reel_pipeline::{Collaborators, PipelineConfig, StagePipeline};
use reel_session::{RegistryConfig, SessionRegistry};

use crate::config::ApiConfig;

/// Shared application state.
///
/// The registry is owned here and handed to the pipeline, so handlers and
/// background runs see the same run table.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: Arc<SessionRegistry>,
    pub pipeline: StagePipeline,
}

impl AppState {
    /// Create new application state around an existing pipeline.
    pub fn new(config: ApiConfig, pipeline: StagePipeline) -> Self {
        Self {
            config,
            registry: pipeline.registry().clone(),
            pipeline,
        }
    }

    /// Build the registry, collaborators and pipeline from the environment.
    pub fn from_env(config: ApiConfig) -> Self {
        let pipeline_config = PipelineConfig::from_env();
        let registry = Arc::new(SessionRegistry::new(RegistryConfig::from_env()));
        let collaborators = Collaborators::from_config(&pipeline_config);
        let pipeline = StagePipeline::new(registry, collaborators, pipeline_config);
        Self::new(config, pipeline)
    }
}
