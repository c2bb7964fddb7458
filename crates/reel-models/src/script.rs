//! Script scenes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shortest scene the renderer accepts, in seconds.
pub const MIN_SCENE_SECS: f64 = 2.0;

/// Longest scene the renderer accepts, in seconds.
pub const MAX_SCENE_SECS: f64 = 8.0;

/// One narrated scene of a script-mode video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub narration: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub duration_sec: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Scene {
    /// Clamp the duration into the accepted scene range.
    pub fn clamped(mut self) -> Self {
        let d = if self.duration_sec.is_finite() {
            self.duration_sec
        } else {
            MIN_SCENE_SECS
        };
        self.duration_sec = d.clamp(MIN_SCENE_SECS, MAX_SCENE_SECS);
        self
    }

    /// Search query for footage lookup.
    pub fn query(&self) -> String {
        if self.keywords.is_empty() {
            self.narration.clone()
        } else {
            self.keywords.join(" ")
        }
    }
}

/// Result of segmenting a free-text script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScript {
    pub title: String,
    pub total_duration: f64,
    pub scenes: Vec<Scene>,
}

impl ParsedScript {
    /// Build from scenes, clamping durations and recomputing the total.
    pub fn from_scenes(title: impl Into<String>, scenes: Vec<Scene>) -> Self {
        let scenes: Vec<Scene> = scenes.into_iter().map(Scene::clamped).collect();
        let total_duration = scenes.iter().map(|s| s.duration_sec).sum();
        Self {
            title: title.into(),
            total_duration,
            scenes,
        }
    }
}
