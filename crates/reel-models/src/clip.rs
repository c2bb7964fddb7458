//! Clip candidate and clip descriptor types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A scored transcript window considered for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipCandidate {
    pub start_time_sec: f64,
    pub end_time_sec: f64,
    pub duration_sec: f64,
    pub title: String,
    /// Heuristic engagement score (0-99)
    pub virality_score: u8,
}

/// Word timing inside a rendered clip, relative to the clip start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipWord {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// A rendered clip as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClipDescriptor {
    pub id: String,
    pub title: String,
    pub virality_score: u8,
    pub duration_sec: f64,
    pub url: String,
    pub transcript: Vec<ClipWord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_field_names() {
        let clip = ClipDescriptor {
            id: "clip_ab12cd34_1".to_string(),
            title: "Why it works...".to_string(),
            virality_score: 88,
            duration_sec: 21.5,
            url: "/clips/clip_ab12cd34_1.mp4".to_string(),
            transcript: vec![ClipWord {
                word: "Why".to_string(),
                start_time: 0.0,
                end_time: 0.4,
            }],
        };
        let json = serde_json::to_string(&clip).unwrap();
        assert!(json.contains("\"viralityScore\":88"));
        assert!(json.contains("\"durationSec\":21.5"));
        assert!(json.contains("\"startTime\":0.0"));
    }
}
