//! Output aspect formats.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectFormat {
    /// Vertical short-form video
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectFormat::Portrait => "9:16",
            AspectFormat::Landscape => "16:9",
            AspectFormat::Square => "1:1",
        }
    }

    /// Output resolution as (width, height).
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            AspectFormat::Portrait => (1080, 1920),
            AspectFormat::Landscape => (1920, 1080),
            AspectFormat::Square => (1080, 1080),
        }
    }

    /// Orientation keyword used when searching footage.
    pub fn orientation(&self) -> &'static str {
        match self {
            AspectFormat::Portrait => "portrait",
            AspectFormat::Landscape => "landscape",
            AspectFormat::Square => "square",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        let f: AspectFormat = serde_json::from_str("\"16:9\"").unwrap();
        assert_eq!(f, AspectFormat::Landscape);
        assert_eq!(f.resolution(), (1920, 1080));
        assert_eq!(AspectFormat::default().resolution(), (1080, 1920));
    }
}
