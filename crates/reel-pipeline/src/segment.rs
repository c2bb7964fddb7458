//! Script segmentation into narrated scenes.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use reel_models::{ParsedScript, Scene};

use crate::error::{PipelineError, PipelineResult};

/// Sentence punctuation or a comma followed by a joining word.
static CLAUSE_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[.!?]+|,\s+(?:and|but|or|so|because|when|while)\s+")
        .expect("clause pattern is valid")
});

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence pattern is valid"));

/// Fragments at or below this many characters are dropped by the clause split.
const MIN_CLAUSE_CHARS: usize = 15;
/// Fragments at or below this many characters are dropped by the fallback split.
const MIN_SENTENCE_CHARS: usize = 5;

/// Words narrated per second.
const WORDS_PER_SECOND: f64 = 2.5;
const MIN_SEGMENT_SECS: f64 = 2.0;
const MAX_SEGMENT_SECS: f64 = 7.0;

const TITLE_CHARS: usize = 50;

/// One narrated piece of a script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSegment {
    pub narration: String,
    pub keywords: Vec<String>,
    pub duration_sec: f64,
}

impl From<ScriptSegment> for Scene {
    fn from(segment: ScriptSegment) -> Self {
        Scene {
            narration: segment.narration,
            keywords: segment.keywords,
            duration_sec: segment.duration_sec,
            description: None,
        }
    }
}

/// Splits free text into scenes.
#[async_trait]
pub trait ScriptSegmenter: Send + Sync {
    async fn segment(&self, script: &str) -> PipelineResult<Vec<ScriptSegment>>;
}

/// Punctuation-driven segmenter that needs no external model.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedSegmenter;

impl RuleBasedSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous segmentation used by the trait impl.
    pub fn split(&self, script: &str) -> PipelineResult<Vec<ScriptSegment>> {
        let mut fragments = fragments(&CLAUSE_SPLIT, script, MIN_CLAUSE_CHARS);
        if fragments.is_empty() {
            fragments = fragments_fallback(script);
        }
        if fragments.is_empty() {
            return Err(PipelineError::script("script is too short or empty"));
        }

        Ok(fragments
            .into_iter()
            .map(|text| ScriptSegment {
                duration_sec: estimate_duration(&text),
                keywords: vec![text.clone()],
                narration: text,
            })
            .collect())
    }
}

#[async_trait]
impl ScriptSegmenter for RuleBasedSegmenter {
    async fn segment(&self, script: &str) -> PipelineResult<Vec<ScriptSegment>> {
        self.split(script)
    }
}

fn fragments(pattern: &Regex, script: &str, min_chars: usize) -> Vec<String> {
    pattern
        .split(script)
        .map(str::trim)
        .filter(|f| f.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

fn fragments_fallback(script: &str) -> Vec<String> {
    fragments(&SENTENCE_SPLIT, script, MIN_SENTENCE_CHARS)
}

/// Narration time for a piece of text, in whole seconds.
pub fn estimate_duration(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    (words / WORDS_PER_SECOND)
        .ceil()
        .clamp(MIN_SEGMENT_SECS, MAX_SEGMENT_SECS)
}

/// Title derived from the first segment.
pub fn derive_title(segments: &[ScriptSegment]) -> String {
    segments
        .first()
        .map(|s| title_from_text(&s.narration))
        .unwrap_or_default()
}

/// First characters of `text`, marked with `...` when cut.
pub fn title_from_text(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > TITLE_CHARS {
        let mut title: String = text.chars().take(TITLE_CHARS).collect();
        title.push_str("...");
        title
    } else {
        text.to_string()
    }
}

/// Assemble segments into a validated script.
pub fn into_parsed_script(title: Option<&str>, segments: Vec<ScriptSegment>) -> ParsedScript {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| derive_title(&segments));
    ParsedScript::from_scenes(title, segments.into_iter().map(Scene::from).collect())
}
