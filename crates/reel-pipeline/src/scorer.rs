//! Transcript windowing and virality scoring.
//!
//! Words are grouped into sentences, sentences are packed greedily into
//! windows of at most `max_window`, windows shorter than `min_window` are
//! dropped, and the rest are scored and ranked.

use reel_models::{ClipCandidate, Sentence, TranscriptWord};

const BASE_SCORE: u32 = 70;
const QUESTION_BONUS: u32 = 10;
const EXCLAMATION_BONUS: u32 = 5;
const KEYWORD_BONUS: u32 = 8;
const MAX_SCORE: u32 = 99;

/// Characters of window text kept in a candidate title.
const TITLE_CHARS: usize = 70;

/// Phrases that mark engaging content. Matched case-insensitively as substrings.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "secret", "mistake", "reason", "how to", "why", "what", "the best",
];

/// Scorer configuration.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Shortest window kept, in milliseconds
    pub min_window_ms: u64,
    /// Longest window built from several sentences, in milliseconds
    pub max_window_ms: u64,
    /// Number of ranked candidates returned
    pub top_n: usize,
    /// Lowercase keyword phrases
    pub keywords: Vec<String>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            min_window_ms: 15_000,
            max_window_ms: 60_000,
            top_n: 5,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Pure, deterministic candidate selection over a transcript.
#[derive(Debug, Clone, Default)]
pub struct SegmentScorer {
    config: ScorerConfig,
}

impl SegmentScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Ranked candidates for a transcript. Empty input gives an empty result.
    pub fn score(&self, words: &[TranscriptWord]) -> Vec<ClipCandidate> {
        let sentences = group_sentences(words);
        let windows = self.build_windows(&sentences);

        let mut candidates: Vec<ClipCandidate> = windows
            .into_iter()
            .filter(|w| w.duration_ms() >= self.config.min_window_ms)
            .map(|w| self.to_candidate(&w))
            .collect();

        // Vec::sort_by is stable; ties fall back to start time explicitly anyway
        candidates.sort_by(|a, b| {
            b.virality_score.cmp(&a.virality_score).then(
                a.start_time_sec
                    .partial_cmp(&b.start_time_sec)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        candidates.truncate(self.config.top_n);
        candidates
    }

    /// Greedy packing of consecutive sentences.
    ///
    /// A window is closed when the next sentence would stretch it past
    /// `max_window_ms`. A sentence that is itself longer than the cap closes
    /// the open window and becomes a window of its own.
    ///
    /// The cap applies to the window's span on the timeline, pauses
    /// included, not to the sum of its sentence durations. A clip cut from a
    /// window therefore never runs past the cap, at the cost of packing
    /// fewer sentences when the speaker pauses between them.
    pub fn build_windows(&self, sentences: &[Sentence]) -> Vec<Sentence> {
        let max = self.config.max_window_ms;
        let mut windows = Vec::new();
        let mut current: Option<Sentence> = None;

        for sentence in sentences {
            if sentence.duration_ms() > max {
                windows.extend(current.take());
                windows.push(sentence.clone());
                continue;
            }

            match current.as_mut() {
                Some(window) if sentence.end_ms.saturating_sub(window.start_ms) <= max => {
                    window.text.push(' ');
                    window.text.push_str(&sentence.text);
                    window.end_ms = window.end_ms.max(sentence.end_ms);
                }
                _ => {
                    windows.extend(current.replace(sentence.clone()));
                }
            }
        }

        windows.extend(current);
        windows
    }

    /// Virality score of a window's text.
    pub fn score_text(&self, text: &str) -> u8 {
        let lower = text.to_lowercase();
        let mut score = BASE_SCORE;

        if lower.contains('?') {
            score += QUESTION_BONUS;
        }
        if lower.contains('!') {
            score += EXCLAMATION_BONUS;
        }

        let hits = self
            .config
            .keywords
            .iter()
            .filter(|k| lower.contains(k.as_str()))
            .count() as u32;
        score += hits * KEYWORD_BONUS;

        score.min(MAX_SCORE) as u8
    }

    fn to_candidate(&self, window: &Sentence) -> ClipCandidate {
        ClipCandidate {
            start_time_sec: window.start_ms as f64 / 1000.0,
            end_time_sec: window.end_ms as f64 / 1000.0,
            duration_sec: window.duration_ms() as f64 / 1000.0,
            title: make_title(&window.text),
            virality_score: self.score_text(&window.text),
        }
    }
}

/// Group words into sentences closed by `.`, `!` or `?`.
///
/// A trailing run of words without terminal punctuation still forms a sentence.
pub fn group_sentences(words: &[TranscriptWord]) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut current: Option<Sentence> = None;

    for word in words {
        let text = word.text.trim();
        if text.is_empty() {
            continue;
        }

        let sentence = current.get_or_insert_with(|| Sentence {
            text: String::new(),
            start_ms: word.start_ms,
            end_ms: word.end_ms,
        });
        if !sentence.text.is_empty() {
            sentence.text.push(' ');
        }
        sentence.text.push_str(text);
        sentence.end_ms = sentence.end_ms.max(word.end_ms);

        if word.ends_sentence() {
            sentences.extend(current.take());
        }
    }

    sentences.extend(current);
    sentences
}

fn make_title(text: &str) -> String {
    let mut title: String = text.chars().take(TITLE_CHARS).collect();
    title.push_str("...");
    title
}
