//! Time-stamped transcript types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One transcribed word with millisecond timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptWord {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TranscriptWord {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }

    /// Whether the word closes a sentence (`.`, `!` or `?`).
    pub fn ends_sentence(&self) -> bool {
        self.text
            .trim_end()
            .ends_with(|c: char| matches!(c, '.' | '!' | '?'))
    }
}

/// Consecutive words closed by terminal punctuation, or the unterminated tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl Sentence {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ends_sentence() {
        assert!(TranscriptWord::new("love.", 0, 10).ends_sentence());
        assert!(TranscriptWord::new("not?", 0, 10).ends_sentence());
        assert!(TranscriptWord::new("wow!!", 0, 10).ends_sentence());
        assert!(!TranscriptWord::new("and,", 0, 10).ends_sentence());
    }

    #[test]
    fn test_sentence_duration_saturates() {
        let s = Sentence {
            text: "x".to_string(),
            start_ms: 500,
            end_ms: 100,
        };
        assert_eq!(s.duration_ms(), 0);
    }
}
