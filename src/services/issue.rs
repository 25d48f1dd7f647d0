//! Shared suggestion types produced by the writing analyzers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What aspect of the prose a suggestion addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionType {
    Grammar,
    Style,
    WordChoice,
    Consistency,
    Pacing,
    Voice,
    Repetition,
    ShowNotTell,
    Dialogue,
    DialogueTags,
    Readability,
    SentenceVariety,
    OverusedPhrase,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Grammar => "GRAMMAR",
            SuggestionType::Style => "STYLE",
            SuggestionType::WordChoice => "WORD_CHOICE",
            SuggestionType::Consistency => "CONSISTENCY",
            SuggestionType::Pacing => "PACING",
            SuggestionType::Voice => "VOICE",
            SuggestionType::Repetition => "REPETITION",
            SuggestionType::ShowNotTell => "SHOW_NOT_TELL",
            SuggestionType::Dialogue => "DIALOGUE",
            SuggestionType::DialogueTags => "DIALOGUE_TAGS",
            SuggestionType::Readability => "READABILITY",
            SuggestionType::SentenceVariety => "SENTENCE_VARIETY",
            SuggestionType::OverusedPhrase => "OVERUSED_PHRASE",
        }
    }
}

/// How strongly a suggestion should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Gentle suggestion
    Info,
    /// Should probably address
    Warning,
    /// Definite issue
    Error,
}

/// A single position-anchored writing suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion_type: SuggestionType,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
    pub start_char: Option<usize>,
    pub end_char: Option<usize>,
    pub highlight_word: Option<String>,
    pub replacement: Option<String>,
    /// How reliable the producing analyzer's findings are, 0.0-1.0. The
    /// unifier filters against the configured minimum.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Suggestion {
    pub fn new(
        suggestion_type: SuggestionType,
        severity: Severity,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            suggestion_type,
            severity,
            message: message.into(),
            suggestion: suggestion.into(),
            start_char: None,
            end_char: None,
            highlight_word: None,
            replacement: None,
            confidence: None,
            metadata: HashMap::new(),
        }
    }

    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.start_char = Some(start);
        self.end_char = Some(end);
        self
    }

    pub fn highlight(mut self, word: impl Into<String>) -> Self {
        self.highlight_word = Some(word.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_builder_sets_positions() {
        let s = Suggestion::new(SuggestionType::Style, Severity::Info, "m", "s").at(3, 9);
        assert_eq!(s.start_char, Some(3));
        assert_eq!(s.end_char, Some(9));
        assert!(s.confidence.is_none());
    }

    #[test]
    fn test_confidence_clamped() {
        let s = Suggestion::new(SuggestionType::Style, Severity::Info, "m", "s")
            .with_confidence(1.7);
        assert_eq!(s.confidence, Some(1.0));
    }
}
