//! Lightweight mechanics checks for the realtime feedback path.
//!
//! These are the fast, self-contained checks that can run on every
//! keystroke-debounce: doubled words, spacing around punctuation, and
//! uncapitalized sentence openings. Full grammar checking is an external
//! collaborator and out of scope here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::sentence_spans;

static DOUBLED_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z]+)\s+([A-Za-z]+)\b").expect("doubled word regex"));

static SPACE_BEFORE_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[,.;:!?]").expect("space punct regex"));

/// Mechanics rules rarely misfire.
const ANALYZER_CONFIDENCE: f64 = 0.9;

/// Rule ids attached to mechanics findings; `ignored_rules` filters on them.
pub const RULE_DOUBLED_WORD: &str = "DOUBLED_WORD";
pub const RULE_SPACE_BEFORE_PUNCT: &str = "SPACE_BEFORE_PUNCTUATION";
pub const RULE_LOWERCASE_SENTENCE: &str = "LOWERCASE_SENTENCE_START";

/// Run the fast mechanics checks.
pub fn analyze(text: &str) -> Vec<Suggestion> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut suggestions = Vec::new();

    for caps in DOUBLED_WORD_RE.captures_iter(text) {
        let first = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let second = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        if !first.is_empty() && first.eq_ignore_ascii_case(second) {
            let whole = caps.get(0).expect("match");
            suggestions.push(
                Suggestion::new(
                    SuggestionType::Grammar,
                    Severity::Warning,
                    format!("Doubled word: '{first} {second}'"),
                    format!("Remove the repeated '{second}'."),
                )
                .at(whole.start(), whole.end())
                .highlight(second)
                .meta("rule_id", json!(RULE_DOUBLED_WORD)),
            );
        }
    }

    for m in SPACE_BEFORE_PUNCT_RE.find_iter(text) {
        suggestions.push(
            Suggestion::new(
                SuggestionType::Grammar,
                Severity::Info,
                "Space before punctuation",
                "Remove the space before the punctuation mark.",
            )
            .at(m.start(), m.end())
            .meta("rule_id", json!(RULE_SPACE_BEFORE_PUNCT)),
        );
    }

    for sentence in sentence_spans(text) {
        let first = sentence.text.chars().next();
        if let Some(c) = first {
            if c.is_lowercase() {
                suggestions.push(
                    Suggestion::new(
                        SuggestionType::Grammar,
                        Severity::Info,
                        "Sentence starts with a lowercase letter",
                        "Capitalize the first word of the sentence.",
                    )
                    .at(sentence.start, sentence.start + c.len_utf8())
                    .meta("rule_id", json!(RULE_LOWERCASE_SENTENCE)),
                );
            }
        }
    }

    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}
