//! Word-choice analyzer: weak words, telling verbs, filter phrases,
//! close-proximity repetition, and clichés.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::patterns::{CLICHE_PATTERNS, FILTER_PHRASES, TELLING_VERBS, WEAK_WORDS};
use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::tokenize_words;

const MIN_TEXT_LEN: usize = 20;
/// Word-list matching is the loosest heuristic of the set.
const ANALYZER_CONFIDENCE: f64 = 0.6;
const WEAK_WORD_THRESHOLD: usize = 3;
const TELLING_VERB_THRESHOLD: usize = 2;
const FILTER_PHRASE_THRESHOLD: usize = 3;
const REPETITION_WINDOW: usize = 20;
const REPETITION_MIN_LEN: usize = 3;

static TELLING_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    TELLING_VERBS
        .iter()
        .map(|verb| {
            let re = Regex::new(&format!(r"(?i)\b(he|she|they|I)\s+{verb}\b")).expect("telling regex");
            (*verb, re)
        })
        .collect()
});

static FILTER_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    FILTER_PHRASES
        .iter()
        .map(|phrase| {
            let re = Regex::new(&format!(r"(?i)\b{phrase}\b")).expect("filter regex");
            (*phrase, re)
        })
        .collect()
});

/// Analyze text for word-usage issues.
pub fn analyze(text: &str) -> Vec<Suggestion> {
    if text.trim().len() < MIN_TEXT_LEN {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    suggestions.extend(check_weak_words(text));
    suggestions.extend(check_telling_verbs(text));
    suggestions.extend(check_filter_phrases(text));
    suggestions.extend(check_repetition(text));
    suggestions.extend(check_cliches(text));
    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

fn check_weak_words(text: &str) -> Vec<Suggestion> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in tokenize_words(&text.to_lowercase()) {
        if let Some(weak) = WEAK_WORDS.iter().find(|w| **w == word) {
            *counts.entry(weak).or_insert(0) += 1;
        }
    }

    let mut flagged: Vec<(&str, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count > WEAK_WORD_THRESHOLD)
        .collect();
    flagged.sort_by(|a, b| b.1.cmp(&a.1));

    flagged
        .into_iter()
        .map(|(word, count)| {
            Suggestion::new(
                SuggestionType::WordChoice,
                Severity::Info,
                format!("'{word}' used {count} times"),
                format!(
                    "'{word}' often weakens prose. Consider removing or replacing for \
                     stronger writing."
                ),
            )
            .highlight(word)
            .meta("count", json!(count))
        })
        .collect()
}

fn check_telling_verbs(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for (verb, re) in TELLING_RES.iter() {
        let count = re.find_iter(text).count();
        if count > TELLING_VERB_THRESHOLD {
            suggestions.push(
                Suggestion::new(
                    SuggestionType::ShowNotTell,
                    Severity::Info,
                    format!("Potential telling: '{verb}' used {count} times"),
                    "Consider showing the emotion or thought through action, dialogue, \
                     or physical description instead.",
                )
                .highlight(*verb)
                .meta("verb", json!(verb))
                .meta("count", json!(count)),
            );
        }
    }

    suggestions
}

fn check_filter_phrases(text: &str) -> Vec<Suggestion> {
    let mut total = 0usize;
    let mut found: Vec<(&str, usize)> = Vec::new();

    for (phrase, re) in FILTER_RES.iter() {
        let count = re.find_iter(text).count();
        if count > 0 {
            total += count;
            found.push((phrase, count));
        }
    }

    if total > FILTER_PHRASE_THRESHOLD {
        let examples = found
            .iter()
            .take(3)
            .map(|(phrase, count)| format!("'{phrase}' ({count}x)"))
            .collect::<Vec<_>>()
            .join(", ");
        return vec![Suggestion::new(
            SuggestionType::WordChoice,
            Severity::Info,
            format!("Filter words found: {examples}"),
            "Filter words can distance readers from the action. Try removing them for \
             more immediate prose.",
        )
        .meta("filter_count", json!(total))
        .meta("examples", json!(found))];
    }

    Vec::new()
}

fn check_repetition(text: &str) -> Vec<Suggestion> {
    let words: Vec<String> = tokenize_words(&text.to_lowercase());
    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, word) in words.iter().enumerate() {
        if word.len() > REPETITION_MIN_LEN && word.chars().all(|c| c.is_alphabetic()) {
            positions.entry(word.as_str()).or_default().push(i);
        }
    }

    let mut flagged: Vec<(&str, usize)> = Vec::new();
    for (word, positions) in &positions {
        for pair in positions.windows(2) {
            let distance = pair[1] - pair[0];
            if distance < REPETITION_WINDOW {
                flagged.push((word, distance));
                break; // One report per word.
            }
        }
    }
    flagged.sort();

    flagged
        .into_iter()
        .map(|(word, distance)| {
            Suggestion::new(
                SuggestionType::Repetition,
                Severity::Info,
                format!("'{word}' repeated within {distance} words"),
                "Consider using a synonym or rephrasing to avoid repetition.",
            )
            .highlight(word)
            .meta("distance", json!(distance))
        })
        .collect()
}

fn check_cliches(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for re in CLICHE_PATTERNS.iter() {
        for m in re.find_iter(text) {
            suggestions.push(
                Suggestion::new(
                    SuggestionType::WordChoice,
                    Severity::Info,
                    format!("Cliché detected: '{}'", m.as_str()),
                    "Consider replacing this cliché with fresh, original phrasing.",
                )
                .at(m.start(), m.end())
                .highlight(m.as_str()),
            );
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_word_over_threshold() {
        let text = "It was just a door. He just stood there. She just watched. \
                    They just waited for morning.";
        let suggestions = analyze(text);
        let weak = suggestions
            .iter()
            .find(|s| {
                s.suggestion_type == SuggestionType::WordChoice
                    && s.message.starts_with("'just'")
            })
            .expect("weak word flag");
        assert!(weak.message.contains("4 times"));
    }

    #[test]
    fn test_weak_word_at_threshold_not_flagged() {
        let text = "It was just a door. He just stood there. She just watched the rain fall.";
        let suggestions = analyze(text);
        assert!(!suggestions.iter().any(|s| {
            s.suggestion_type == SuggestionType::WordChoice && s.message.starts_with("'just'")
        }));
    }

    #[test]
    fn test_telling_verbs_flagged() {
        let text = "She felt cold. He felt uneasy. They felt the ground shift. She felt it too.";
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.suggestion_type == SuggestionType::ShowNotTell));
    }

    #[test]
    fn test_filter_phrases_aggregate() {
        let text = "He started to run. She began to cry. They tried to hide. \
                    He seemed to shrink.";
        let suggestions = analyze(text);
        let filter = suggestions
            .iter()
            .find(|s| s.message.starts_with("Filter words"))
            .expect("filter aggregate");
        assert_eq!(filter.metadata.get("filter_count"), Some(&json!(4)));
    }

    #[test]
    fn test_repetition_within_window() {
        let text = "The lantern swung in the dark, and the lantern threw long shadows.";
        let suggestions = analyze(text);
        let rep = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::Repetition)
            .expect("repetition flag");
        assert_eq!(rep.highlight_word.as_deref(), Some("lantern"));
    }

    #[test]
    fn test_repetition_outside_window_ignored() {
        let filler = "word ".repeat(25);
        let text = format!("The lantern swung in the dark. {filler} Then the lantern died.");
        let suggestions = analyze(&text);
        assert!(!suggestions
            .iter()
            .any(|s| s.highlight_word.as_deref() == Some("lantern")));
    }

    #[test]
    fn test_cliche_detection_with_offsets() {
        let text = "It was, at the end of the day, a matter of luck.";
        let suggestions = analyze(text);
        let cliche = suggestions
            .iter()
            .find(|s| s.message.starts_with("Cliché"))
            .expect("cliche flag");
        let (start, end) = (cliche.start_char.unwrap(), cliche.end_char.unwrap());
        assert_eq!(&text[start..end], "at the end of the day");
    }
}
