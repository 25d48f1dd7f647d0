//! Sentence-variety analyzer: repetitive sentence openings.
//!
//! Flags runs of sentences opening with the same word, over-reliance on
//! pronoun starters, too many `The` openings, and weak starters.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::sentence_spans;

const MIN_TEXT_LEN: usize = 100;
/// Starter counting is exact, but segmentation noise caps confidence.
const ANALYZER_CONFIDENCE: f64 = 0.7;
const MIN_STARTERS: usize = 5;
const CONSECUTIVE_INFO: usize = 3;
const CONSECUTIVE_WARNING: usize = 4;
const PRONOUN_SHARE_THRESHOLD: f64 = 0.4;
const THE_SHARE_THRESHOLD: f64 = 0.25;
const WEAK_SHARE_THRESHOLD: f64 = 0.2;

const PRONOUN_STARTERS: [&str; 13] = [
    "he", "she", "they", "i", "we", "it", "you", "his", "her", "their", "my", "our", "your",
];

const WEAK_STARTERS: [&str; 9] = [
    "there", "this", "that", "these", "those", "here", "it", "what", "which",
];

static FIRST_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^["'\u{201C}\s]*([A-Za-z]+)"#).expect("first word regex"));

/// First word of each sentence with its byte offsets in the text.
fn extract_starters(text: &str) -> Vec<(String, usize, usize)> {
    let mut starters = Vec::new();
    for sentence in sentence_spans(text) {
        if let Some(caps) = FIRST_WORD_RE.captures(&sentence.text) {
            if let Some(word) = caps.get(1) {
                let start = sentence.start + word.start();
                let end = sentence.start + word.end();
                starters.push((word.as_str().to_lowercase(), start, end));
            }
        }
    }
    starters
}

/// Analyze sentence starters for repetition patterns.
pub fn analyze(text: &str) -> Vec<Suggestion> {
    if text.trim().len() < MIN_TEXT_LEN {
        return Vec::new();
    }

    let starters = extract_starters(text);
    if starters.len() < MIN_STARTERS {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    suggestions.extend(find_consecutive_repetition(&starters));
    suggestions.extend(check_distribution(&starters));
    suggestions.extend(check_weak_starters(&starters));
    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

fn alternative_suggestion(word: &str) -> String {
    let alternatives = if PRONOUN_STARTERS.contains(&word) {
        "Try opening with an action, a sensory detail, or a dependent clause \
         (When she arrived…, Although tired…) instead of the pronoun."
    } else if word == "the" {
        "Try opening with a character, an action, or a prepositional phrase \
         (Beyond the wall…, In the distance…) instead of 'The'."
    } else {
        "Vary the opening: action, dialogue, a participial phrase (Running \
         quickly…), or an adverb (Slowly, Suddenly) all break the pattern."
    };
    format!(
        "Several sentences in a row start with '{word}'. {alternatives}"
    )
}

fn find_consecutive_repetition(starters: &[(String, usize, usize)]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let mut i = 0;

    while i < starters.len() {
        let word = &starters[i].0;
        let mut j = i + 1;
        while j < starters.len() && starters[j].0 == *word {
            j += 1;
        }
        let count = j - i;

        if count >= CONSECUTIVE_INFO {
            let severity = if count >= CONSECUTIVE_WARNING {
                Severity::Warning
            } else {
                Severity::Info
            };
            let start = starters[i].1;
            let end = starters[j - 1].2;
            let capitalized = {
                let mut c = word.chars();
                match c.next() {
                    Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
                    None => String::new(),
                }
            };
            suggestions.push(
                Suggestion::new(
                    SuggestionType::SentenceVariety,
                    severity,
                    format!("{count} consecutive sentences start with '{capitalized}'"),
                    alternative_suggestion(word),
                )
                .at(start, end)
                .highlight(word.clone())
                .meta("repeated_word", json!(word))
                .meta("consecutive_count", json!(count))
                .meta("pattern_type", json!("consecutive")),
            );
        }

        i = j;
    }

    suggestions
}

fn check_distribution(starters: &[(String, usize, usize)]) -> Vec<Suggestion> {
    let total = starters.len() as f64;
    let mut suggestions = Vec::new();

    let pronoun_count = starters
        .iter()
        .filter(|(w, ..)| PRONOUN_STARTERS.contains(&w.as_str()))
        .count();
    let pronoun_share = pronoun_count as f64 / total;
    if pronoun_share > PRONOUN_SHARE_THRESHOLD {
        suggestions.push(
            Suggestion::new(
                SuggestionType::SentenceVariety,
                Severity::Info,
                format!(
                    "{:.0}% of sentences start with a pronoun",
                    pronoun_share * 100.0
                ),
                "Heavy pronoun openings (He…, She…, They…) flatten the rhythm. Lead \
                 with action, setting, or subordinate clauses for variety.",
            )
            .meta("pronoun_share", json!(pronoun_share))
            .meta("pattern_type", json!("pronoun_distribution")),
        );
    }

    let the_count = starters.iter().filter(|(w, ..)| w == "the").count();
    let the_share = the_count as f64 / total;
    if the_share > THE_SHARE_THRESHOLD {
        suggestions.push(
            Suggestion::new(
                SuggestionType::SentenceVariety,
                Severity::Info,
                format!("{:.0}% of sentences start with 'The'", the_share * 100.0),
                "Many 'The…' openings in a row read like inventory. Recast some \
                 sentences around characters or actions.",
            )
            .meta("the_share", json!(the_share))
            .meta("pattern_type", json!("article_distribution")),
        );
    }

    suggestions
}

fn check_weak_starters(starters: &[(String, usize, usize)]) -> Vec<Suggestion> {
    let total = starters.len() as f64;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (word, ..) in starters {
        if let Some(weak) = WEAK_STARTERS.iter().find(|w| **w == word.as_str()) {
            *counts.entry(weak).or_insert(0) += 1;
        }
    }

    let weak_total: usize = counts.values().sum();
    if weak_total as f64 / total > WEAK_SHARE_THRESHOLD {
        let mut examples: Vec<(&str, usize)> = counts.into_iter().collect();
        examples.sort_by(|a, b| b.1.cmp(&a.1));
        let listed = examples
            .iter()
            .take(3)
            .map(|(w, c)| format!("'{w}' ({c}x)"))
            .collect::<Vec<_>>()
            .join(", ");
        return vec![Suggestion::new(
            SuggestionType::SentenceVariety,
            Severity::Info,
            format!("Weak sentence starters: {listed}"),
            "Openings like 'There was…' and 'It is…' bury the subject. Name who acts \
             or what changes instead.",
        )
        .meta("weak_share", json!(weak_total as f64 / total))
        .meta("pattern_type", json!("weak_starters"))];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_skipped() {
        assert!(analyze("She left. He stayed.").is_empty());
    }

    #[test]
    fn test_three_consecutive_is_info() {
        let text = "Mira opened the gate and walked through slowly. \
                    Mira counted the steps up to the tower door. \
                    Mira knocked twice and waited for an answer. \
                    Nobody came to the door that first evening. \
                    Rain began somewhere over the far hills.";
        let suggestions = analyze(text);
        let rep = suggestions
            .iter()
            .find(|s| s.metadata.get("pattern_type") == Some(&json!("consecutive")))
            .expect("consecutive repetition");
        assert_eq!(rep.severity, Severity::Info);
        assert!(rep.message.contains("3 consecutive"));
    }

    #[test]
    fn test_four_consecutive_is_warning() {
        let text = "Mira opened the gate and walked through slowly. \
                    Mira counted the steps up to the tower door. \
                    Mira knocked twice and waited for an answer. \
                    Mira turned back toward the empty courtyard. \
                    Rain began somewhere over the far hills.";
        let suggestions = analyze(text);
        let rep = suggestions
            .iter()
            .find(|s| s.metadata.get("pattern_type") == Some(&json!("consecutive")))
            .expect("consecutive repetition");
        assert_eq!(rep.severity, Severity::Warning);
    }

    #[test]
    fn test_consecutive_offsets_point_at_first_words() {
        let text = "Mira opened the gate and walked through slowly. \
                    Mira counted the steps up to the tower door. \
                    Mira knocked twice and waited for an answer. \
                    Nobody came to the door that first evening. \
                    Rain began somewhere over the far hills.";
        let suggestions = analyze(text);
        let rep = suggestions
            .iter()
            .find(|s| s.metadata.get("pattern_type") == Some(&json!("consecutive")))
            .expect("consecutive repetition");
        let start = rep.start_char.unwrap();
        assert_eq!(&text[start..start + 4], "Mira");
    }

    #[test]
    fn test_pronoun_share_flagged() {
        let text = "He walked to the well before first light. \
                    She followed at a careful distance behind. \
                    He drew the water without a single word. \
                    She watched the rope fray near the handle. \
                    He carried both buckets back up the path.";
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.metadata.get("pattern_type") == Some(&json!("pronoun_distribution"))));
    }

    #[test]
    fn test_the_share_flagged() {
        let text = "The well stood dry at the edge of town. \
                    The rope had frayed down to a few strands. \
                    The bucket lay cracked beside the low wall. \
                    Nobody had drawn water there for years. \
                    Crows perched along the roofline at dusk.";
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.metadata.get("pattern_type") == Some(&json!("article_distribution"))));
    }

    #[test]
    fn test_varied_starters_pass_clean() {
        let text = "Mira opened the gate at dawn that morning. \
                    Beyond the wall, fog hid the lower fields. \
                    Crows scattered when the bell finally rang. \
                    Someone had left the lantern burning all night. \
                    Rain came in from the west before noon.";
        let suggestions = analyze(text);
        assert!(suggestions.is_empty());
    }
}
