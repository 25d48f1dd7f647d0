//! Style analyzer: sentence rhythm, passive voice, adverb density, and
//! paragraph length.

use serde_json::json;

use crate::patterns::{ACCEPTED_ADVERBS, ADVERB_RE, PASSIVE_VOICE_PATTERNS};
use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::{count_words, split_paragraphs, split_sentences, tokenize_words};

const MIN_TEXT_LEN: usize = 50;
/// Heuristic style checks carry moderate confidence.
const ANALYZER_CONFIDENCE: f64 = 0.7;
const LOW_VARIANCE_THRESHOLD: f64 = 3.0;
const LONG_AVG_SENTENCE: f64 = 25.0;
const PASSIVE_RATIO_THRESHOLD: f64 = 0.3;
const ADVERB_RATIO_THRESHOLD: f64 = 0.05;
const LONG_PARAGRAPH_WORDS: usize = 200;

/// Analyze text for style issues. Idempotent; returns an empty list for
/// text too short to judge.
pub fn analyze(text: &str) -> Vec<Suggestion> {
    if text.trim().len() < MIN_TEXT_LEN {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    suggestions.extend(check_sentence_variance(text));
    suggestions.extend(check_passive_voice(text));
    suggestions.extend(check_adverb_density(text));
    suggestions.extend(check_paragraph_length(text));
    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

fn check_sentence_variance(text: &str) -> Vec<Suggestion> {
    let sentences = split_sentences(text);
    if sentences.len() < 3 {
        return Vec::new();
    }

    let lengths: Vec<f64> = sentences.iter().map(|s| count_words(s) as f64).collect();
    let avg = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let variance = lengths.iter().map(|l| (l - avg).powi(2)).sum::<f64>() / lengths.len() as f64;
    let std_dev = variance.sqrt();

    let mut suggestions = Vec::new();

    if std_dev < LOW_VARIANCE_THRESHOLD && sentences.len() >= 5 {
        suggestions.push(
            Suggestion::new(
                SuggestionType::Style,
                Severity::Info,
                "Sentence lengths are very uniform",
                "Consider varying sentence length for better rhythm. Mix short punchy \
                 sentences with longer flowing ones.",
            )
            .meta("avg_length", json!(avg))
            .meta("std_dev", json!(std_dev))
            .meta("sentence_count", json!(sentences.len())),
        );
    }

    if avg > LONG_AVG_SENTENCE {
        suggestions.push(
            Suggestion::new(
                SuggestionType::Style,
                Severity::Warning,
                format!("Average sentence length is {avg:.1} words"),
                "Consider breaking up some longer sentences for better readability.",
            )
            .meta("avg_length", json!(avg)),
        );
    }

    suggestions
}

fn check_passive_voice(text: &str) -> Vec<Suggestion> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let passive_count: usize = PASSIVE_VOICE_PATTERNS
        .iter()
        .map(|re| re.find_iter(text).count())
        .sum();
    let ratio = passive_count as f64 / sentences.len() as f64;

    if ratio > PASSIVE_RATIO_THRESHOLD {
        return vec![Suggestion::new(
            SuggestionType::Voice,
            Severity::Warning,
            format!(
                "High passive voice usage ({passive_count} instances in {} sentences)",
                sentences.len()
            ),
            "Consider using active voice for stronger, more direct prose. Active voice \
             often creates more engaging scenes.",
        )
        .meta("passive_count", json!(passive_count))
        .meta("sentence_count", json!(sentences.len()))
        .meta("passive_ratio", json!(ratio))];
    }

    Vec::new()
}

fn check_adverb_density(text: &str) -> Vec<Suggestion> {
    let words = tokenize_words(text);
    if words.is_empty() {
        return Vec::new();
    }

    let adverbs: Vec<String> = ADVERB_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|adv| !ACCEPTED_ADVERBS.contains(&adv.to_lowercase().as_str()))
        .collect();
    let ratio = adverbs.len() as f64 / words.len() as f64;

    if ratio > ADVERB_RATIO_THRESHOLD {
        let examples: Vec<&str> = adverbs.iter().take(5).map(|s| s.as_str()).collect();
        return vec![Suggestion::new(
            SuggestionType::Style,
            Severity::Info,
            format!("High adverb density ({} -ly words)", adverbs.len()),
            "Too many adverbs can weaken prose. Consider replacing with stronger verbs \
             or showing actions instead.",
        )
        .meta("adverb_count", json!(adverbs.len()))
        .meta("word_count", json!(words.len()))
        .meta("examples", json!(examples))];
    }

    Vec::new()
}

fn check_paragraph_length(text: &str) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for (i, paragraph) in split_paragraphs(text).iter().enumerate() {
        let word_count = count_words(paragraph);
        if word_count > LONG_PARAGRAPH_WORDS {
            suggestions.push(
                Suggestion::new(
                    SuggestionType::Style,
                    Severity::Info,
                    format!("Long paragraph ({word_count} words)"),
                    "Consider breaking this paragraph into smaller chunks for better \
                     readability.",
                )
                .meta("paragraph_index", json!(i))
                .meta("word_count", json!(word_count)),
            );
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_skipped() {
        assert!(analyze("Too short.").is_empty());
    }

    #[test]
    fn test_uniform_sentences_flagged() {
        // Five sentences, each exactly six words: std dev 0.
        let text = "The dog ran over the hill. The cat sat under the tree. \
                    The bird flew over the lake. The fox hid under the log. \
                    The owl slept inside the barn.";
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.message.contains("very uniform")));
    }

    #[test]
    fn test_passive_voice_flagged() {
        let text = "The gate was opened by the guard. The letter was written by Mira. \
                    The bread was eaten by the boy. The song was sung by the choir.";
        let suggestions = analyze(text);
        let passive = suggestions
            .iter()
            .find(|s| s.suggestion_type == SuggestionType::Voice)
            .expect("passive voice warning");
        assert_eq!(passive.severity, Severity::Warning);
    }

    #[test]
    fn test_adverb_density_flagged() {
        let text = "He quickly and quietly walked slowly toward the softly glowing, \
                    eerily silent house, carefully stepping lightly on the noisily creaking boards.";
        let suggestions = analyze(text);
        assert!(suggestions
            .iter()
            .any(|s| s.message.contains("adverb density")));
    }

    #[test]
    fn test_accepted_adverbs_not_counted() {
        let text = "It was early. The friendly neighbor waved from the lovely porch and \
                    said nothing more about the daily routine they shared in town.";
        let suggestions = analyze(text);
        assert!(!suggestions
            .iter()
            .any(|s| s.message.contains("adverb density")));
    }

    #[test]
    fn test_long_paragraph_flagged() {
        let sentence = "The caravan crossed the ford and counted wagons before dark. ";
        let long_paragraph = sentence.repeat(25);
        let suggestions = analyze(&long_paragraph);
        assert!(suggestions.iter().any(|s| s.message.contains("Long paragraph")));
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let text = "The gate was opened by the guard. The letter was written by Mira. \
                    The bread was eaten by the boy. The song was sung by the choir.";
        let first = analyze(text);
        let second = analyze(text);
        assert_eq!(first.len(), second.len());
    }
}
