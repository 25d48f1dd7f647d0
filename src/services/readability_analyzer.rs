//! Readability analyzer: Flesch-Kincaid, Flesch reading ease, Gunning Fog,
//! Coleman-Liau, and ARI, compared against genre target bands.

use serde_json::json;

use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::{count_complex_words, count_letters, count_syllables, count_words, split_sentences};

const MIN_TEXT_LEN: usize = 100;
/// Established formulas over exact counts; high confidence.
const ANALYZER_CONFIDENCE: f64 = 0.8;
const BAND_SLACK: f64 = 2.0;
const WARNING_SLACK: f64 = 4.0;

/// Genre target grade bands: (min, max, ideal).
const GENRE_TARGETS: [(&str, f64, f64, f64); 11] = [
    ("young_adult", 5.0, 8.0, 6.0),
    ("middle_grade", 4.0, 6.0, 5.0),
    ("adult_fiction", 7.0, 11.0, 8.0),
    ("literary_fiction", 9.0, 14.0, 11.0),
    ("thriller", 5.0, 9.0, 7.0),
    ("romance", 5.0, 8.0, 6.0),
    ("fantasy", 7.0, 12.0, 9.0),
    ("sci_fi", 8.0, 13.0, 10.0),
    ("horror", 6.0, 10.0, 8.0),
    ("mystery", 6.0, 10.0, 8.0),
    ("historical", 8.0, 12.0, 10.0),
];

/// All computed readability metrics for a text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReadabilityMetrics {
    pub flesch_kincaid_grade: f64,
    pub flesch_reading_ease: f64,
    pub gunning_fog: f64,
    pub coleman_liau: f64,
    pub ari: f64,
    pub average_grade: f64,
    pub sentence_count: usize,
    pub word_count: usize,
    pub avg_words_per_sentence: f64,
    pub avg_syllables_per_word: f64,
    pub complex_word_percentage: f64,
}

/// Target band for a genre (falls back to adult_fiction).
pub fn genre_band(genre: &str) -> (f64, f64, f64) {
    GENRE_TARGETS
        .iter()
        .find(|(name, ..)| *name == genre)
        .or_else(|| GENRE_TARGETS.iter().find(|(name, ..)| *name == "adult_fiction"))
        .map(|(_, min, max, ideal)| (*min, *max, *ideal))
        .unwrap_or((7.0, 11.0, 8.0))
}

/// Compute all readability metrics. Returns None when the text has no
/// sentences or words to measure.
pub fn calculate_metrics(text: &str) -> Option<ReadabilityMetrics> {
    let sentences = split_sentences(text).len();
    let words = count_words(text);
    if sentences == 0 || words == 0 {
        return None;
    }

    let syllables = count_syllables(text);
    let characters = count_letters(text);
    let complex_words = count_complex_words(text);

    let words_per_sentence = words as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words as f64;
    let chars_per_word = characters as f64 / words as f64;

    let fk_grade = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;
    let fk_ease =
        (206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word).clamp(0.0, 100.0);
    let fog = 0.4 * (words_per_sentence + 100.0 * (complex_words as f64 / words as f64));
    let l = chars_per_word * 100.0;
    let s = (sentences as f64 / words as f64) * 100.0;
    let coleman_liau = 0.0588 * l - 0.296 * s - 15.8;
    let ari = 4.71 * chars_per_word + 0.5 * words_per_sentence - 21.43;

    // Average the grade-level metrics, dropping implausible values.
    let grades = [fk_grade, fog, coleman_liau, ari];
    let valid: Vec<f64> = grades
        .iter()
        .copied()
        .filter(|g| (0.0..=20.0).contains(g))
        .collect();
    let average_grade = if valid.is_empty() {
        fk_grade
    } else {
        valid.iter().sum::<f64>() / valid.len() as f64
    };

    Some(ReadabilityMetrics {
        flesch_kincaid_grade: fk_grade,
        flesch_reading_ease: fk_ease,
        gunning_fog: fog,
        coleman_liau,
        ari,
        average_grade,
        sentence_count: sentences,
        word_count: words,
        avg_words_per_sentence: words_per_sentence,
        avg_syllables_per_word: syllables_per_word,
        complex_word_percentage: 100.0 * complex_words as f64 / words as f64,
    })
}

fn ease_description(ease: f64) -> &'static str {
    match ease {
        e if e >= 90.0 => "Very Easy (5th grade)",
        e if e >= 80.0 => "Easy (6th grade)",
        e if e >= 70.0 => "Fairly Easy (7th grade)",
        e if e >= 60.0 => "Standard (8th-9th grade)",
        e if e >= 50.0 => "Fairly Difficult (10th-12th grade)",
        e if e >= 30.0 => "Difficult (College)",
        _ => "Very Difficult (College graduate)",
    }
}

fn simplify_suggestion(metrics: &ReadabilityMetrics) -> String {
    let mut parts = Vec::new();
    if metrics.avg_words_per_sentence > 20.0 {
        parts.push("break long sentences into shorter ones");
    }
    if metrics.avg_syllables_per_word > 1.6 {
        parts.push("use simpler words where possible");
    }
    if metrics.complex_word_percentage > 15.0 {
        parts.push("reduce complex vocabulary");
    }
    if parts.is_empty() {
        parts.push("consider varying sentence length for better flow");
    }
    format!("To improve accessibility: {}.", parts.join(", "))
}

fn enrich_suggestion() -> String {
    "Readers of this genre may expect more sophisticated vocabulary and sentence \
     structures. Consider varying sentence length and adding descriptive depth."
        .to_string()
}

/// Analyze readability against a genre band.
pub fn analyze(text: &str, genre: &str) -> Vec<Suggestion> {
    if text.trim().len() < MIN_TEXT_LEN {
        return Vec::new();
    }
    let Some(metrics) = calculate_metrics(text) else {
        return Vec::new();
    };

    let (min, max, _ideal) = genre_band(genre);
    let grade = metrics.average_grade;
    let genre_label = genre.replace('_', " ");

    let mut suggestions = Vec::new();

    if grade > max + BAND_SLACK {
        let severity = if grade > max + WARNING_SLACK {
            Severity::Warning
        } else {
            Severity::Info
        };
        suggestions.push(
            Suggestion::new(
                SuggestionType::Readability,
                severity,
                format!(
                    "Reading level ({grade:.1}) is above target for {genre_label} \
                     ({min:.0}-{max:.0})"
                ),
                simplify_suggestion(&metrics),
            )
            .meta("metrics", json!(metrics))
            .meta("genre", json!(genre))
            .meta("direction", json!("simplify")),
        );
    } else if grade < min - BAND_SLACK {
        suggestions.push(
            Suggestion::new(
                SuggestionType::Readability,
                Severity::Info,
                format!(
                    "Reading level ({grade:.1}) is below target for {genre_label} \
                     ({min:.0}-{max:.0})"
                ),
                enrich_suggestion(),
            )
            .meta("metrics", json!(metrics))
            .meta("genre", json!(genre))
            .meta("direction", json!("enrich")),
        );
    } else {
        suggestions.push(
            Suggestion::new(
                SuggestionType::Readability,
                Severity::Info,
                format!(
                    "Readability: {} (Grade {grade:.1})",
                    ease_description(metrics.flesch_reading_ease)
                ),
                format!("Your prose complexity matches {genre_label} expectations well."),
            )
            .meta("metrics", json!(metrics))
            .meta("genre", json!(genre))
            .meta("on_target", json!(true)),
        );
    }

    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_text() -> String {
        "The cat sat on the mat. The dog ran to the gate. The boy saw the bird. "
            .repeat(4)
    }

    fn dense_text() -> String {
        "Notwithstanding the considerable institutional impediments, the \
         administration's deliberately obfuscatory communications strategy \
         engendered substantial epistemological consternation among \
         constituencies, which consequently necessitated comprehensive \
         reevaluation of longstanding interdepartmental collaboration \
         methodologies across heterogeneous organizational configurations."
            .to_string()
    }

    #[test]
    fn test_short_text_skipped() {
        assert!(analyze("Too short.", "adult_fiction").is_empty());
    }

    #[test]
    fn test_simple_text_below_adult_band() {
        let suggestions = analyze(&simple_text(), "adult_fiction");
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].message.contains("below target"));
        assert_eq!(suggestions[0].severity, Severity::Info);
    }

    #[test]
    fn test_simple_text_on_target_for_middle_grade() {
        let suggestions = analyze(&simple_text(), "middle_grade");
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].message.starts_with("Readability:"));
    }

    #[test]
    fn test_dense_text_above_band_is_warning() {
        let suggestions = analyze(&dense_text(), "middle_grade");
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].message.contains("above target"));
        assert_eq!(suggestions[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_genre_falls_back_to_adult() {
        assert_eq!(genre_band("space_opera"), genre_band("adult_fiction"));
    }

    #[test]
    fn test_ease_clamped() {
        let metrics = calculate_metrics(&simple_text()).expect("metrics");
        assert!((0.0..=100.0).contains(&metrics.flesch_reading_ease));
    }

    #[test]
    fn test_metrics_none_for_empty() {
        assert!(calculate_metrics("").is_none());
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_ease_always_clamped(text in "[a-zA-Z .]{1,300}") {
                if let Some(m) = calculate_metrics(&text) {
                    prop_assert!((0.0..=100.0).contains(&m.flesch_reading_ease));
                }
            }
        }
    }
}
