//! Writing-feedback unifier.
//!
//! Coordinates the independent analyzers, merges their suggestion streams
//! into position-sorted issues with stable ids, applies the configured
//! sensitivity filters, and reports per-type counts.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::models::{Entity, WorldRule};
use crate::services::{
    consistency_checker, dialogue_analyzer, grammar_analyzer, overused_phrases_analyzer,
    readability_analyzer, sentence_starter_analyzer, style_analyzer, word_analyzer,
};

/// Which analyzers run for a request.
///
/// Realtime keeps to the fast mechanics checks; paragraph adds the style and
/// word passes; chapter runs everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Realtime,
    Paragraph,
    Chapter,
}

/// Settings for writing feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSettings {
    pub grammar: bool,
    pub style: bool,
    pub word_choice: bool,
    pub dialogue: bool,
    pub readability: bool,
    pub sentence_variety: bool,
    pub overused_phrases: bool,
    /// Requires codex context; only runs through `analyze_with_context`.
    pub consistency: bool,
    /// Genre for readability targets.
    pub genre: String,
    /// When false, INFO-level issues are dropped.
    pub show_info_level: bool,
    pub min_confidence: f64,
    /// Rule ids to suppress (matches issue `rule_id`).
    pub ignored_rules: Vec<String>,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            grammar: true,
            style: true,
            word_choice: true,
            dialogue: true,
            readability: true,
            sentence_variety: true,
            overused_phrases: true,
            consistency: false,
            genre: "adult_fiction".to_string(),
            show_info_level: false,
            min_confidence: 0.5,
            ignored_rules: Vec::new(),
        }
    }
}

impl FeedbackSettings {
    /// Settings that keep everything, for review panels and tests.
    pub fn verbose() -> Self {
        Self {
            show_info_level: true,
            ..Self::default()
        }
    }
}

/// A single position-anchored issue in unified form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingIssue {
    /// Stable per-response id.
    pub id: String,
    /// Stable type string ("style", "word_choice", "dialogue", …).
    pub issue_type: String,
    pub severity: Severity,
    pub message: String,
    pub suggestions: Vec<String>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub original_text: String,
    pub teaching_point: Option<String>,
    pub rule_id: Option<String>,
    pub category: Option<String>,
    pub confidence: Option<f64>,
}

/// Response from a feedback analysis run.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub issues: Vec<WritingIssue>,
    /// Issue counts per `issue_type`.
    pub stats: HashMap<String, usize>,
    pub analysis_time_ms: u64,
    pub text_length: usize,
}

/// Default teaching points per issue type, used when an analyzer does not
/// attach its own.
fn default_teaching_point(issue_type: &str) -> Option<&'static str> {
    match issue_type {
        "grammar" => Some(
            "Mechanics issues break reader immersion. Basic correctness maintains \
             clarity even where style bends the rules.",
        ),
        "voice" => Some(
            "Passive voice distances readers from the action. Active voice creates \
             immediacy; use passive intentionally for effect.",
        ),
        "word_choice" => Some(
            "Words like 'very', 'really', and 'just' often dilute impact. Delete them \
             or find stronger alternatives.",
        ),
        "show_not_tell" => Some(
            "Verbs like 'felt', 'thought', and 'realized' can distance readers. Show \
             emotions through action and dialogue instead.",
        ),
        "dialogue" => Some(
            "'Said' is invisible to readers. Fancy tags draw unwanted attention; use \
             action beats for variety.",
        ),
        "repetition" => Some(
            "Repeated words within close proximity can feel clunky. Vary your \
             vocabulary or restructure sentences.",
        ),
        "readability" => Some(
            "Readability scores help calibrate prose complexity for your audience. \
             Genre fiction typically targets a 6th-9th grade level.",
        ),
        "sentence_variety" => Some(
            "Varied sentence openings create rhythm and flow. Repetitive starters \
             (He…, She…, The…) can feel monotonous.",
        ),
        "overused_phrase" => Some(
            "Overused phrases like 'took a deep breath' slide past readers. Fresh, \
             specific language creates impact.",
        ),
        _ => None,
    }
}

/// Map an analyzer suggestion type onto the unified issue type string.
fn issue_type_of(suggestion_type: SuggestionType) -> &'static str {
    match suggestion_type {
        SuggestionType::Grammar => "grammar",
        SuggestionType::Style => "style",
        SuggestionType::WordChoice => "word_choice",
        SuggestionType::Consistency => "consistency",
        SuggestionType::Pacing => "pacing",
        SuggestionType::Voice => "voice",
        SuggestionType::Repetition => "repetition",
        SuggestionType::ShowNotTell => "show_not_tell",
        // Both dialogue streams surface as one type in the editor.
        SuggestionType::Dialogue | SuggestionType::DialogueTags => "dialogue",
        SuggestionType::Readability => "readability",
        SuggestionType::SentenceVariety => "sentence_variety",
        SuggestionType::OverusedPhrase => "overused_phrase",
    }
}

/// Analyze text with codex context, adding the consistency pass in chapter
/// mode when enabled.
pub fn analyze_with_context(
    text: &str,
    settings: &FeedbackSettings,
    mode: AnalysisMode,
    entities: &[Entity],
    rules: &[WorldRule],
) -> FeedbackResponse {
    let mut response = analyze(text, settings, mode);
    if settings.consistency && mode == AnalysisMode::Chapter {
        let extra: Vec<WritingIssue> = consistency_checker::check(text, entities, rules)
            .into_iter()
            .map(|s| to_issue(text, s))
            .filter(|issue| keep(issue, settings))
            .collect();
        for issue in &extra {
            *response.stats.entry(issue.issue_type.clone()).or_insert(0) += 1;
        }
        response.issues.extend(extra);
        response.issues.sort_by_key(|issue| issue.start_offset);
    }
    response
}

/// Analyze text, running the analyzers the mode and settings select.
pub fn analyze(text: &str, settings: &FeedbackSettings, mode: AnalysisMode) -> FeedbackResponse {
    let start = Instant::now();
    let mut raw: Vec<Suggestion> = Vec::new();

    if settings.grammar {
        raw.extend(grammar_analyzer::analyze(text));
    }

    if mode != AnalysisMode::Realtime {
        if settings.style {
            raw.extend(style_analyzer::analyze(text));
        }
        if settings.word_choice {
            raw.extend(word_analyzer::analyze(text));
        }
        if settings.overused_phrases {
            raw.extend(overused_phrases_analyzer::analyze(text));
        }
    }

    if mode == AnalysisMode::Chapter {
        if settings.dialogue {
            raw.extend(dialogue_analyzer::analyze(text));
        }
        if settings.readability {
            raw.extend(readability_analyzer::analyze(text, &settings.genre));
        }
        if settings.sentence_variety {
            raw.extend(sentence_starter_analyzer::analyze(text));
        }
    }

    let mut issues: Vec<WritingIssue> = raw
        .into_iter()
        .map(|s| to_issue(text, s))
        .filter(|issue| keep(issue, settings))
        .collect();

    issues.sort_by_key(|issue| issue.start_offset);

    let mut stats: HashMap<String, usize> = HashMap::new();
    for issue in &issues {
        *stats.entry(issue.issue_type.clone()).or_insert(0) += 1;
    }

    FeedbackResponse {
        issues,
        stats,
        analysis_time_ms: start.elapsed().as_millis() as u64,
        text_length: text.len(),
    }
}

fn to_issue(text: &str, suggestion: Suggestion) -> WritingIssue {
    let issue_type = issue_type_of(suggestion.suggestion_type).to_string();
    let start_offset = suggestion.start_char.unwrap_or(0);
    let end_offset = suggestion.end_char.unwrap_or(start_offset);
    let original_text = text.get(start_offset..end_offset).unwrap_or("").to_string();

    let teaching_point = suggestion
        .metadata
        .get("teaching_point")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| default_teaching_point(&issue_type).map(|s| s.to_string()));
    let rule_id = suggestion
        .metadata
        .get("rule_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let category = suggestion
        .metadata
        .get("category")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    WritingIssue {
        id: Uuid::new_v4().to_string(),
        issue_type,
        severity: suggestion.severity,
        message: suggestion.message,
        suggestions: vec![suggestion.suggestion],
        start_offset,
        end_offset,
        original_text,
        teaching_point,
        rule_id,
        category,
        confidence: suggestion.confidence,
    }
}

fn keep(issue: &WritingIssue, settings: &FeedbackSettings) -> bool {
    if issue.severity == Severity::Info && !settings.show_info_level {
        return false;
    }
    if let Some(confidence) = issue.confidence {
        if confidence < settings.min_confidence {
            return false;
        }
    }
    if let Some(rule_id) = &issue.rule_id {
        if settings.ignored_rules.iter().any(|r| r == rule_id) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter_text() -> String {
        let mut text = String::from(
            "Mira took a deep breath at the edge of the old square before dawn. ",
        );
        for i in 0..12 {
            text.push_str(&format!("\"Line {i} of the argument,\" she said. "));
        }
        for i in 0..4 {
            text.push_str(&format!("\"Point {i}!\" he exclaimed. "));
        }
        text
    }

    #[test]
    fn test_realtime_runs_mechanics_only() {
        let text = "She crossed the the bridge. His heart pounded.";
        let response = analyze(text, &FeedbackSettings::verbose(), AnalysisMode::Realtime);
        assert!(response.issues.iter().all(|i| i.issue_type == "grammar"));
        assert!(!response.issues.is_empty());
    }

    #[test]
    fn test_paragraph_adds_word_and_phrase_passes() {
        let text = "She crossed the bridge and took a deep breath before the long climb down.";
        let response = analyze(text, &FeedbackSettings::verbose(), AnalysisMode::Paragraph);
        assert!(response
            .issues
            .iter()
            .any(|i| i.issue_type == "overused_phrase"));
        // Dialogue analyzer must not run in paragraph mode.
        assert!(response.issues.iter().all(|i| i.issue_type != "dialogue"));
    }

    #[test]
    fn test_chapter_mode_catches_dialogue_issues() {
        let response = analyze(
            &chapter_text(),
            &FeedbackSettings::verbose(),
            AnalysisMode::Chapter,
        );
        let dialogue_warning = response
            .issues
            .iter()
            .find(|i| i.issue_type == "dialogue" && i.severity == Severity::Warning)
            .expect("dialogue warning");
        assert!(dialogue_warning.message.contains("Fancy dialogue tags"));
    }

    #[test]
    fn test_issues_sorted_with_unique_ids() {
        let response = analyze(
            &chapter_text(),
            &FeedbackSettings::verbose(),
            AnalysisMode::Chapter,
        );
        let offsets: Vec<usize> = response.issues.iter().map(|i| i.start_offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);

        let mut ids: Vec<&String> = response.issues.iter().map(|i| &i.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), response.issues.len());
    }

    #[test]
    fn test_info_hidden_by_default() {
        let text = "She crossed the bridge and took a deep breath before the long climb down.";
        let default_response = analyze(text, &FeedbackSettings::default(), AnalysisMode::Paragraph);
        assert!(default_response
            .issues
            .iter()
            .all(|i| i.severity != Severity::Info));
    }

    #[test]
    fn test_min_confidence_filters_loose_analyzers() {
        // A doubled word (grammar, 0.9) and an overused phrase plus a weak
        // word (word choice, 0.6).
        let text = "She just waited. She just watched. She counted the the coins. \
                    He just shrugged, just once, and took a deep breath before the climb.";
        let mut settings = FeedbackSettings::verbose();
        settings.min_confidence = 0.75;
        let response = analyze(text, &settings, AnalysisMode::Paragraph);

        assert!(response.issues.iter().any(|i| i.issue_type == "grammar"));
        assert!(response
            .issues
            .iter()
            .any(|i| i.issue_type == "overused_phrase"));
        // Word-choice findings sit at 0.6 and are filtered out.
        assert!(response
            .issues
            .iter()
            .all(|i| i.issue_type != "word_choice"));

        // With the default minimum they come back.
        let relaxed = analyze(text, &FeedbackSettings::verbose(), AnalysisMode::Paragraph);
        assert!(relaxed.issues.iter().any(|i| i.issue_type == "word_choice"));
    }

    #[test]
    fn test_issue_confidence_carried_through() {
        let text = "She crossed the the bridge.";
        let response = analyze(text, &FeedbackSettings::verbose(), AnalysisMode::Realtime);
        let grammar = response
            .issues
            .iter()
            .find(|i| i.issue_type == "grammar")
            .expect("grammar issue");
        assert_eq!(grammar.confidence, Some(0.9));
    }

    #[test]
    fn test_ignored_rules_filtered() {
        let text = "She crossed the the bridge.";
        let mut settings = FeedbackSettings::verbose();
        settings.ignored_rules = vec!["DOUBLED_WORD".to_string()];
        let response = analyze(text, &settings, AnalysisMode::Realtime);
        assert!(response
            .issues
            .iter()
            .all(|i| i.rule_id.as_deref() != Some("DOUBLED_WORD")));
    }

    #[test]
    fn test_stats_count_by_type() {
        let response = analyze(
            &chapter_text(),
            &FeedbackSettings::verbose(),
            AnalysisMode::Chapter,
        );
        let total: usize = response.stats.values().sum();
        assert_eq!(total, response.issues.len());
        assert_eq!(response.text_length, chapter_text().len());
    }
}
