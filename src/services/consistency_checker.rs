//! Consistency checker: prose against the codex and stated world rules.
//!
//! Flags descriptions that contradict recorded character attributes
//! (eye color, hair color, age) and prose that asserts the opposite of an
//! explicit world rule. Works from already-loaded context so it stays a pure
//! function; callers fetch entities and rules before invoking.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::models::{Entity, EntityType, WorldRule};
use crate::services::issue::{Severity, Suggestion, SuggestionType};
use crate::text::sentence_spans;

const MIN_TEXT_LEN: usize = 20;
/// Attribute patterns can misattribute pronouns; moderate confidence.
const ANALYZER_CONFIDENCE: f64 = 0.7;
/// Years of drift tolerated before an age mention is flagged.
const AGE_TOLERANCE: i64 = 2;

static NEGATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(without|despite|no longer|never)\b").expect("negation regex"));

/// Check prose against known entities and world rules.
pub fn check(text: &str, entities: &[Entity], rules: &[WorldRule]) -> Vec<Suggestion> {
    if text.trim().len() < MIN_TEXT_LEN {
        return Vec::new();
    }

    let mut suggestions = Vec::new();

    for entity in entities {
        if entity.entity_type != EntityType::Character {
            continue;
        }
        if !text.to_lowercase().contains(&entity.name_lower) {
            continue;
        }
        suggestions.extend(check_character_attributes(text, entity));
    }

    suggestions.extend(check_rule_contradictions(text, rules));
    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

fn attribute_string(entity: &Entity, keys: [&str; 2]) -> Option<String> {
    keys.iter()
        .find_map(|key| entity.attributes.get(*key))
        .and_then(|value| value.as_str())
        .map(|s| s.to_string())
}

fn check_character_attributes(text: &str, entity: &Entity) -> Vec<Suggestion> {
    let mut conflicts = Vec::new();

    if let Some(codex_color) = attribute_string(entity, ["eye_color", "eyes"]) {
        conflicts.extend(check_color(text, &entity.name, "eyes", &codex_color));
    }
    if let Some(codex_color) = attribute_string(entity, ["hair_color", "hair"]) {
        conflicts.extend(check_color(text, &entity.name, "hair", &codex_color));
    }
    if let Some(codex_age) = entity.attributes.get("age") {
        let codex_age = codex_age
            .as_i64()
            .or_else(|| codex_age.as_str().and_then(|s| s.parse().ok()));
        if let Some(codex_age) = codex_age {
            conflicts.extend(check_age(text, &entity.name, codex_age));
        }
    }

    conflicts
}

/// Flag "his green eyes" style mentions that disagree with the recorded
/// color.
fn check_color(text: &str, name: &str, attribute: &str, codex_value: &str) -> Vec<Suggestion> {
    let patterns = [
        format!(r"(?i)\b(?:his|her|their)\s+(\w+)\s+{attribute}\b"),
        format!(r"(?i)\b{}'?s?\s+(\w+)\s+{attribute}\b", regex::escape(name)),
    ];

    let mut conflicts = Vec::new();
    for pattern in patterns {
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        for caps in re.captures_iter(text) {
            let Some(found) = caps.get(1) else { continue };
            let text_value = found.as_str();
            if text_value.eq_ignore_ascii_case(codex_value) {
                continue;
            }
            let whole = caps.get(0).expect("match");
            conflicts.push(
                Suggestion::new(
                    SuggestionType::Consistency,
                    Severity::Warning,
                    format!(
                        "Inconsistency: {name}'s {attribute} are {codex_value} in the \
                         codex, but described as {text_value} here"
                    ),
                    format!(
                        "Update to '{codex_value}', or revise the codex entry if this \
                         change is intentional."
                    ),
                )
                .at(whole.start(), whole.end())
                .highlight(text_value)
                .meta("character", json!(name))
                .meta("attribute", json!(attribute))
                .meta("codex_value", json!(codex_value))
                .meta("text_value", json!(text_value)),
            );
        }
    }

    conflicts
}

/// Flag "Name was N years old" when N drifts from the recorded age.
fn check_age(text: &str, name: &str, codex_age: i64) -> Vec<Suggestion> {
    let pattern = format!(
        r"(?i)\b{}\s+(?:was|is)\s+(\d+)\s+years?\s+old",
        regex::escape(name)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut conflicts = Vec::new();
    for caps in re.captures_iter(text) {
        let Some(age_match) = caps.get(1) else { continue };
        let Ok(text_age) = age_match.as_str().parse::<i64>() else {
            continue;
        };
        if (codex_age - text_age).abs() <= AGE_TOLERANCE {
            continue;
        }
        let whole = caps.get(0).expect("match");
        conflicts.push(
            Suggestion::new(
                SuggestionType::Consistency,
                Severity::Warning,
                format!(
                    "Age inconsistency: {name} is {codex_age} in the codex, but \
                     {text_age} here"
                ),
                "Verify the age is correct; update the codex or the text to match.",
            )
            .at(whole.start(), whole.end())
            .meta("character", json!(name))
            .meta("codex_age", json!(codex_age))
            .meta("text_age", json!(text_age)),
        );
    }

    conflicts
}

/// Flag sentences that restate a world rule's requirement while negating it
/// ("crossed the glass desert without the warden's seal").
fn check_rule_contradictions(text: &str, rules: &[WorldRule]) -> Vec<Suggestion> {
    let mut conflicts = Vec::new();

    for rule in rules {
        // Key terms: significant words from the rule statement.
        let key_terms: Vec<String> = rule
            .rule_text
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 4)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if key_terms.len() < 2 {
            continue;
        }

        for sentence in sentence_spans(text) {
            let sent_lower = sentence.text.to_lowercase();
            let hits = key_terms
                .iter()
                .filter(|term| sent_lower.contains(term.as_str()))
                .count();
            // A sentence touching most of the rule's terms while negating is
            // suspicious enough to surface for review.
            if hits * 2 >= key_terms.len() && NEGATION_RE.is_match(&sentence.text) {
                conflicts.push(
                    Suggestion::new(
                        SuggestionType::Consistency,
                        Severity::Info,
                        format!("Possible world-rule conflict: \"{}\"", rule.rule_text),
                        "This passage may contradict a stated world rule. Review it \
                         against the rule, or update the rule if the world has changed.",
                    )
                    .at(sentence.start, sentence.end)
                    .meta("rule_text", json!(rule.rule_text))
                    .meta("rule_type", json!(rule.rule_type)),
                );
                break; // One report per rule.
            }
        }
    }

    conflicts
}
