//! Timeline service: ordered story events and inconsistency detection.
//!
//! Inconsistencies are ephemeral: each detection run clears the previous
//! batch and rebuilds it; resolving an inconsistency deletes it.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::info;

use crate::db::connection::PlumeDb;
use crate::models::{Entity, EntityType};
use crate::text::{dialogue_spans, split_paragraphs, split_sentences};
use crate::models::timeline::{
    clear_inconsistencies, create_event, create_inconsistency, delete_inconsistency, list_events,
    list_inconsistencies, max_order_index, update_event, EventType, InconsistencySeverity,
    InconsistencyType, TimelineEvent, TimelineEventCreate, TimelineEventUpdate,
    TimelineInconsistency, TimelineInconsistencyCreate,
};
use crate::models::{entity, record_key};
use crate::PlumeError;

const PACING_SHORT_FACTOR: f64 = 0.2;
const PACING_LONG_FACTOR: f64 = 3.0;

/// Scene boundaries also fire on every Nth paragraph as a checkpoint.
/// A heuristic against under-segmentation, not a contract.
const SCENE_CHECKPOINT_PARAGRAPHS: usize = 5;
/// Paragraphs shorter than this never open a scene.
const MIN_SCENE_PARAGRAPH_CHARS: usize = 50;
/// Character-set overlap below this share reads as a cast change.
const CAST_CHANGE_OVERLAP: f64 = 0.3;

static CHAPTER_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(chapter|ch\.?)\s+\d+").expect("chapter marker regex"));

/// Scene-transition phrases checked against a paragraph's opening.
const TRANSITION_MARKERS: [&str; 12] = [
    "meanwhile",
    "later",
    "the next",
    "hours later",
    "days later",
    "weeks later",
    "somewhere else",
    "across town",
    "back at",
    "at the same time",
    "***",
    "---",
];

static FLASHBACK_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(years?|months?|days?|decades?) (ago|earlier|before)\b",
        r"(?i)\b(remembered|recalled|thought back|reminisced)\b",
        r"(?i)\b(flashback|memory)\b",
        r"(?i)\b(had been|had gone|had seen|had done)\b.*\b(years?|ago)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("flashback regex"))
    .collect()
});

static DAY_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)day\s+(\d+)(?:,\s+(morning|afternoon|evening|night|dawn|dusk|midnight|noon))?")
        .expect("day timestamp regex")
});
static WEEKDAY_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\s+(morning|afternoon|evening|night|dawn)",
    )
    .expect("weekday timestamp regex")
});
static RELATIVE_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(the next day|next morning|next evening|later that day|moments? later|soon after|shortly after|\d+\s+(?:hours?|days?|weeks?|months?|years?)\s+later|(?:hours?|minutes?|days?|weeks?|months?|years?)\s+later)\b",
    )
    .expect("relative timestamp regex")
});
static MONTH_TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(january|february|march|april|may|june|july|august|september|october|november|december)\s+(\d{4})",
    )
    .expect("month timestamp regex")
});
static TIME_OF_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(dawn|sunrise|noon|midday|dusk|sunset|midnight)\b")
        .expect("time of day regex")
});

/// Input for creating a timeline event.
#[derive(Debug, Default)]
pub struct NewEvent {
    pub description: String,
    pub event_type: EventType,
    /// Opaque story-time label. Ordering checks compare these
    /// lexicographically, which is correct only for labels that already sort
    /// chronologically (zero-padded "Day 03, 2-Morning" style).
    pub timestamp: Option<String>,
    pub location_id: Option<String>,
    pub character_ids: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    /// Defaults to the tail of the timeline.
    pub order_index: Option<i64>,
}

pub struct TimelineService;

impl TimelineService {
    /// Create an event; `order_index` defaults to one past the current tail.
    pub async fn create_event(
        db: &PlumeDb,
        manuscript_id: &str,
        new_event: NewEvent,
    ) -> Result<TimelineEvent, PlumeError> {
        if new_event.description.trim().is_empty() {
            return Err(PlumeError::Validation("Event description is required".into()));
        }

        let order_index = match new_event.order_index {
            Some(index) => index,
            None => max_order_index(db, manuscript_id).await?.map_or(0, |max| max + 1),
        };

        create_event(
            db,
            TimelineEventCreate {
                manuscript_id: manuscript_id.to_string(),
                description: new_event.description,
                event_type: new_event.event_type,
                order_index,
                timestamp: new_event.timestamp,
                location_id: new_event.location_id,
                character_ids: new_event.character_ids,
                metadata: new_event.metadata,
            },
        )
        .await
    }

    /// Events in timeline order.
    pub async fn get_events(
        db: &PlumeDb,
        manuscript_id: &str,
    ) -> Result<Vec<TimelineEvent>, PlumeError> {
        list_events(db, manuscript_id).await
    }

    /// Rewrite `order_index` so each listed event takes its list position.
    pub async fn reorder_events(db: &PlumeDb, event_ids: &[String]) -> Result<(), PlumeError> {
        for (position, event_id) in event_ids.iter().enumerate() {
            let updated = update_event(
                db,
                event_id,
                TimelineEventUpdate {
                    order_index: Some(position as i64),
                    ..Default::default()
                },
            )
            .await?;
            if updated.is_none() {
                return Err(PlumeError::NotFound {
                    entity_type: "timeline_event".into(),
                    id: event_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Run all inconsistency detectors over a manuscript's timeline.
    ///
    /// Clears previously detected inconsistencies first; results are
    /// persisted for review and returned.
    pub async fn detect_inconsistencies(
        db: &PlumeDb,
        manuscript_id: &str,
    ) -> Result<Vec<TimelineInconsistency>, PlumeError> {
        clear_inconsistencies(db, manuscript_id).await?;
        let events = list_events(db, manuscript_id).await?;

        let mut findings = Vec::new();
        findings.extend(detect_location_conflicts(&events, manuscript_id));
        findings.extend(detect_timestamp_violations(&events, manuscript_id));
        findings.extend(detect_resurrections(&events, manuscript_id));
        findings.extend(detect_missing_transitions(&events, manuscript_id));
        findings.extend(detect_pacing_issues(&events, manuscript_id));

        let mut persisted = Vec::new();
        for mut finding in findings {
            finding.description =
                resolve_names_in_description(db, manuscript_id, &finding.description).await;
            persisted.push(create_inconsistency(db, finding).await?);
        }

        info!(
            manuscript_id,
            count = persisted.len(),
            "timeline inconsistencies detected"
        );
        Ok(persisted)
    }

    pub async fn get_inconsistencies(
        db: &PlumeDb,
        manuscript_id: &str,
        severity: Option<InconsistencySeverity>,
    ) -> Result<Vec<TimelineInconsistency>, PlumeError> {
        list_inconsistencies(db, manuscript_id, severity).await
    }

    /// Resolving an inconsistency deletes it.
    pub async fn resolve_inconsistency(db: &PlumeDb, id: &str) -> Result<bool, PlumeError> {
        Ok(delete_inconsistency(db, id).await?.is_some())
    }
}

/// A scene event derived from prose, ready to persist.
#[derive(Debug, Clone)]
pub struct ExtractedSceneEvent {
    pub description: String,
    pub event_type: EventType,
    pub timestamp: Option<String>,
    pub location_id: Option<String>,
    pub character_ids: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Extract story-time labels from prose ("Day 3, Morning", "Monday morning",
/// "three hours later", "June 1850", "at dusk").
pub fn extract_timestamp(text: &str) -> Option<String> {
    if let Some(caps) = DAY_TIMESTAMP_RE.captures(text) {
        let day = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Some(match caps.get(2) {
            Some(part) => format!("Day {day}, {}", title_case(part.as_str())),
            None => format!("Day {day}"),
        });
    }
    if let Some(caps) = WEEKDAY_TIMESTAMP_RE.captures(text) {
        let weekday = title_case(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
        let part = title_case(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
        return Some(format!("{weekday} {part}"));
    }
    if let Some(m) = RELATIVE_TIMESTAMP_RE.find(text) {
        return Some(title_case(m.as_str()));
    }
    if let Some(caps) = MONTH_TIMESTAMP_RE.captures(text) {
        let month = title_case(caps.get(1).map(|m| m.as_str()).unwrap_or_default());
        let year = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        return Some(format!("{month} {year}"));
    }
    TIME_OF_DAY_RE
        .find(text)
        .map(|m| title_case(m.as_str()))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A transition marker within the paragraph's opening marks a scene break.
pub fn detect_scene_transition(paragraph: &str) -> bool {
    let opening: String = paragraph.to_lowercase().chars().take(100).collect();
    TRANSITION_MARKERS
        .iter()
        .any(|marker| opening.contains(marker))
}

/// Conservative flashback detection: at least two distinct indicator
/// classes, and dialogue-heavy paragraphs never qualify.
pub fn detect_flashback(paragraph: &str) -> bool {
    let dialogue_len: usize = dialogue_spans(paragraph).iter().map(|s| s.text.len()).sum();
    if !paragraph.is_empty() && dialogue_len * 2 > paragraph.len() {
        return false;
    }

    let matches = FLASHBACK_PATTERNS
        .iter()
        .filter(|re| re.is_match(paragraph))
        .count();
    matches >= 2
}

/// Derive timeline events from prose.
///
/// A paragraph opens a new event when it is the first paragraph, carries a
/// transition marker, changes location, swaps most of the cast, states a
/// story time, or lands on the every-Nth-paragraph checkpoint (see
/// [`SCENE_CHECKPOINT_PARAGRAPHS`]). Chapter-heading paragraphs become
/// CHAPTER events; flashback paragraphs are typed FLASHBACK. Events are
/// candidates only; the caller persists them.
pub fn extract_events_from_text(text: &str, entities: &[Entity]) -> Vec<ExtractedSceneEvent> {
    let characters: Vec<(&Entity, String)> = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Character)
        .map(|e| (e, e.name_lower.clone()))
        .collect();
    let locations: Vec<(&Entity, String)> = entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Location)
        .map(|e| (e, e.name_lower.clone()))
        .collect();

    let mut events: Vec<ExtractedSceneEvent> = Vec::new();

    for (para_idx, paragraph) in split_paragraphs(text).iter().enumerate() {
        if CHAPTER_MARKER_RE.is_match(paragraph.trim()) {
            let description: String = paragraph.trim().chars().take(200).collect();
            events.push(ExtractedSceneEvent {
                description,
                event_type: EventType::Chapter,
                timestamp: extract_timestamp(paragraph),
                location_id: None,
                character_ids: Vec::new(),
                metadata: HashMap::from([(
                    "paragraph_index".to_string(),
                    json!(para_idx),
                )]),
            });
            continue;
        }

        let para_lower = paragraph.to_lowercase();
        let characters_in: Vec<String> = characters
            .iter()
            .filter(|(_, name_lower)| para_lower.contains(name_lower.as_str()))
            .map(|(entity, _)| record_key(&entity.id))
            .collect();
        let location_in: Option<String> = locations
            .iter()
            .find(|(_, name_lower)| para_lower.contains(name_lower.as_str()))
            .map(|(entity, _)| record_key(&entity.id));

        let timestamp = extract_timestamp(paragraph);
        let has_transition = detect_scene_transition(paragraph);

        let location_changed = match (events.last().and_then(|e| e.location_id.as_ref()), &location_in)
        {
            (Some(previous), Some(current)) => previous != current,
            _ => false,
        };
        let cast_changed = match events.last() {
            Some(previous) if !previous.character_ids.is_empty() && !characters_in.is_empty() => {
                let previous: HashSet<&String> = previous.character_ids.iter().collect();
                let current: HashSet<&String> = characters_in.iter().collect();
                let overlap = previous.intersection(&current).count() as f64
                    / previous.len().max(current.len()) as f64;
                overlap < CAST_CHANGE_OVERLAP
            }
            _ => false,
        };

        let is_boundary = para_idx == 0
            || has_transition
            || location_changed
            || cast_changed
            || timestamp.is_some()
            || para_idx % SCENE_CHECKPOINT_PARAGRAPHS == 0;

        if paragraph.trim().len() <= MIN_SCENE_PARAGRAPH_CHARS || !is_boundary {
            continue;
        }

        let description: String = split_sentences(paragraph)
            .into_iter()
            .next()
            .unwrap_or_else(|| paragraph.clone())
            .chars()
            .take(200)
            .collect();

        events.push(ExtractedSceneEvent {
            description,
            event_type: if detect_flashback(paragraph) {
                EventType::Flashback
            } else {
                EventType::Scene
            },
            timestamp,
            location_id: location_in,
            character_ids: characters_in,
            metadata: HashMap::from([
                ("paragraph_index".to_string(), json!(para_idx)),
                (
                    "word_count".to_string(),
                    json!(paragraph.split_whitespace().count()),
                ),
                ("has_transition".to_string(), json!(has_transition)),
            ]),
        });
    }

    events
}

/// Description placeholders (`{entity:<id>}`) become entity names when the id
/// resolves; otherwise the raw id is kept.
async fn resolve_names_in_description(db: &PlumeDb, _manuscript_id: &str, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{entity:") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 8..];
        match tail.find('}') {
            Some(end) => {
                let id = &tail[..end];
                match entity::get_entity(db, id).await {
                    Ok(Some(found)) => out.push_str(&found.name),
                    _ => out.push_str(id),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn base_finding(
    manuscript_id: &str,
    inconsistency_type: InconsistencyType,
    severity: InconsistencySeverity,
    description: String,
    affected: Vec<String>,
) -> TimelineInconsistencyCreate {
    TimelineInconsistencyCreate {
        manuscript_id: manuscript_id.to_string(),
        inconsistency_type,
        severity,
        description,
        affected_event_ids: affected,
        extra_data: HashMap::new(),
    }
}

/// A character attached to two events that share a timestamp but disagree on
/// location is in two places at once.
fn detect_location_conflicts(
    events: &[TimelineEvent],
    manuscript_id: &str,
) -> Vec<TimelineInconsistencyCreate> {
    let mut findings = Vec::new();

    for (i, a) in events.iter().enumerate() {
        let (Some(ts_a), Some(loc_a)) = (&a.timestamp, &a.location_id) else {
            continue;
        };
        for b in events.iter().skip(i + 1) {
            let (Some(ts_b), Some(loc_b)) = (&b.timestamp, &b.location_id) else {
                continue;
            };
            if ts_a != ts_b || loc_a == loc_b {
                continue;
            }
            let shared: Vec<&String> = a
                .character_ids
                .iter()
                .filter(|c| b.character_ids.contains(c))
                .collect();
            if let Some(character) = shared.first() {
                let mut finding = base_finding(
                    manuscript_id,
                    InconsistencyType::LocationConflict,
                    InconsistencySeverity::High,
                    format!(
                        "{{entity:{character}}} is at {{entity:{loc_a}}} and \
                         {{entity:{loc_b}}} at the same story time ({ts_a})"
                    ),
                    vec![record_key(&a.id), record_key(&b.id)],
                );
                finding
                    .extra_data
                    .insert("character_id".into(), json!(character));
                findings.push(finding);
            }
        }
    }

    findings
}

/// Lexicographic comparison of opaque timestamps; see [`NewEvent::timestamp`]
/// for the expected label domain.
fn detect_timestamp_violations(
    events: &[TimelineEvent],
    manuscript_id: &str,
) -> Vec<TimelineInconsistencyCreate> {
    let mut findings = Vec::new();

    for pair in events.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let (Some(ts_current), Some(ts_next)) = (&current.timestamp, &next.timestamp) else {
            continue;
        };
        if ts_current > ts_next {
            let mut finding = base_finding(
                manuscript_id,
                InconsistencyType::TimestampViolation,
                InconsistencySeverity::Medium,
                format!(
                    "Event '{}' occurs at {ts_current} but is followed by '{}' at the \
                     earlier time {ts_next}",
                    truncate(&current.description, 50),
                    truncate(&next.description, 50),
                ),
                vec![record_key(&current.id), record_key(&next.id)],
            );
            finding
                .extra_data
                .insert("current_timestamp".into(), json!(ts_current));
            finding
                .extra_data
                .insert("next_timestamp".into(), json!(ts_next));
            findings.push(finding);
        }
    }

    findings
}

/// Characters listed in an event's `character_deaths` metadata must not
/// appear in later events.
fn detect_resurrections(
    events: &[TimelineEvent],
    manuscript_id: &str,
) -> Vec<TimelineInconsistencyCreate> {
    let mut findings = Vec::new();
    let mut dead: HashSet<String> = HashSet::new();

    for event in events {
        // Record deaths declared by this event before checking appearances,
        // so the death scene itself is not flagged.
        if let Some(deaths) = event.metadata.get("character_deaths").and_then(|v| v.as_array()) {
            for death in deaths {
                if let Some(id) = death.as_str() {
                    dead.insert(id.to_string());
                }
            }
        } else {
            for character in &event.character_ids {
                if dead.contains(character) {
                    let mut finding = base_finding(
                        manuscript_id,
                        InconsistencyType::CharacterResurrection,
                        InconsistencySeverity::High,
                        format!(
                            "{{entity:{character}}} appears in '{}' after being marked \
                             as dead",
                            truncate(&event.description, 50)
                        ),
                        vec![record_key(&event.id)],
                    );
                    finding
                        .extra_data
                        .insert("character_id".into(), json!(character));
                    findings.push(finding);
                }
            }
        }
    }

    findings
}

/// Consecutive events in different locations that share characters need an
/// explained transition (`metadata.has_transition`).
fn detect_missing_transitions(
    events: &[TimelineEvent],
    manuscript_id: &str,
) -> Vec<TimelineInconsistencyCreate> {
    let mut findings = Vec::new();

    for pair in events.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        let (Some(loc_current), Some(loc_next)) = (&current.location_id, &next.location_id)
        else {
            continue;
        };
        if loc_current == loc_next {
            continue;
        }
        if next
            .metadata
            .get("has_transition")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            continue;
        }

        let common: Vec<&String> = current
            .character_ids
            .iter()
            .filter(|c| next.character_ids.contains(c))
            .collect();
        if common.is_empty() {
            continue;
        }

        let named = common
            .iter()
            .take(2)
            .map(|c| format!("{{entity:{c}}}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut finding = base_finding(
            manuscript_id,
            InconsistencyType::MissingTransition,
            InconsistencySeverity::Medium,
            format!(
                "{named} move(s) from {{entity:{loc_current}}} to {{entity:{loc_next}}} \
                 without transition"
            ),
            vec![record_key(&current.id), record_key(&next.id)],
        );
        finding.extra_data.insert("from_location".into(), json!(loc_current));
        finding.extra_data.insert("to_location".into(), json!(loc_next));
        finding.extra_data.insert(
            "characters".into(),
            json!(common.iter().map(|c| c.as_str()).collect::<Vec<_>>()),
        );
        findings.push(finding);
    }

    findings
}

/// Events far shorter or longer than the manuscript's average scene length.
fn detect_pacing_issues(
    events: &[TimelineEvent],
    manuscript_id: &str,
) -> Vec<TimelineInconsistencyCreate> {
    let word_counts: Vec<f64> = events
        .iter()
        .filter_map(|e| e.metadata.get("word_count").and_then(|v| v.as_f64()))
        .filter(|count| *count > 0.0)
        .collect();
    if word_counts.is_empty() {
        return Vec::new();
    }
    let avg = word_counts.iter().sum::<f64>() / word_counts.len() as f64;

    let mut findings = Vec::new();
    for event in events {
        let Some(count) = event.metadata.get("word_count").and_then(|v| v.as_f64()) else {
            continue;
        };
        if count <= 0.0 {
            continue;
        }

        let issue = if count < avg * PACING_SHORT_FACTOR {
            Some(("too_short", "short"))
        } else if count > avg * PACING_LONG_FACTOR {
            Some(("too_long", "long"))
        } else {
            None
        };

        if let Some((tag, adjective)) = issue {
            let mut finding = base_finding(
                manuscript_id,
                InconsistencyType::PacingIssue,
                InconsistencySeverity::Low,
                format!(
                    "Scene '{}' is unusually {adjective} ({count:.0} words vs avg \
                     {avg:.0})",
                    truncate(&event.description, 50)
                ),
                vec![record_key(&event.id)],
            );
            finding.extra_data.insert("word_count".into(), json!(count));
            finding.extra_data.insert("average".into(), json!(avg));
            finding.extra_data.insert("issue".into(), json!(tag));
            findings.push(finding);
        }
    }

    findings
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        key: &str,
        order: i64,
        timestamp: Option<&str>,
        location: Option<&str>,
        characters: &[&str],
    ) -> TimelineEvent {
        TimelineEvent {
            id: surrealdb::RecordId::from_table_key("timeline_event", key),
            manuscript_id: "m-1".to_string(),
            description: format!("Event {key}"),
            event_type: EventType::Scene,
            order_index: order,
            timestamp: timestamp.map(|s| s.to_string()),
            location_id: location.map(|s| s.to_string()),
            character_ids: characters.iter().map(|s| s.to_string()).collect(),
            metadata: HashMap::new(),
            created_at: surrealdb::Datetime::from(chrono::Utc::now()),
        }
    }

    #[test]
    fn test_missing_transition_detected() {
        let events = vec![
            event("e1", 0, None, Some("loc-a"), &["c1", "c2"]),
            event("e2", 1, None, Some("loc-b"), &["c1", "c2"]),
        ];
        let findings = detect_missing_transitions(&events, "m-1");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, InconsistencySeverity::Medium);
        assert_eq!(
            findings[0].affected_event_ids,
            vec!["e1".to_string(), "e2".to_string()]
        );
    }

    #[test]
    fn test_transition_metadata_suppresses_finding() {
        let mut with_transition = event("e2", 1, None, Some("loc-b"), &["c1"]);
        with_transition
            .metadata
            .insert("has_transition".into(), json!(true));
        let events = vec![event("e1", 0, None, Some("loc-a"), &["c1"]), with_transition];
        assert!(detect_missing_transitions(&events, "m-1").is_empty());
    }

    #[test]
    fn test_no_transition_needed_without_shared_characters() {
        let events = vec![
            event("e1", 0, None, Some("loc-a"), &["c1"]),
            event("e2", 1, None, Some("loc-b"), &["c2"]),
        ];
        assert!(detect_missing_transitions(&events, "m-1").is_empty());
    }

    #[test]
    fn test_timestamp_violation_lexicographic() {
        let events = vec![
            event("e1", 0, Some("Day 03, Morning"), None, &[]),
            event("e2", 1, Some("Day 02, Evening"), None, &[]),
        ];
        let findings = detect_timestamp_violations(&events, "m-1");
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].inconsistency_type,
            InconsistencyType::TimestampViolation
        );
    }

    #[test]
    fn test_ordered_timestamps_pass() {
        let events = vec![
            event("e1", 0, Some("Day 02, Evening"), None, &[]),
            event("e2", 1, Some("Day 03, Morning"), None, &[]),
        ];
        assert!(detect_timestamp_violations(&events, "m-1").is_empty());
    }

    #[test]
    fn test_resurrection_detected_after_death_event() {
        let mut death = event("e1", 0, None, None, &["c1"]);
        death
            .metadata
            .insert("character_deaths".into(), json!(["c1"]));
        let events = vec![
            death,
            event("e2", 1, None, None, &["c1"]),
        ];
        let findings = detect_resurrections(&events, "m-1");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, InconsistencySeverity::High);
        assert_eq!(findings[0].affected_event_ids, vec!["e2".to_string()]);
    }

    #[test]
    fn test_location_conflict_same_timestamp() {
        let events = vec![
            event("e1", 0, Some("Day 01, Noon"), Some("loc-a"), &["c1"]),
            event("e2", 1, Some("Day 01, Noon"), Some("loc-b"), &["c1"]),
        ];
        let findings = detect_location_conflicts(&events, "m-1");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, InconsistencySeverity::High);
    }

    fn character_entity(key: &str, name: &str) -> Entity {
        Entity {
            id: surrealdb::RecordId::from_table_key("entity", key),
            manuscript_id: "m-1".to_string(),
            entity_type: EntityType::Character,
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            aliases: Vec::new(),
            attributes: HashMap::new(),
            template_data: HashMap::new(),
            appearance_history: Vec::new(),
            linked_wiki_entry_id: None,
            scope: Default::default(),
            created_at: surrealdb::Datetime::from(chrono::Utc::now()),
            updated_at: surrealdb::Datetime::from(chrono::Utc::now()),
        }
    }

    #[test]
    fn test_timestamp_extraction_formats() {
        assert_eq!(
            extract_timestamp("It was day 3, morning when they left."),
            Some("Day 3, Morning".to_string())
        );
        assert_eq!(
            extract_timestamp("By monday morning the gate was shut."),
            Some("Monday Morning".to_string())
        );
        assert_eq!(
            extract_timestamp("Three hours later the rain stopped."),
            Some("Hours Later".to_string())
        );
        assert_eq!(
            extract_timestamp("The letter was dated june 1850."),
            Some("June 1850".to_string())
        );
        assert_eq!(
            extract_timestamp("They reached the ford at dusk."),
            Some("Dusk".to_string())
        );
        assert_eq!(extract_timestamp("Nothing temporal here."), None);
    }

    #[test]
    fn test_flashback_requires_two_indicator_classes() {
        // One class only: not a flashback.
        assert!(!detect_flashback("Ten years ago the mill still turned."));
        // Memory verb plus a years-ago phrase: flashback.
        assert!(detect_flashback(
            "She remembered the mill as it had been ten years ago, loud and alive."
        ));
        // Dialogue-heavy paragraphs never qualify.
        assert!(!detect_flashback(
            "\"She remembered the mill as it had been ten years ago, loud and alive.\""
        ));
    }

    #[test]
    fn test_transition_markers_only_count_in_opening() {
        assert!(detect_scene_transition("Meanwhile, across the river, Brann waited."));
        assert!(!detect_scene_transition(&format!(
            "{} and then, meanwhile, nothing.",
            "x".repeat(120)
        )));
    }

    #[test]
    fn test_events_extracted_at_boundaries() {
        let mira = character_entity("cmira", "Mira");
        let brann = character_entity("cbrann", "Brann");
        let text = "Mira counted the wagons twice and sealed the gate ledger for the night watch.\n\n\
                    Mira argued with the gate clerk about the missing entries in the ledger margin.\n\n\
                    Meanwhile, Brann waited at the ford with the horses and watched the far bank.";
        let events = extract_events_from_text(text, &[mira, brann]);

        // Opening paragraph and the transition paragraph open events; the
        // in-scene middle paragraph does not.
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::Scene);
        assert_eq!(events[0].character_ids, vec!["cmira".to_string()]);
        assert_eq!(
            events[1].metadata.get("has_transition"),
            Some(&json!(true))
        );
        assert_eq!(events[1].character_ids, vec!["cbrann".to_string()]);
        assert!(events[0].description.starts_with("Mira counted the wagons"));
    }

    #[test]
    fn test_chapter_headings_become_chapter_events() {
        let text = "Chapter 12\n\n\
                    Meanwhile, the caravan crossed the ford and made camp on the gravel bar.";
        let events = extract_events_from_text(text, &[]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::Chapter);
        assert_eq!(events[0].description, "Chapter 12");
        assert_eq!(events[1].event_type, EventType::Scene);
    }

    #[test]
    fn test_short_paragraphs_never_open_events() {
        let events = extract_events_from_text("Too short.\n\nAlso short.", &[]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_pacing_issues_flag_outliers() {
        let mut short = event("e1", 0, None, None, &[]);
        short.metadata.insert("word_count".into(), json!(100));
        let mut normal_a = event("e2", 1, None, None, &[]);
        normal_a.metadata.insert("word_count".into(), json!(2000));
        let mut normal_b = event("e3", 2, None, None, &[]);
        normal_b.metadata.insert("word_count".into(), json!(2000));
        let mut normal_c = event("e4", 3, None, None, &[]);
        normal_c.metadata.insert("word_count".into(), json!(2000));
        let mut long = event("e5", 4, None, None, &[]);
        long.metadata.insert("word_count".into(), json!(20000));

        let findings =
            detect_pacing_issues(&[short, normal_a, normal_b, normal_c, long], "m-1");
        let tags: Vec<&str> = findings
            .iter()
            .filter_map(|f| f.extra_data.get("issue").and_then(|v| v.as_str()))
            .collect();
        assert!(tags.contains(&"too_short"));
        assert!(tags.contains(&"too_long"));
        assert_eq!(findings.len(), 2);
    }
}
