use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Kind of story event on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    #[default]
    Scene,
    Chapter,
    Flashback,
    Dream,
    Montage,
}

/// Category of a detected timeline problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InconsistencyType {
    LocationConflict,
    TimestampViolation,
    CharacterResurrection,
    MissingTransition,
    PacingIssue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InconsistencySeverity {
    High,
    Medium,
    Low,
}

/// An ordered story event.
///
/// `timestamp` is an opaque story-time label ("Day 3, Morning"). Recognized
/// metadata keys: `auto_generated`, `chapter_id`, `word_count`,
/// `character_deaths`, `has_transition`. Unknown keys are preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: RecordId,
    pub manuscript_id: String,
    pub description: String,
    pub event_type: EventType,
    pub order_index: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub character_ids: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct TimelineEventCreate {
    pub manuscript_id: String,
    pub description: String,
    pub event_type: EventType,
    pub order_index: i64,
    pub timestamp: Option<String>,
    pub location_id: Option<String>,
    pub character_ids: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct TimelineEventUpdate {
    pub description: Option<String>,
    pub event_type: Option<EventType>,
    pub order_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Option<String>>,
    pub character_ids: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// A detected timeline problem. Ephemeral: rebuilt by running detection;
/// resolving one deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineInconsistency {
    pub id: RecordId,
    pub manuscript_id: String,
    pub inconsistency_type: InconsistencyType,
    pub severity: InconsistencySeverity,
    pub description: String,
    pub affected_event_ids: Vec<String>,
    #[serde(default)]
    pub extra_data: HashMap<String, serde_json::Value>,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct TimelineInconsistencyCreate {
    pub manuscript_id: String,
    pub inconsistency_type: InconsistencyType,
    pub severity: InconsistencySeverity,
    pub description: String,
    pub affected_event_ids: Vec<String>,
    pub extra_data: HashMap<String, serde_json::Value>,
}

pub async fn create_event(
    db: &PlumeDb,
    data: TimelineEventCreate,
) -> Result<TimelineEvent, PlumeError> {
    let result: Option<TimelineEvent> = db.create("timeline_event").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create timeline event".into()))
}

pub async fn get_event(db: &PlumeDb, id: &str) -> Result<Option<TimelineEvent>, PlumeError> {
    let result: Option<TimelineEvent> = db.select(("timeline_event", id)).await?;
    Ok(result)
}

/// Events for a manuscript in timeline order.
pub async fn list_events(
    db: &PlumeDb,
    manuscript_id: &str,
) -> Result<Vec<TimelineEvent>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM timeline_event WHERE manuscript_id = $manuscript_id \
             ORDER BY order_index",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    let events: Vec<TimelineEvent> = result.take(0)?;
    Ok(events)
}

/// Highest order index currently used in a manuscript's timeline, if any.
pub async fn max_order_index(
    db: &PlumeDb,
    manuscript_id: &str,
) -> Result<Option<i64>, PlumeError> {
    #[derive(Deserialize)]
    struct MaxRow {
        order_index: i64,
    }
    let mut result = db
        .query(
            "SELECT order_index FROM timeline_event WHERE manuscript_id = $manuscript_id \
             ORDER BY order_index DESC LIMIT 1",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    let rows: Vec<MaxRow> = result.take(0)?;
    Ok(rows.into_iter().next().map(|r| r.order_index))
}

pub async fn update_event(
    db: &PlumeDb,
    id: &str,
    data: TimelineEventUpdate,
) -> Result<Option<TimelineEvent>, PlumeError> {
    let result: Option<TimelineEvent> = db.update(("timeline_event", id)).merge(data).await?;
    Ok(result)
}

pub async fn delete_event(db: &PlumeDb, id: &str) -> Result<Option<TimelineEvent>, PlumeError> {
    let result: Option<TimelineEvent> = db.delete(("timeline_event", id)).await?;
    Ok(result)
}

pub async fn create_inconsistency(
    db: &PlumeDb,
    data: TimelineInconsistencyCreate,
) -> Result<TimelineInconsistency, PlumeError> {
    let result: Option<TimelineInconsistency> =
        db.create("timeline_inconsistency").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to record inconsistency".into()))
}

pub async fn list_inconsistencies(
    db: &PlumeDb,
    manuscript_id: &str,
    severity: Option<InconsistencySeverity>,
) -> Result<Vec<TimelineInconsistency>, PlumeError> {
    let mut result = match severity {
        Some(severity) => {
            db.query(
                "SELECT * FROM timeline_inconsistency WHERE manuscript_id = $manuscript_id \
                 AND severity = $severity ORDER BY created_at",
            )
            .bind(("manuscript_id", manuscript_id.to_string()))
            .bind(("severity", severity))
            .await?
        }
        None => {
            db.query(
                "SELECT * FROM timeline_inconsistency WHERE manuscript_id = $manuscript_id \
                 ORDER BY created_at",
            )
            .bind(("manuscript_id", manuscript_id.to_string()))
            .await?
        }
    };
    let issues: Vec<TimelineInconsistency> = result.take(0)?;
    Ok(issues)
}

/// Clear previously detected inconsistencies (detection rebuilds from
/// scratch).
pub async fn clear_inconsistencies(db: &PlumeDb, manuscript_id: &str) -> Result<(), PlumeError> {
    db.query("DELETE timeline_inconsistency WHERE manuscript_id = $manuscript_id")
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    Ok(())
}

/// Resolving an inconsistency deletes it.
pub async fn delete_inconsistency(
    db: &PlumeDb,
    id: &str,
) -> Result<Option<TimelineInconsistency>, PlumeError> {
    let result: Option<TimelineInconsistency> =
        db.delete(("timeline_inconsistency", id)).await?;
    Ok(result)
}
