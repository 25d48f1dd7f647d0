use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Kind of staged wiki mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// Review lifecycle of a staged change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Rejected,
}

/// Full draft entry carried by a `create` change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedEntry {
    pub entry_type: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub structured_data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A staged wiki mutation awaiting review.
///
/// Every automated wiki change goes through one of these; nothing mutates the
/// wiki directly. Carries provenance (`source_text`, `source_chapter_id`) and
/// a confidence score so reviewers can triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiChange {
    pub id: RecordId,
    pub world_id: String,
    pub change_type: ChangeType,
    /// Target entry for update/delete; absent for create.
    #[serde(default)]
    pub wiki_entry_id: Option<String>,
    #[serde(default)]
    pub field_changed: Option<String>,
    #[serde(default)]
    pub old_value: Option<serde_json::Value>,
    #[serde(default)]
    pub new_value: Option<serde_json::Value>,
    #[serde(default)]
    pub proposed_entry: Option<ProposedEntry>,
    pub reason: String,
    /// Prose excerpt the change was derived from.
    pub source_text: String,
    #[serde(default)]
    pub source_chapter_id: Option<String>,
    pub confidence: f64,
    pub status: ChangeStatus,
    #[serde(default)]
    pub reviewer_note: Option<String>,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct WikiChangeCreate {
    pub world_id: String,
    pub change_type: ChangeType,
    pub wiki_entry_id: Option<String>,
    pub field_changed: Option<String>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub proposed_entry: Option<ProposedEntry>,
    pub reason: String,
    pub source_text: String,
    pub source_chapter_id: Option<String>,
    pub confidence: f64,
    pub status: ChangeStatus,
}

pub async fn create_change(db: &PlumeDb, data: WikiChangeCreate) -> Result<WikiChange, PlumeError> {
    let result: Option<WikiChange> = db.create("wiki_change").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create wiki change".into()))
}

pub async fn get_change(db: &PlumeDb, id: &str) -> Result<Option<WikiChange>, PlumeError> {
    let result: Option<WikiChange> = db.select(("wiki_change", id)).await?;
    Ok(result)
}

/// List changes for a world, optionally filtered by status, oldest first so
/// review order matches proposal order.
pub async fn list_changes(
    db: &PlumeDb,
    world_id: &str,
    status: Option<ChangeStatus>,
) -> Result<Vec<WikiChange>, PlumeError> {
    let mut result = match status {
        Some(status) => {
            db.query(
                "SELECT * FROM wiki_change WHERE world_id = $world_id AND status = $status \
                 ORDER BY created_at",
            )
            .bind(("world_id", world_id.to_string()))
            .bind(("status", status))
            .await?
        }
        None => {
            db.query("SELECT * FROM wiki_change WHERE world_id = $world_id ORDER BY created_at")
                .bind(("world_id", world_id.to_string()))
                .await?
        }
    };
    let changes: Vec<WikiChange> = result.take(0)?;
    Ok(changes)
}

/// Find a pending `create` change proposing the same title (case-insensitive)
/// in a world. Used to suppress duplicate proposals.
pub async fn find_pending_create_by_title(
    db: &PlumeDb,
    world_id: &str,
    title: &str,
) -> Result<Option<WikiChange>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM wiki_change WHERE world_id = $world_id \
             AND status = 'pending' AND change_type = 'create' \
             AND string::lowercase(proposed_entry.title) = $title_lower",
        )
        .bind(("world_id", world_id.to_string()))
        .bind(("title_lower", title.to_lowercase()))
        .await?;
    let changes: Vec<WikiChange> = result.take(0)?;
    Ok(changes.into_iter().next())
}

/// Move a change to a terminal status with an optional reviewer note.
pub async fn set_change_status(
    db: &PlumeDb,
    id: &str,
    status: ChangeStatus,
    reviewer_note: Option<String>,
) -> Result<Option<WikiChange>, PlumeError> {
    #[derive(Serialize)]
    struct StatusPatch {
        status: ChangeStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reviewer_note: Option<String>,
    }
    let result: Option<WikiChange> = db
        .update(("wiki_change", id))
        .merge(StatusPatch {
            status,
            reviewer_note,
        })
        .await?;
    Ok(result)
}
