use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::models::EntityType;
use crate::PlumeError;

/// Lifecycle of a pending entity suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

/// An extractor-proposed codex entity awaiting author review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySuggestion {
    pub id: RecordId,
    pub manuscript_id: String,
    pub name: String,
    pub name_lower: String,
    pub entity_type: EntityType,
    /// The sentence the entity was found in.
    pub context: String,
    pub confidence: f64,
    #[serde(default)]
    pub extracted_description: Option<String>,
    #[serde(default)]
    pub extracted_attributes: HashMap<String, Vec<String>>,
    /// Name of a near-duplicate existing entity, when fuzzy matching found
    /// one close enough to warrant reviewer attention.
    #[serde(default)]
    pub possible_duplicate_of: Option<String>,
    pub status: SuggestionStatus,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct EntitySuggestionCreate {
    pub manuscript_id: String,
    pub name: String,
    pub name_lower: String,
    pub entity_type: EntityType,
    pub context: String,
    pub confidence: f64,
    pub extracted_description: Option<String>,
    pub extracted_attributes: HashMap<String, Vec<String>>,
    pub possible_duplicate_of: Option<String>,
    pub status: SuggestionStatus,
}

pub async fn create_suggestion(
    db: &PlumeDb,
    data: EntitySuggestionCreate,
) -> Result<EntitySuggestion, PlumeError> {
    let result: Option<EntitySuggestion> = db.create("entity_suggestion").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create suggestion".into()))
}

pub async fn get_suggestion(
    db: &PlumeDb,
    id: &str,
) -> Result<Option<EntitySuggestion>, PlumeError> {
    let result: Option<EntitySuggestion> = db.select(("entity_suggestion", id)).await?;
    Ok(result)
}

/// List suggestions for a manuscript, optionally filtered by status,
/// newest first.
pub async fn list_suggestions(
    db: &PlumeDb,
    manuscript_id: &str,
    status: Option<SuggestionStatus>,
) -> Result<Vec<EntitySuggestion>, PlumeError> {
    let mut result = match status {
        Some(status) => {
            db.query(
                "SELECT * FROM entity_suggestion WHERE manuscript_id = $manuscript_id \
                 AND status = $status ORDER BY created_at DESC",
            )
            .bind(("manuscript_id", manuscript_id.to_string()))
            .bind(("status", status))
            .await?
        }
        None => {
            db.query(
                "SELECT * FROM entity_suggestion WHERE manuscript_id = $manuscript_id \
                 ORDER BY created_at DESC",
            )
            .bind(("manuscript_id", manuscript_id.to_string()))
            .await?
        }
    };
    let suggestions: Vec<EntitySuggestion> = result.take(0)?;
    Ok(suggestions)
}

/// Find a suggestion by case-folded name and type, in any status.
pub async fn find_suggestion_by_name(
    db: &PlumeDb,
    manuscript_id: &str,
    name: &str,
    entity_type: EntityType,
) -> Result<Option<EntitySuggestion>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM entity_suggestion WHERE manuscript_id = $manuscript_id \
             AND name_lower = $name_lower AND entity_type = $entity_type",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .bind(("name_lower", name.to_lowercase()))
        .bind(("entity_type", entity_type))
        .await?;
    let found: Vec<EntitySuggestion> = result.take(0)?;
    Ok(found.into_iter().next())
}

/// Transition a suggestion to a terminal status.
pub async fn set_suggestion_status(
    db: &PlumeDb,
    id: &str,
    status: SuggestionStatus,
) -> Result<Option<EntitySuggestion>, PlumeError> {
    #[derive(Serialize)]
    struct StatusPatch {
        status: SuggestionStatus,
    }
    let result: Option<EntitySuggestion> = db
        .update(("entity_suggestion", id))
        .merge(StatusPatch { status })
        .await?;
    Ok(result)
}
