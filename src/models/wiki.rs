use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::utils::slug::slugify;
use crate::PlumeError;

/// A world-scoped canonical wiki article.
///
/// Entry types are open strings (`character`, `location`, `faction`,
/// `culture`, `creature`, `artifact`, `world_rule`, `event`, …) so worlds can
/// extend the taxonomy without schema changes. The slug is derived from the
/// title and stable under case-only title changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiEntry {
    pub id: RecordId,
    pub world_id: String,
    pub entry_type: String,
    pub title: String,
    pub title_lower: String,
    pub slug: String,
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
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub linked_entity_id: Option<String>,
    pub status: String,
    pub confidence_score: f64,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct WikiEntryCreate {
    pub world_id: String,
    pub entry_type: String,
    pub title: String,
    pub title_lower: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub structured_data: HashMap<String, serde_json::Value>,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub parent_id: Option<String>,
    pub linked_entity_id: Option<String>,
    pub status: String,
    pub confidence_score: f64,
}

impl WikiEntryCreate {
    pub fn new(world_id: &str, entry_type: &str, title: &str) -> Self {
        Self {
            world_id: world_id.to_string(),
            entry_type: entry_type.to_string(),
            title: title.to_string(),
            title_lower: title.to_lowercase(),
            slug: slugify(title),
            summary: String::new(),
            content: String::new(),
            structured_data: HashMap::new(),
            aliases: Vec::new(),
            tags: Vec::new(),
            parent_id: None,
            linked_entity_id: None,
            status: "draft".to_string(),
            confidence_score: 1.0,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct WikiEntryUpdate {
    pub entry_type: Option<String>,
    pub title: Option<String>,
    pub title_lower: Option<String>,
    pub slug: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub structured_data: Option<HashMap<String, serde_json::Value>>,
    pub aliases: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<Option<String>>,
    pub status: Option<String>,
    pub confidence_score: Option<f64>,
    pub updated_at: Option<Datetime>,
}

/// Create a wiki entry. Fails with `Conflict` on a case-insensitive title
/// collision within the world.
pub async fn create_wiki_entry(
    db: &PlumeDb,
    data: WikiEntryCreate,
) -> Result<WikiEntry, PlumeError> {
    match db.create("wiki_entry").content(data).await {
        Ok(Some(entry)) => Ok(entry),
        Ok(None) => Err(PlumeError::Database("Failed to create wiki entry".into())),
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("wiki_title_unique") || msg.contains("already exists") {
                Err(PlumeError::Conflict(
                    "A wiki entry with this title already exists in the world".into(),
                ))
            } else {
                Err(PlumeError::from(e))
            }
        }
    }
}

pub async fn get_wiki_entry(db: &PlumeDb, id: &str) -> Result<Option<WikiEntry>, PlumeError> {
    let result: Option<WikiEntry> = db.select(("wiki_entry", id)).await?;
    Ok(result)
}

/// Find an entry by title within a world, case-insensitively.
pub async fn find_wiki_entry_by_title(
    db: &PlumeDb,
    world_id: &str,
    title: &str,
) -> Result<Option<WikiEntry>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM wiki_entry WHERE world_id = $world_id \
             AND title_lower = $title_lower",
        )
        .bind(("world_id", world_id.to_string()))
        .bind(("title_lower", title.to_lowercase()))
        .await?;
    let entries: Vec<WikiEntry> = result.take(0)?;
    Ok(entries.into_iter().next())
}

/// List all entries in a world.
pub async fn list_wiki_entries(db: &PlumeDb, world_id: &str) -> Result<Vec<WikiEntry>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM wiki_entry WHERE world_id = $world_id ORDER BY title_lower")
        .bind(("world_id", world_id.to_string()))
        .await?;
    let entries: Vec<WikiEntry> = result.take(0)?;
    Ok(entries)
}

pub async fn update_wiki_entry(
    db: &PlumeDb,
    id: &str,
    data: WikiEntryUpdate,
) -> Result<Option<WikiEntry>, PlumeError> {
    let result: Option<WikiEntry> = db.update(("wiki_entry", id)).merge(data).await?;
    Ok(result)
}

pub async fn delete_wiki_entry(db: &PlumeDb, id: &str) -> Result<Option<WikiEntry>, PlumeError> {
    let result: Option<WikiEntry> = db.delete(("wiki_entry", id)).await?;
    Ok(result)
}
