use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Codex entity taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Character,
    Location,
    Item,
    Lore,
    Organization,
    Event,
    Culture,
    Creature,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Character => "CHARACTER",
            EntityType::Location => "LOCATION",
            EntityType::Item => "ITEM",
            EntityType::Lore => "LORE",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Event => "EVENT",
            EntityType::Culture => "CULTURE",
            EntityType::Creature => "CREATURE",
        }
    }

    pub fn parse(s: &str) -> Result<Self, PlumeError> {
        match s.to_uppercase().as_str() {
            "CHARACTER" => Ok(EntityType::Character),
            "LOCATION" => Ok(EntityType::Location),
            "ITEM" => Ok(EntityType::Item),
            "LORE" => Ok(EntityType::Lore),
            "ORGANIZATION" => Ok(EntityType::Organization),
            "EVENT" => Ok(EntityType::Event),
            "CULTURE" => Ok(EntityType::Culture),
            "CREATURE" => Ok(EntityType::Creature),
            other => Err(PlumeError::Validation(format!(
                "Unknown entity type: {other}"
            ))),
        }
    }
}

/// Where an entity lives: one manuscript, a series, or the whole world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityScope {
    #[default]
    Manuscript,
    Series,
    World,
}

/// A codex entity: character, location, item, or lore atom bound to a
/// manuscript.
///
/// `attributes` is an opaque map with a documented set of recognized keys
/// (`appearance[]`, `personality[]`, `background[]`, `actions[]`,
/// `description`, `notes`, `role`, `eye_color`, `hair_color`, `age`).
/// Unknown keys are preserved but inert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: RecordId,
    pub manuscript_id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub name_lower: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub template_data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub appearance_history: Vec<serde_json::Value>,
    #[serde(default)]
    pub linked_wiki_entry_id: Option<String>,
    #[serde(default)]
    pub scope: EntityScope,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// Data for creating a new entity.
#[derive(Debug, Serialize)]
pub struct EntityCreate {
    pub manuscript_id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub name_lower: String,
    pub aliases: Vec<String>,
    pub attributes: HashMap<String, serde_json::Value>,
    pub template_data: HashMap<String, serde_json::Value>,
    pub appearance_history: Vec<serde_json::Value>,
    pub linked_wiki_entry_id: Option<String>,
    pub scope: EntityScope,
}

impl EntityCreate {
    pub fn new(manuscript_id: &str, entity_type: EntityType, name: &str) -> Self {
        Self {
            manuscript_id: manuscript_id.to_string(),
            entity_type,
            name: name.to_string(),
            name_lower: name.to_lowercase(),
            aliases: Vec::new(),
            attributes: HashMap::new(),
            template_data: HashMap::new(),
            appearance_history: Vec::new(),
            linked_wiki_entry_id: None,
            scope: EntityScope::Manuscript,
        }
    }
}

/// Data for updating an entity.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct EntityUpdate {
    pub entity_type: Option<EntityType>,
    pub name: Option<String>,
    pub name_lower: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub attributes: Option<HashMap<String, serde_json::Value>>,
    pub template_data: Option<HashMap<String, serde_json::Value>>,
    pub appearance_history: Option<Vec<serde_json::Value>>,
    /// `Some(None)` clears the wiki back-link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_wiki_entry_id: Option<Option<String>>,
    pub scope: Option<EntityScope>,
    pub updated_at: Option<Datetime>,
}

/// Create a new entity.
///
/// Fails with `Conflict` when an entity with the same case-folded name
/// already exists in the manuscript (unique index).
pub async fn create_entity(db: &PlumeDb, data: EntityCreate) -> Result<Entity, PlumeError> {
    match db.create("entity").content(data).await {
        Ok(Some(entity)) => Ok(entity),
        Ok(None) => Err(PlumeError::Database("Failed to create entity".into())),
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("entity_name_unique") || msg.contains("already exists") {
                Err(PlumeError::Conflict(
                    "An entity with this name already exists in the manuscript".into(),
                ))
            } else {
                Err(PlumeError::from(e))
            }
        }
    }
}

/// Get an entity by ID (the key part, not the full RecordId).
pub async fn get_entity(db: &PlumeDb, id: &str) -> Result<Option<Entity>, PlumeError> {
    let result: Option<Entity> = db.select(("entity", id)).await?;
    Ok(result)
}

/// List all entities in a manuscript.
pub async fn list_entities(db: &PlumeDb, manuscript_id: &str) -> Result<Vec<Entity>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM entity WHERE manuscript_id = $manuscript_id ORDER BY name_lower")
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    let entities: Vec<Entity> = result.take(0)?;
    Ok(entities)
}

/// Find an entity by name within a manuscript, case-insensitively, matching
/// the canonical name or any alias.
pub async fn find_entity_by_name(
    db: &PlumeDb,
    manuscript_id: &str,
    name: &str,
) -> Result<Option<Entity>, PlumeError> {
    let needle = name.to_lowercase();
    let mut result = db
        .query(
            "SELECT * FROM entity WHERE manuscript_id = $manuscript_id \
             AND (name_lower = $needle \
                  OR $needle IN array::map(aliases, |$a| string::lowercase($a)))",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .bind(("needle", needle))
        .await?;
    let entities: Vec<Entity> = result.take(0)?;
    Ok(entities.into_iter().next())
}

/// Update an entity by ID.
pub async fn update_entity(
    db: &PlumeDb,
    id: &str,
    data: EntityUpdate,
) -> Result<Option<Entity>, PlumeError> {
    let result: Option<Entity> = db.update(("entity", id)).merge(data).await?;
    Ok(result)
}

/// Delete an entity by ID. Relationship edges touching it are removed;
/// the linked wiki entry (if any) is left in place.
pub async fn delete_entity(db: &PlumeDb, id: &str) -> Result<Option<Entity>, PlumeError> {
    // Remove relationship edges first so no dangling edges survive.
    db.query("DELETE relates_to WHERE in = $rid OR out = $rid")
        .bind(("rid", RecordId::from_table_key("entity", id)))
        .await?;
    let result: Option<Entity> = db.delete(("entity", id)).await?;
    Ok(result)
}
