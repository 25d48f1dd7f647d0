//! Wiki service: world-scoped canonical articles.
//!
//! Handles entry CRUD with the case-insensitive title invariant, type-change
//! cascades onto linked codex entities, back-link hygiene on delete, and
//! entry merging.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::db::connection::PlumeDb;
use crate::models::wiki::{
    create_wiki_entry, delete_wiki_entry, find_wiki_entry_by_title, get_wiki_entry,
    list_wiki_entries, update_wiki_entry, WikiEntry, WikiEntryCreate, WikiEntryUpdate,
};
use crate::models::{entity, record_key, EntityType};
use crate::utils::slug::slugify;
use crate::PlumeError;

/// Optional fields accepted when creating an entry.
#[derive(Debug, Default)]
pub struct NewEntry {
    pub summary: String,
    pub content: String,
    pub structured_data: HashMap<String, serde_json::Value>,
    pub aliases: Vec<String>,
    pub tags: Vec<String>,
    pub parent_id: Option<String>,
    pub linked_entity_id: Option<String>,
    pub confidence_score: Option<f64>,
}

pub struct WikiService;

impl WikiService {
    /// Create an entry; fails with `Conflict` on a case-insensitive title
    /// collision within the world.
    pub async fn create_entry(
        db: &PlumeDb,
        world_id: &str,
        entry_type: &str,
        title: &str,
        extra: NewEntry,
    ) -> Result<WikiEntry, PlumeError> {
        if title.trim().is_empty() {
            return Err(PlumeError::Validation("Entry title is required".into()));
        }
        if find_wiki_entry_by_title(db, world_id, title).await?.is_some() {
            return Err(PlumeError::Conflict(format!(
                "A wiki entry titled '{title}' already exists in this world"
            )));
        }

        let mut create = WikiEntryCreate::new(world_id, entry_type, title);
        create.summary = extra.summary;
        create.content = extra.content;
        create.structured_data = extra.structured_data;
        create.aliases = extra.aliases;
        create.tags = extra.tags;
        create.parent_id = extra.parent_id;
        create.linked_entity_id = extra.linked_entity_id;
        if let Some(confidence) = extra.confidence_score {
            create.confidence_score = confidence.clamp(0.0, 1.0);
        }

        create_wiki_entry(db, create).await
    }

    /// Update an entry. Retitling keeps the slug in sync; changing
    /// `entry_type` cascades to the linked codex entity's type when the type
    /// translates into the codex taxonomy.
    pub async fn update_entry(
        db: &PlumeDb,
        entry_id: &str,
        mut update: WikiEntryUpdate,
    ) -> Result<WikiEntry, PlumeError> {
        let Some(existing) = get_wiki_entry(db, entry_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "wiki_entry".into(),
                id: entry_id.into(),
            });
        };

        if let Some(title) = &update.title {
            if title.to_lowercase() != existing.title_lower {
                if let Some(other) =
                    find_wiki_entry_by_title(db, &existing.world_id, title).await?
                {
                    if record_key(&other.id) != entry_id {
                        return Err(PlumeError::Conflict(format!(
                            "A wiki entry titled '{title}' already exists in this world"
                        )));
                    }
                }
            }
            update.title_lower = Some(title.to_lowercase());
            update.slug = Some(slugify(title));
        }

        let type_changed = update
            .entry_type
            .as_ref()
            .is_some_and(|t| *t != existing.entry_type);

        let updated = update_wiki_entry(db, entry_id, update)
            .await?
            .ok_or_else(|| PlumeError::NotFound {
                entity_type: "wiki_entry".into(),
                id: entry_id.into(),
            })?;

        if type_changed {
            if let Some(linked) = &updated.linked_entity_id {
                match EntityType::parse(&updated.entry_type) {
                    Ok(entity_type) => {
                        entity::update_entity(
                            db,
                            linked,
                            entity::EntityUpdate {
                                entity_type: Some(entity_type),
                                ..Default::default()
                            },
                        )
                        .await?;
                    }
                    Err(_) => warn!(
                        entry_type = %updated.entry_type,
                        "entry type has no codex equivalent; linked entity left unchanged"
                    ),
                }
            }
        }

        Ok(updated)
    }

    /// Delete an entry, clearing codex back-links. Linked entities survive;
    /// only their `linked_wiki_entry_id` is nulled.
    pub async fn delete_entry(db: &PlumeDb, entry_id: &str) -> Result<bool, PlumeError> {
        db.query(
            "UPDATE entity SET linked_wiki_entry_id = NONE \
             WHERE linked_wiki_entry_id = $entry_id",
        )
        .bind(("entry_id", entry_id.to_string()))
        .await?;

        Ok(delete_wiki_entry(db, entry_id).await?.is_some())
    }

    /// Merge `source` into `target`:
    /// aliases are unioned and the source title becomes an alias; empty
    /// target fields take the source's value; structured data is unioned
    /// with target winning conflicts; references are remapped; the source is
    /// deleted. Caller-provided `merged_data` is applied last and wins over
    /// the computed merge.
    pub async fn merge_entries(
        db: &PlumeDb,
        source_id: &str,
        target_id: &str,
        merged_data: Option<WikiEntryUpdate>,
    ) -> Result<WikiEntry, PlumeError> {
        if source_id == target_id {
            return Err(PlumeError::Validation(
                "Cannot merge an entry into itself".into(),
            ));
        }
        let Some(source) = get_wiki_entry(db, source_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "wiki_entry".into(),
                id: source_id.into(),
            });
        };
        let Some(target) = get_wiki_entry(db, target_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "wiki_entry".into(),
                id: target_id.into(),
            });
        };

        let mut aliases = target.aliases.clone();
        for alias in source
            .aliases
            .iter()
            .chain(std::iter::once(&source.title))
        {
            if !aliases
                .iter()
                .any(|a| a.eq_ignore_ascii_case(alias))
                && !alias.eq_ignore_ascii_case(&target.title)
            {
                aliases.push(alias.clone());
            }
        }

        let mut structured = source.structured_data.clone();
        for (key, value) in &target.structured_data {
            structured.insert(key.clone(), value.clone());
        }

        let mut tags = target.tags.clone();
        for tag in &source.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        let update = WikiEntryUpdate {
            summary: if target.summary.is_empty() {
                Some(source.summary.clone())
            } else {
                None
            },
            content: if target.content.is_empty() {
                Some(source.content.clone())
            } else {
                None
            },
            aliases: Some(aliases),
            tags: Some(tags),
            structured_data: Some(structured),
            linked_entity_id: match (&target.linked_entity_id, &source.linked_entity_id) {
                (None, Some(linked)) => Some(Some(linked.clone())),
                _ => None,
            },
            ..Default::default()
        };

        let merged = update_wiki_entry(db, target_id, update)
            .await?
            .ok_or_else(|| PlumeError::NotFound {
                entity_type: "wiki_entry".into(),
                id: target_id.into(),
            })?;

        // Remap references: codex back-links and child entries.
        db.query(
            "UPDATE entity SET linked_wiki_entry_id = $target \
             WHERE linked_wiki_entry_id = $source",
        )
        .bind(("target", target_id.to_string()))
        .bind(("source", source_id.to_string()))
        .await?;
        db.query("UPDATE wiki_entry SET parent_id = $target WHERE parent_id = $source")
            .bind(("target", target_id.to_string()))
            .bind(("source", source_id.to_string()))
            .await?;

        delete_wiki_entry(db, source_id).await?;

        let merged = match merged_data {
            Some(overrides) => Self::update_entry(db, target_id, overrides).await?,
            None => merged,
        };

        info!(source_id, target_id, "wiki entries merged");
        Ok(merged)
    }

    pub async fn get_entry(db: &PlumeDb, entry_id: &str) -> Result<Option<WikiEntry>, PlumeError> {
        get_wiki_entry(db, entry_id).await
    }

    pub async fn list_entries(db: &PlumeDb, world_id: &str) -> Result<Vec<WikiEntry>, PlumeError> {
        list_wiki_entries(db, world_id).await
    }
}
