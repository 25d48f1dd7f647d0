//! Codex service: the per-manuscript entity and relationship store.
//!
//! Entity CRUD with case-insensitive uniqueness, entity merging with
//! relationship remapping, the extractor-fed suggestion lifecycle, and the
//! asynchronous wiki-sync hook that proposes wiki entries for new entities.

use std::collections::HashMap;

use rapidfuzz::distance::levenshtein;
use serde_json::json;
use tracing::{info, warn};

use crate::db::connection::PlumeDb;
use crate::models::change::{ChangeStatus, ChangeType, ProposedEntry, WikiChangeCreate};
use crate::models::entity::{
    create_entity, delete_entity, find_entity_by_name, get_entity, list_entities, update_entity,
    Entity, EntityCreate, EntityUpdate,
};
use crate::models::manuscript::get_manuscript;
use crate::models::relationship::remap_relationships;
use crate::models::suggestion::{
    create_suggestion, find_suggestion_by_name, get_suggestion, list_suggestions,
    set_suggestion_status, EntitySuggestion, EntitySuggestionCreate, SuggestionStatus,
};
use crate::models::EntityType;
use crate::services::extractor::EntityCandidate;
use crate::services::queue::ChangeQueueService;
use crate::PlumeError;

/// Names at or above this normalized similarity are flagged as possible
/// duplicates on new suggestions.
const DUPLICATE_SIMILARITY: f64 = 0.85;

/// How attribute maps combine during an entity merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Union lists, concatenate distinct strings, fill missing keys.
    #[default]
    Merge,
    /// Only fill keys the primary is missing; never rewrite primary values.
    PreferPrimary,
}

/// Overrides a reviewer may apply when approving a suggestion.
#[derive(Debug, Default)]
pub struct SuggestionOverrides {
    pub name: Option<String>,
    pub entity_type: Option<EntityType>,
    pub description: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub attributes: Option<HashMap<String, serde_json::Value>>,
}

pub struct CodexService;

impl CodexService {
    /// Create an entity. When the manuscript belongs to a world, a wiki-sync
    /// proposal is staged in the background (never blocking the caller).
    pub async fn create_entity(
        db: &PlumeDb,
        manuscript_id: &str,
        entity_type: EntityType,
        name: &str,
        aliases: Vec<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Result<Entity, PlumeError> {
        if name.trim().is_empty() {
            return Err(PlumeError::Validation("Entity name is required".into()));
        }

        let mut create = EntityCreate::new(manuscript_id, entity_type, name.trim());
        create.aliases = aliases;
        create.attributes = attributes;
        let entity = create_entity(db, create).await?;

        // Asynchronous wiki-sync: propose a wiki entry for world-scoped
        // manuscripts without blocking entity creation.
        let db_clone = db.clone();
        let manuscript_id = manuscript_id.to_string();
        let entity_clone = entity.clone();
        tokio::spawn(async move {
            if let Err(e) = sync_entity_to_wiki(&db_clone, &manuscript_id, &entity_clone).await {
                warn!("wiki sync for '{}' failed: {e}", entity_clone.name);
            }
        });

        Ok(entity)
    }

    pub async fn get_entity(db: &PlumeDb, entity_id: &str) -> Result<Option<Entity>, PlumeError> {
        get_entity(db, entity_id).await
    }

    pub async fn list_entities(
        db: &PlumeDb,
        manuscript_id: &str,
    ) -> Result<Vec<Entity>, PlumeError> {
        list_entities(db, manuscript_id).await
    }

    /// Delete an entity, leaving no dangling references: relationship edges
    /// are removed, chapter character-sheet links and wiki back-links are
    /// nulled. The linked wiki entry itself is never deleted.
    pub async fn delete_entity(db: &PlumeDb, entity_id: &str) -> Result<bool, PlumeError> {
        db.query(
            "UPDATE chapter SET linked_entity_id = NONE WHERE linked_entity_id = $entity_id",
        )
        .bind(("entity_id", entity_id.to_string()))
        .await?;
        db.query(
            "UPDATE wiki_entry SET linked_entity_id = NONE WHERE linked_entity_id = $entity_id",
        )
        .bind(("entity_id", entity_id.to_string()))
        .await?;

        Ok(delete_entity(db, entity_id).await?.is_some())
    }

    /// Merge secondary entities into a primary one.
    ///
    /// Aliases union (with secondary names added), attribute maps merge
    /// (lists set-unioned, strings concatenated, missing keys filled),
    /// appearance history appends, relationships and character-sheet links
    /// remap, self-edges drop, secondaries are deleted.
    pub async fn merge_entities(
        db: &PlumeDb,
        primary_id: &str,
        secondary_ids: &[String],
        strategy: MergeStrategy,
    ) -> Result<Entity, PlumeError> {
        let Some(primary) = get_entity(db, primary_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "entity".into(),
                id: primary_id.into(),
            });
        };

        let mut aliases = primary.aliases.clone();
        let mut attributes = primary.attributes.clone();
        let mut template_data = primary.template_data.clone();
        let mut appearance_history = primary.appearance_history.clone();

        for secondary_id in secondary_ids {
            if secondary_id == primary_id {
                return Err(PlumeError::Validation(
                    "Cannot merge an entity into itself".into(),
                ));
            }
            let Some(secondary) = get_entity(db, secondary_id).await? else {
                return Err(PlumeError::NotFound {
                    entity_type: "entity".into(),
                    id: secondary_id.clone(),
                });
            };

            if !secondary.name.eq_ignore_ascii_case(&primary.name)
                && !aliases
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(&secondary.name))
            {
                aliases.push(secondary.name.clone());
            }
            for alias in &secondary.aliases {
                if !alias.eq_ignore_ascii_case(&primary.name)
                    && !aliases.iter().any(|a| a.eq_ignore_ascii_case(alias))
                {
                    aliases.push(alias.clone());
                }
            }

            match strategy {
                MergeStrategy::Merge => merge_attribute_maps(&mut attributes, &secondary.attributes),
                MergeStrategy::PreferPrimary => {
                    for (key, value) in &secondary.attributes {
                        attributes.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
            for (key, value) in &secondary.template_data {
                template_data
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
            appearance_history.extend(secondary.appearance_history.iter().cloned());

            // Remap graph edges and character-sheet links before deleting.
            remap_relationships(db, secondary_id, primary_id).await?;
            db.query(
                "UPDATE chapter SET linked_entity_id = $primary \
                 WHERE linked_entity_id = $secondary",
            )
            .bind(("primary", primary_id.to_string()))
            .bind(("secondary", secondary_id.to_string()))
            .await?;
            db.query(
                "UPDATE wiki_entry SET linked_entity_id = $primary \
                 WHERE linked_entity_id = $secondary",
            )
            .bind(("primary", primary_id.to_string()))
            .bind(("secondary", secondary_id.to_string()))
            .await?;

            delete_entity(db, secondary_id).await?;
        }

        let merged = update_entity(
            db,
            primary_id,
            EntityUpdate {
                aliases: Some(aliases),
                attributes: Some(attributes),
                template_data: Some(template_data),
                appearance_history: Some(appearance_history),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| PlumeError::NotFound {
            entity_type: "entity".into(),
            id: primary_id.into(),
        })?;

        info!(
            primary_id,
            merged = secondary_ids.len(),
            "entities merged"
        );
        Ok(merged)
    }

    /// Stage an extractor candidate as a suggestion.
    ///
    /// Returns `None` when the entity already exists in the codex. An
    /// existing suggestion for the same (name, type), in any status, is
    /// returned instead of a duplicate. Near-duplicate existing names are
    /// flagged on the suggestion for the reviewer.
    pub async fn create_suggestion_from_candidate(
        db: &PlumeDb,
        manuscript_id: &str,
        candidate: &EntityCandidate,
    ) -> Result<Option<EntitySuggestion>, PlumeError> {
        if let Some(existing) =
            find_suggestion_by_name(db, manuscript_id, &candidate.name, candidate.entity_type)
                .await?
        {
            return Ok(Some(existing));
        }
        if find_entity_by_name(db, manuscript_id, &candidate.name)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let possible_duplicate_of =
            find_similar_entity_name(db, manuscript_id, &candidate.name).await?;

        let suggestion = create_suggestion(
            db,
            EntitySuggestionCreate {
                manuscript_id: manuscript_id.to_string(),
                name: candidate.name.clone(),
                name_lower: candidate.name.to_lowercase(),
                entity_type: candidate.entity_type,
                context: candidate.context.clone(),
                confidence: candidate.confidence,
                extracted_description: candidate.description.clone(),
                extracted_attributes: candidate.extracted_attributes.clone(),
                possible_duplicate_of,
                status: SuggestionStatus::Pending,
            },
        )
        .await?;
        Ok(Some(suggestion))
    }

    pub async fn pending_suggestions(
        db: &PlumeDb,
        manuscript_id: &str,
    ) -> Result<Vec<EntitySuggestion>, PlumeError> {
        list_suggestions(db, manuscript_id, Some(SuggestionStatus::Pending)).await
    }

    /// Approve a suggestion, creating the entity with optional overrides.
    pub async fn approve_suggestion(
        db: &PlumeDb,
        suggestion_id: &str,
        overrides: SuggestionOverrides,
    ) -> Result<Entity, PlumeError> {
        let Some(suggestion) = get_suggestion(db, suggestion_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "entity_suggestion".into(),
                id: suggestion_id.into(),
            });
        };
        if suggestion.status != SuggestionStatus::Pending {
            return Err(PlumeError::Conflict("already processed".into()));
        }

        let name = overrides.name.unwrap_or_else(|| suggestion.name.clone());
        let entity_type = overrides.entity_type.unwrap_or(suggestion.entity_type);

        let mut attributes = overrides.attributes.unwrap_or_default();
        for (bucket, values) in &suggestion.extracted_attributes {
            attributes
                .entry(bucket.clone())
                .or_insert_with(|| json!(values));
        }
        if let Some(description) = overrides
            .description
            .or_else(|| suggestion.extracted_description.clone())
        {
            attributes
                .entry("description".to_string())
                .or_insert_with(|| json!(description));
        }

        let entity = Self::create_entity(
            db,
            &suggestion.manuscript_id,
            entity_type,
            &name,
            overrides.aliases.unwrap_or_default(),
            attributes,
        )
        .await?;

        set_suggestion_status(db, suggestion_id, SuggestionStatus::Approved).await?;
        Ok(entity)
    }

    /// Reject a suggestion. Idempotent after the first terminal transition.
    pub async fn reject_suggestion(db: &PlumeDb, suggestion_id: &str) -> Result<(), PlumeError> {
        let Some(suggestion) = get_suggestion(db, suggestion_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "entity_suggestion".into(),
                id: suggestion_id.into(),
            });
        };
        if suggestion.status != SuggestionStatus::Pending {
            return Err(PlumeError::Conflict("already processed".into()));
        }
        set_suggestion_status(db, suggestion_id, SuggestionStatus::Rejected).await?;
        Ok(())
    }
}

/// Merge secondary attributes into the primary map: fill missing keys, union
/// lists, concatenate distinct strings.
fn merge_attribute_maps(
    primary: &mut HashMap<String, serde_json::Value>,
    secondary: &HashMap<String, serde_json::Value>,
) {
    for (key, value) in secondary {
        match primary.get_mut(key) {
            None => {
                primary.insert(key.clone(), value.clone());
            }
            Some(existing) if existing.is_null() => {
                *existing = value.clone();
            }
            Some(serde_json::Value::Array(existing)) => {
                if let serde_json::Value::Array(incoming) = value {
                    for item in incoming {
                        if !existing.contains(item) {
                            existing.push(item.clone());
                        }
                    }
                }
            }
            Some(serde_json::Value::String(existing)) => {
                if let serde_json::Value::String(incoming) = value {
                    if !incoming.is_empty() && !existing.contains(incoming.as_str()) {
                        existing.push_str("\n\n");
                        existing.push_str(incoming);
                    }
                }
            }
            Some(_) => {}
        }
    }
}

/// Nearest existing entity name by normalized Levenshtein similarity, when
/// it clears the duplicate threshold.
async fn find_similar_entity_name(
    db: &PlumeDb,
    manuscript_id: &str,
    name: &str,
) -> Result<Option<String>, PlumeError> {
    let name_lower = name.to_lowercase();
    let mut best: Option<(f64, String)> = None;

    for entity in list_entities(db, manuscript_id).await? {
        let score =
            levenshtein::normalized_similarity(name_lower.chars(), entity.name_lower.chars());
        if score >= DUPLICATE_SIMILARITY {
            match &best {
                Some((existing, _)) if *existing >= score => {}
                _ => best = Some((score, entity.name.clone())),
            }
        }
    }

    Ok(best.map(|(_, name)| name))
}

/// Propose a wiki entry for a codex entity when its manuscript belongs to a
/// world and no entry or pending proposal exists yet.
pub async fn sync_entity_to_wiki(
    db: &PlumeDb,
    manuscript_id: &str,
    entity: &Entity,
) -> Result<(), PlumeError> {
    let Some(manuscript) = get_manuscript(db, manuscript_id).await? else {
        return Ok(());
    };
    let Some(world_id) = manuscript.world_id else {
        return Ok(());
    };

    let entry_type = match entity.entity_type {
        EntityType::Character => "character",
        EntityType::Location => "location",
        EntityType::Organization => "faction",
        EntityType::Culture => "culture",
        EntityType::Creature => "creature",
        EntityType::Item => "artifact",
        EntityType::Event => "event",
        EntityType::Lore => "lore",
    };

    let summary = entity
        .attributes
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    ChangeQueueService::create_change(
        db,
        WikiChangeCreate {
            world_id,
            change_type: ChangeType::Create,
            wiki_entry_id: None,
            field_changed: None,
            old_value: None,
            new_value: None,
            proposed_entry: Some(ProposedEntry {
                entry_type: entry_type.to_string(),
                title: entity.name.clone(),
                summary,
                content: String::new(),
                structured_data: HashMap::new(),
                aliases: entity.aliases.clone(),
                tags: Vec::new(),
            }),
            reason: format!(
                "Codex entity '{}' created in manuscript '{}'",
                entity.name, manuscript.title
            ),
            source_text: String::new(),
            source_chapter_id: None,
            confidence: 0.8,
            status: ChangeStatus::Pending,
        },
    )
    .await?;

    info!(entity = %entity.name, "wiki-sync proposal staged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_attribute_maps_fills_missing() {
        let mut primary = HashMap::from([("role".to_string(), json!("captain"))]);
        let secondary = HashMap::from([("age".to_string(), json!("41"))]);
        merge_attribute_maps(&mut primary, &secondary);
        assert_eq!(primary.get("age"), Some(&json!("41")));
        assert_eq!(primary.get("role"), Some(&json!("captain")));
    }

    #[test]
    fn test_merge_attribute_maps_unions_lists() {
        let mut primary = HashMap::from([("personality".to_string(), json!(["calm", "loyal"]))]);
        let secondary = HashMap::from([("personality".to_string(), json!(["loyal", "stubborn"]))]);
        merge_attribute_maps(&mut primary, &secondary);
        assert_eq!(
            primary.get("personality"),
            Some(&json!(["calm", "loyal", "stubborn"]))
        );
    }

    #[test]
    fn test_merge_attribute_maps_concatenates_strings() {
        let mut primary = HashMap::from([("notes".to_string(), json!("Keeps the ledger."))]);
        let secondary = HashMap::from([("notes".to_string(), json!("Owes the smith."))]);
        merge_attribute_maps(&mut primary, &secondary);
        let merged = primary.get("notes").unwrap().as_str().unwrap();
        assert!(merged.contains("Keeps the ledger."));
        assert!(merged.contains("Owes the smith."));
    }

    #[test]
    fn test_merge_attribute_maps_skips_duplicate_strings() {
        let mut primary = HashMap::from([("notes".to_string(), json!("Keeps the ledger."))]);
        let secondary = HashMap::from([("notes".to_string(), json!("Keeps the ledger."))]);
        merge_attribute_maps(&mut primary, &secondary);
        assert_eq!(primary.get("notes"), Some(&json!("Keeps the ledger.")));
    }
}
