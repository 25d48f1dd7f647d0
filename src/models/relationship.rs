use serde::{Deserialize, Serialize};
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Relationship taxonomy between codex entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationshipKind {
    Romantic,
    Conflict,
    Alliance,
    Family,
    Professional,
    Acquaintance,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Romantic => "ROMANTIC",
            RelationshipKind::Conflict => "CONFLICT",
            RelationshipKind::Alliance => "ALLIANCE",
            RelationshipKind::Family => "FAMILY",
            RelationshipKind::Professional => "PROFESSIONAL",
            RelationshipKind::Acquaintance => "ACQUAINTANCE",
        }
    }
}

/// A recorded interaction context supporting a relationship edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipContext {
    #[serde(default)]
    pub scene_id: Option<String>,
    pub description: String,
}

/// Directed relationship edge between two entities.
///
/// Stored as a SurrealDB graph edge via RELATE; `in`/`out` are renamed from
/// SurrealDB's reserved names. `strength` accumulates observed interactions:
/// re-creating an existing `(source, target, type)` edge sums strengths and
/// appends contexts instead of inserting a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RecordId,
    #[serde(rename = "in")]
    pub source: RecordId,
    #[serde(rename = "out")]
    pub target: RecordId,
    pub rel_type: RelationshipKind,
    pub strength: i64,
    #[serde(default)]
    pub contexts: Vec<RelationshipContext>,
    pub created_at: Datetime,
}

/// Data for creating (or reinforcing) a relationship.
#[derive(Debug)]
pub struct RelationshipCreate {
    pub source_id: String,
    pub target_id: String,
    pub rel_type: RelationshipKind,
    pub strength: i64,
    pub context: Option<RelationshipContext>,
}

/// Create a relationship edge between two entities, collapsing onto an
/// existing `(source, target, type)` edge when one exists.
pub async fn create_relationship(
    db: &PlumeDb,
    data: RelationshipCreate,
) -> Result<Relationship, PlumeError> {
    if data.source_id == data.target_id {
        return Err(PlumeError::Validation(
            "Relationships cannot point from an entity to itself".into(),
        ));
    }
    let strength = data.strength.max(1);
    let contexts: Vec<RelationshipContext> = data.context.into_iter().collect();
    let source = RecordId::from_table_key("entity", data.source_id.as_str());
    let target = RecordId::from_table_key("entity", data.target_id.as_str());

    // Collapse onto an existing edge of the same type.
    let mut existing = db
        .query(
            "SELECT * FROM relates_to WHERE in = $source AND out = $target \
             AND rel_type = $rel_type",
        )
        .bind(("source", source.clone()))
        .bind(("target", target.clone()))
        .bind(("rel_type", data.rel_type))
        .await?;
    let found: Vec<Relationship> = existing.take(0)?;

    if let Some(edge) = found.into_iter().next() {
        let mut result = db
            .query(
                "UPDATE $edge SET strength += $strength, \
                 contexts = array::concat(contexts, $contexts) RETURN AFTER",
            )
            .bind(("edge", edge.id.clone()))
            .bind(("strength", strength))
            .bind(("contexts", contexts))
            .await?;
        let updated: Option<Relationship> = result.take(0)?;
        return updated.ok_or_else(|| PlumeError::Database("Failed to reinforce relationship".into()));
    }

    let mut result = db
        .query(
            "RELATE $source->relates_to->$target SET \
             rel_type = $rel_type, strength = $strength, contexts = $contexts",
        )
        .bind(("source", source))
        .bind(("target", target))
        .bind(("rel_type", data.rel_type))
        .bind(("strength", strength))
        .bind(("contexts", contexts))
        .await?;
    let rel: Option<Relationship> = result.take(0)?;
    rel.ok_or_else(|| PlumeError::Database("Failed to create relationship".into()))
}

/// Get all relationships involving an entity (either direction).
pub async fn get_relationships(
    db: &PlumeDb,
    entity_id: &str,
) -> Result<Vec<Relationship>, PlumeError> {
    let rid = RecordId::from_table_key("entity", entity_id);
    let mut result = db
        .query("SELECT * FROM relates_to WHERE in = $rid OR out = $rid")
        .bind(("rid", rid))
        .await?;
    let rels: Vec<Relationship> = result.take(0)?;
    Ok(rels)
}

/// Remap every relationship touching `from_id` onto `to_id`, then drop any
/// resulting self-edges. Used by entity merges.
pub async fn remap_relationships(
    db: &PlumeDb,
    from_id: &str,
    to_id: &str,
) -> Result<(), PlumeError> {
    let from = RecordId::from_table_key("entity", from_id);
    let to = RecordId::from_table_key("entity", to_id);

    // Graph edge endpoints cannot be rewritten in place; re-issue each edge
    // against the new endpoint and delete the old one.
    let old_edges: Vec<Relationship> = {
        let mut result = db
            .query("SELECT * FROM relates_to WHERE in = $from OR out = $from")
            .bind(("from", from.clone()))
            .await?;
        result.take(0)?
    };

    for edge in old_edges {
        let new_source = if edge.source == from { to.clone() } else { edge.source.clone() };
        let new_target = if edge.target == from { to.clone() } else { edge.target.clone() };

        db.query("DELETE $edge").bind(("edge", edge.id.clone())).await?;

        if new_source == new_target {
            // Self-edges do not survive merges.
            continue;
        }

        create_relationship(
            db,
            RelationshipCreate {
                source_id: new_source.key().to_string(),
                target_id: new_target.key().to_string(),
                rel_type: edge.rel_type,
                strength: edge.strength,
                context: None,
            },
        )
        .await?;
        // Carry the accumulated contexts over onto the surviving edge.
        if !edge.contexts.is_empty() {
            db.query(
                "UPDATE relates_to SET contexts = array::concat(contexts, $contexts) \
                 WHERE in = $source AND out = $target AND rel_type = $rel_type",
            )
            .bind(("contexts", edge.contexts))
            .bind(("source", new_source))
            .bind(("target", new_target))
            .bind(("rel_type", edge.rel_type))
            .await?;
        }
    }

    Ok(())
}

/// Delete a relationship by ID.
pub async fn delete_relationship(
    db: &PlumeDb,
    id: &str,
) -> Result<Option<Relationship>, PlumeError> {
    let result: Option<Relationship> = db.delete(("relates_to", id)).await?;
    Ok(result)
}
