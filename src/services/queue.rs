//! Proposed-change queue.
//!
//! Every automated wiki mutation is staged as a reviewable `WikiChange` with
//! confidence and provenance. Approval executes the mutation atomically;
//! approving or rejecting is idempotent after the first terminal transition.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::db::connection::PlumeDb;
use crate::models::change::{
    create_change, find_pending_create_by_title, get_change, list_changes, set_change_status,
    ChangeStatus, ChangeType, ProposedEntry, WikiChange, WikiChangeCreate,
};
use crate::models::wiki::{find_wiki_entry_by_title, get_wiki_entry, WikiEntryUpdate};
use crate::models::record_key;
use crate::services::wiki::{NewEntry, WikiService};
use crate::PlumeError;

/// Default confidence floor for the auto-approval batch.
pub const AUTO_APPROVE_THRESHOLD: f64 = 0.95;

/// What a single approval produced.
#[derive(Debug)]
pub struct ApprovalResult {
    pub change: WikiChange,
    /// Present when a `create` change materialized a new entry.
    pub created_entry: Option<crate::models::WikiEntry>,
}

/// Outcome map entry for bulk operations.
pub type BulkOutcome = HashMap<String, String>;

pub struct ChangeQueueService;

impl ChangeQueueService {
    /// Stage a change. For `create` changes, an already-pending proposal for
    /// the same title (case-insensitive) is returned instead of a duplicate.
    pub async fn create_change(
        db: &PlumeDb,
        data: WikiChangeCreate,
    ) -> Result<WikiChange, PlumeError> {
        if !(0.0..=1.0).contains(&data.confidence) {
            return Err(PlumeError::Validation(
                "Change confidence must be within [0, 1]".into(),
            ));
        }
        match data.change_type {
            ChangeType::Create => {
                let Some(proposed) = &data.proposed_entry else {
                    return Err(PlumeError::Validation(
                        "Create changes require a proposed entry".into(),
                    ));
                };
                if let Some(existing) =
                    find_pending_create_by_title(db, &data.world_id, &proposed.title).await?
                {
                    return Ok(existing);
                }
            }
            ChangeType::Update | ChangeType::Delete => {
                if data.wiki_entry_id.is_none() {
                    return Err(PlumeError::Validation(
                        "Update and delete changes require a target entry id".into(),
                    ));
                }
            }
        }

        create_change(db, data).await
    }

    /// Approve a change, executing its mutation. Idempotent after the first
    /// terminal transition: re-approving reports "already processed".
    pub async fn approve_change(
        db: &PlumeDb,
        change_id: &str,
        note: Option<String>,
    ) -> Result<ApprovalResult, PlumeError> {
        let Some(change) = get_change(db, change_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "wiki_change".into(),
                id: change_id.into(),
            });
        };
        if change.status != ChangeStatus::Pending {
            return Err(PlumeError::Conflict("already processed".into()));
        }

        let created_entry = match change.change_type {
            ChangeType::Create => Some(apply_create(db, &change).await?),
            ChangeType::Update => {
                apply_update(db, &change).await?;
                None
            }
            ChangeType::Delete => {
                apply_delete(db, &change).await?;
                None
            }
        };

        let updated = set_change_status(db, change_id, ChangeStatus::Approved, note)
            .await?
            .ok_or_else(|| PlumeError::NotFound {
                entity_type: "wiki_change".into(),
                id: change_id.into(),
            })?;

        info!(change_id, "wiki change approved");
        Ok(ApprovalResult {
            change: updated,
            created_entry,
        })
    }

    /// Reject a change. Idempotent after the first terminal transition.
    pub async fn reject_change(
        db: &PlumeDb,
        change_id: &str,
        note: Option<String>,
    ) -> Result<WikiChange, PlumeError> {
        let Some(change) = get_change(db, change_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "wiki_change".into(),
                id: change_id.into(),
            });
        };
        if change.status != ChangeStatus::Pending {
            return Err(PlumeError::Conflict("already processed".into()));
        }

        set_change_status(db, change_id, ChangeStatus::Rejected, note)
            .await?
            .ok_or_else(|| PlumeError::NotFound {
                entity_type: "wiki_change".into(),
                id: change_id.into(),
            })
    }

    /// Approve many changes; per-id outcome map ("approved", "already
    /// processed", or an error message).
    pub async fn bulk_approve(
        db: &PlumeDb,
        change_ids: &[String],
        note: Option<String>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::new();
        for change_id in change_ids {
            let result = Self::approve_change(db, change_id, note.clone()).await;
            outcome.insert(change_id.clone(), describe(result.map(|_| ()), "approved"));
        }
        outcome
    }

    /// Reject many changes; per-id outcome map.
    pub async fn bulk_reject(
        db: &PlumeDb,
        change_ids: &[String],
        note: Option<String>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::new();
        for change_id in change_ids {
            let result = Self::reject_change(db, change_id, note.clone()).await;
            outcome.insert(change_id.clone(), describe(result.map(|_| ()), "rejected"));
        }
        outcome
    }

    /// Opt-in batch: approve every pending change at or above the confidence
    /// threshold. Returns the per-id outcome map.
    pub async fn auto_approve(
        db: &PlumeDb,
        world_id: &str,
        threshold: Option<f64>,
    ) -> Result<BulkOutcome, PlumeError> {
        let threshold = threshold.unwrap_or(AUTO_APPROVE_THRESHOLD);
        let pending = list_changes(db, world_id, Some(ChangeStatus::Pending)).await?;

        let eligible: Vec<String> = pending
            .iter()
            .filter(|change| change.confidence >= threshold)
            .map(|change| record_key(&change.id))
            .collect();

        info!(
            world_id,
            eligible = eligible.len(),
            threshold,
            "auto-approval batch"
        );
        Ok(Self::bulk_approve(db, &eligible, Some("auto-approved".into())).await)
    }

    pub async fn pending_changes(
        db: &PlumeDb,
        world_id: &str,
    ) -> Result<Vec<WikiChange>, PlumeError> {
        list_changes(db, world_id, Some(ChangeStatus::Pending)).await
    }
}

fn describe(result: Result<(), PlumeError>, success: &str) -> String {
    match result {
        Ok(()) => success.to_string(),
        Err(PlumeError::Conflict(msg)) if msg == "already processed" => msg,
        Err(e) => e.to_string(),
    }
}

async fn apply_create(
    db: &PlumeDb,
    change: &WikiChange,
) -> Result<crate::models::WikiEntry, PlumeError> {
    let proposed: &ProposedEntry = change.proposed_entry.as_ref().ok_or_else(|| {
        PlumeError::Validation("Create change has no proposed entry".into())
    })?;

    if find_wiki_entry_by_title(db, &change.world_id, &proposed.title)
        .await?
        .is_some()
    {
        return Err(PlumeError::Conflict(format!(
            "A wiki entry titled '{}' already exists in this world",
            proposed.title
        )));
    }

    WikiService::create_entry(
        db,
        &change.world_id,
        &proposed.entry_type,
        &proposed.title,
        NewEntry {
            summary: proposed.summary.clone(),
            content: proposed.content.clone(),
            structured_data: proposed.structured_data.clone(),
            aliases: proposed.aliases.clone(),
            tags: proposed.tags.clone(),
            parent_id: None,
            linked_entity_id: None,
            confidence_score: Some(change.confidence),
        },
    )
    .await
}

async fn apply_update(db: &PlumeDb, change: &WikiChange) -> Result<(), PlumeError> {
    let entry_id = change.wiki_entry_id.as_deref().ok_or_else(|| {
        PlumeError::Validation("Update change has no target entry".into())
    })?;
    let Some(existing) = get_wiki_entry(db, entry_id).await? else {
        return Err(PlumeError::NotFound {
            entity_type: "wiki_entry".into(),
            id: entry_id.into(),
        });
    };

    let new_value = change.new_value.clone().ok_or_else(|| {
        PlumeError::Validation("Update change carries no new value".into())
    })?;

    // Either a single named field, or an object applied field-by-field.
    let fields: Vec<(String, serde_json::Value)> = match (&change.field_changed, new_value) {
        (Some(field), value) => vec![(field.clone(), value)],
        (None, serde_json::Value::Object(map)) => map.into_iter().collect(),
        (None, _) => {
            return Err(PlumeError::Validation(
                "Update change needs field_changed or an object new_value".into(),
            ))
        }
    };

    let mut update = WikiEntryUpdate::default();
    let mut structured = existing.structured_data.clone();
    let mut structured_dirty = false;

    for (field, value) in fields {
        match field.as_str() {
            "title" => {
                if let Some(title) = value.as_str() {
                    update.title = Some(title.to_string());
                }
            }
            "summary" => {
                if let Some(summary) = value.as_str() {
                    update.summary = Some(summary.to_string());
                }
            }
            "content" => {
                if let Some(content) = value.as_str() {
                    update.content = Some(content.to_string());
                }
            }
            "entry_type" => {
                if let Some(entry_type) = value.as_str() {
                    update.entry_type = Some(entry_type.to_string());
                }
            }
            "status" => {
                if let Some(status) = value.as_str() {
                    update.status = Some(status.to_string());
                }
            }
            "aliases" => {
                if let Ok(aliases) = serde_json::from_value::<Vec<String>>(value) {
                    update.aliases = Some(aliases);
                }
            }
            "tags" => {
                if let Ok(tags) = serde_json::from_value::<Vec<String>>(value) {
                    update.tags = Some(tags);
                }
            }
            "structured_data" => {
                if let serde_json::Value::Object(map) = value {
                    for (key, inner) in map {
                        structured.insert(key, inner);
                    }
                    structured_dirty = true;
                }
            }
            // Unrecognized fields are preserved but inert.
            other => {
                warn!(field = other, "unrecognized update field routed to structured_data");
                structured.insert(other.to_string(), value);
                structured_dirty = true;
            }
        }
    }
    if structured_dirty {
        update.structured_data = Some(structured);
    }

    WikiService::update_entry(db, entry_id, update).await?;
    Ok(())
}

async fn apply_delete(db: &PlumeDb, change: &WikiChange) -> Result<(), PlumeError> {
    let entry_id = change.wiki_entry_id.as_deref().ok_or_else(|| {
        PlumeError::Validation("Delete change has no target entry".into())
    })?;
    // WikiService clears back-links; linked codex entities are never
    // cascade-deleted.
    if !WikiService::delete_entry(db, entry_id).await? {
        return Err(PlumeError::NotFound {
            entity_type: "wiki_entry".into(),
            id: entry_id.into(),
        });
    }
    Ok(())
}
