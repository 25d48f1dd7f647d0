//! Wiki entries and the proposed-change queue.

mod common;

use std::collections::HashMap;

use common::builders;
use common::harness::TestHarness;

use plume::models::change::{ChangeStatus, ChangeType, ProposedEntry, WikiChangeCreate};
use plume::models::entity::{get_entity, update_entity, EntityUpdate};
use plume::models::record_key;
use plume::models::wiki::find_wiki_entry_by_title;
use plume::models::EntityType;
use plume::services::queue::ChangeQueueService;
use plume::services::wiki::{NewEntry, WikiService};
use plume::PlumeError;

fn create_proposal(world_id: &str, title: &str, confidence: f64) -> WikiChangeCreate {
    WikiChangeCreate {
        world_id: world_id.to_string(),
        change_type: ChangeType::Create,
        wiki_entry_id: None,
        field_changed: None,
        old_value: None,
        new_value: None,
        proposed_entry: Some(ProposedEntry {
            entry_type: "location".to_string(),
            title: title.to_string(),
            summary: "A walled town on the glass road.".to_string(),
            content: String::new(),
            structured_data: HashMap::new(),
            aliases: Vec::new(),
            tags: Vec::new(),
        }),
        reason: "Found in prose".to_string(),
        source_text: "They reached Vask at dusk.".to_string(),
        source_chapter_id: None,
        confidence,
        status: ChangeStatus::Pending,
    }
}

#[tokio::test]
async fn test_wiki_title_collision_is_conflict() {
    let harness = TestHarness::new().await;
    WikiService::create_entry(&harness.db, "w-1", "location", "Vask", NewEntry::default())
        .await
        .expect("create entry");

    let duplicate =
        WikiService::create_entry(&harness.db, "w-1", "location", "VASK", NewEntry::default())
            .await;
    assert!(matches!(duplicate, Err(PlumeError::Conflict(_))));

    // Same title in a different world is fine.
    assert!(
        WikiService::create_entry(&harness.db, "w-2", "location", "Vask", NewEntry::default())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_slug_derived_and_stable_under_case_changes() {
    let harness = TestHarness::new().await;
    let entry = WikiService::create_entry(
        &harness.db,
        "w-1",
        "location",
        "The Glass Desert",
        NewEntry::default(),
    )
    .await
    .expect("create entry");
    assert_eq!(entry.slug, "the-glass-desert");
}

#[tokio::test]
async fn test_entry_type_change_cascades_to_linked_entity() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let entity_id =
        builders::entity(&harness.db, &manuscript, EntityType::Lore, "Emberborn", &[]).await;

    let entry = WikiService::create_entry(
        &harness.db,
        "w-1",
        "lore",
        "Emberborn",
        NewEntry {
            linked_entity_id: Some(entity_id.clone()),
            ..NewEntry::default()
        },
    )
    .await
    .expect("create entry");
    update_entity(
        &harness.db,
        &entity_id,
        EntityUpdate {
            linked_wiki_entry_id: Some(Some(record_key(&entry.id))),
            ..Default::default()
        },
    )
    .await
    .expect("link back");

    WikiService::update_entry(
        &harness.db,
        &record_key(&entry.id),
        plume::models::wiki::WikiEntryUpdate {
            entry_type: Some("culture".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("update entry");

    let entity = get_entity(&harness.db, &entity_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(entity.entity_type, EntityType::Culture);
}

#[tokio::test]
async fn test_delete_entry_clears_backlink_but_keeps_entity() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let entity_id =
        builders::entity(&harness.db, &manuscript, EntityType::Location, "Vask", &[]).await;

    let entry = WikiService::create_entry(&harness.db, "w-1", "location", "Vask", NewEntry::default())
        .await
        .expect("create entry");
    let entry_key = record_key(&entry.id);
    update_entity(
        &harness.db,
        &entity_id,
        EntityUpdate {
            linked_wiki_entry_id: Some(Some(entry_key.clone())),
            ..Default::default()
        },
    )
    .await
    .expect("link");

    assert!(WikiService::delete_entry(&harness.db, &entry_key)
        .await
        .expect("delete"));

    let entity = get_entity(&harness.db, &entity_id)
        .await
        .expect("get")
        .expect("entity survives");
    assert!(entity.linked_wiki_entry_id.is_none());
}

#[tokio::test]
async fn test_merge_entries_union_and_remap() {
    let harness = TestHarness::new().await;
    let source = WikiService::create_entry(
        &harness.db,
        "w-1",
        "location",
        "Vask Town",
        NewEntry {
            summary: "Walled town.".to_string(),
            structured_data: HashMap::from([
                ("founded".to_string(), serde_json::json!("Year 201")),
                ("banner".to_string(), serde_json::json!("grey")),
            ]),
            aliases: vec!["The Walled Town".to_string()],
            ..NewEntry::default()
        },
    )
    .await
    .expect("create source");
    let target = WikiService::create_entry(
        &harness.db,
        "w-1",
        "location",
        "Vask",
        NewEntry {
            structured_data: HashMap::from([("banner".to_string(), serde_json::json!("red"))]),
            ..NewEntry::default()
        },
    )
    .await
    .expect("create target");

    let source_key = record_key(&source.id);
    let target_key = record_key(&target.id);
    let merged = WikiService::merge_entries(&harness.db, &source_key, &target_key, None)
        .await
        .expect("merge");

    // Source title became an alias; aliases unioned.
    assert!(merged.aliases.iter().any(|a| a == "Vask Town"));
    assert!(merged.aliases.iter().any(|a| a == "The Walled Town"));
    // Empty target summary took the source value.
    assert_eq!(merged.summary, "Walled town.");
    // Structured data unioned with the target winning conflicts.
    assert_eq!(merged.structured_data.get("banner"), Some(&serde_json::json!("red")));
    assert_eq!(
        merged.structured_data.get("founded"),
        Some(&serde_json::json!("Year 201"))
    );
    // Source is gone.
    assert!(find_wiki_entry_by_title(&harness.db, "w-1", "Vask Town")
        .await
        .expect("lookup")
        .is_none());
}

#[tokio::test]
async fn test_change_approval_roundtrip_creates_entry() {
    let harness = TestHarness::new().await;
    let change = ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Vask", 0.8))
        .await
        .expect("stage change");
    let change_key = record_key(&change.id);

    let result = ChangeQueueService::approve_change(&harness.db, &change_key, None)
        .await
        .expect("approve");
    let entry = result.created_entry.expect("entry created");
    assert_eq!(entry.title, "Vask");
    assert_eq!(result.change.status, ChangeStatus::Approved);
}

#[tokio::test]
async fn test_terminal_changes_are_idempotent() {
    let harness = TestHarness::new().await;
    let change = ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Vask", 0.8))
        .await
        .expect("stage change");
    let change_key = record_key(&change.id);

    ChangeQueueService::approve_change(&harness.db, &change_key, None)
        .await
        .expect("first approval");

    let again = ChangeQueueService::approve_change(&harness.db, &change_key, None).await;
    match again {
        Err(PlumeError::Conflict(msg)) => assert_eq!(msg, "already processed"),
        other => panic!("expected already-processed conflict, got {other:?}"),
    }
    let reject_after = ChangeQueueService::reject_change(&harness.db, &change_key, None).await;
    assert!(matches!(reject_after, Err(PlumeError::Conflict(_))));
}

#[tokio::test]
async fn test_pending_duplicate_titles_are_suppressed() {
    let harness = TestHarness::new().await;
    let first = ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Vask", 0.8))
        .await
        .expect("first");
    let second =
        ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "VASK", 0.9))
            .await
            .expect("second");
    assert_eq!(record_key(&first.id), record_key(&second.id));
}

#[tokio::test]
async fn test_bulk_outcomes_per_id() {
    let harness = TestHarness::new().await;
    let a = ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Vask", 0.8))
        .await
        .expect("a");
    let b = ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Ashfall", 0.9))
        .await
        .expect("b");
    let a_key = record_key(&a.id);
    let b_key = record_key(&b.id);

    // Pre-reject one so the bulk pass sees a terminal change.
    ChangeQueueService::reject_change(&harness.db, &b_key, None)
        .await
        .expect("reject");

    let outcome = ChangeQueueService::bulk_approve(
        &harness.db,
        &[a_key.clone(), b_key.clone(), "missing-id".to_string()],
        None,
    )
    .await;

    assert_eq!(outcome.get(&a_key).map(|s| s.as_str()), Some("approved"));
    assert_eq!(
        outcome.get(&b_key).map(|s| s.as_str()),
        Some("already processed")
    );
    assert!(outcome.get("missing-id").is_some());
}

#[tokio::test]
async fn test_auto_approve_respects_threshold() {
    let harness = TestHarness::new().await;
    ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Vask", 0.99))
        .await
        .expect("high");
    ChangeQueueService::create_change(&harness.db, create_proposal("w-1", "Ashfall", 0.5))
        .await
        .expect("low");

    let outcome = ChangeQueueService::auto_approve(&harness.db, "w-1", None)
        .await
        .expect("auto approve");
    assert_eq!(outcome.len(), 1);

    // The high-confidence entry landed; the low-confidence one is still
    // pending.
    assert!(find_wiki_entry_by_title(&harness.db, "w-1", "Vask")
        .await
        .expect("lookup")
        .is_some());
    let pending = ChangeQueueService::pending_changes(&harness.db, "w-1")
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn test_codex_wiki_sync_stages_a_create_proposal() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "Book One", Some("w-9")).await;
    let entity_id = builders::entity(
        &harness.db,
        &manuscript,
        EntityType::Character,
        "Mira",
        &["The Glass Widow"],
    )
    .await;

    let entity = get_entity(&harness.db, &entity_id)
        .await
        .expect("get")
        .expect("exists");
    plume::services::codex::sync_entity_to_wiki(&harness.db, &manuscript, &entity)
        .await
        .expect("sync");

    let pending = ChangeQueueService::pending_changes(&harness.db, "w-9")
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
    let proposed = pending[0].proposed_entry.as_ref().expect("proposal");
    assert_eq!(proposed.title, "Mira");
    assert_eq!(proposed.entry_type, "character");
    assert!(proposed.aliases.iter().any(|a| a == "The Glass Widow"));

    // Re-syncing does not stage a duplicate (pending title dedup).
    plume::services::codex::sync_entity_to_wiki(&harness.db, &manuscript, &entity)
        .await
        .expect("second sync");
    let pending = ChangeQueueService::pending_changes(&harness.db, "w-9")
        .await
        .expect("pending");
    assert_eq!(pending.len(), 1);
}
