//! Timeline ordering and inconsistency detection against the store.

mod common;

use std::collections::HashMap;

use common::builders;
use common::harness::TestHarness;

use plume::models::record_key;
use plume::models::timeline::{EventType, InconsistencySeverity, InconsistencyType};
use plume::services::timeline::{NewEvent, TimelineService};

fn event(description: &str) -> NewEvent {
    NewEvent {
        description: description.to_string(),
        event_type: EventType::Scene,
        ..NewEvent::default()
    }
}

#[tokio::test]
async fn test_order_index_defaults_to_tail_and_stays_increasing() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    for i in 0..4 {
        TimelineService::create_event(&harness.db, &manuscript, event(&format!("Event {i}")))
            .await
            .expect("create event");
    }

    let events = TimelineService::get_events(&harness.db, &manuscript)
        .await
        .expect("list events");
    assert_eq!(events.len(), 4);
    for pair in events.windows(2) {
        assert!(pair[0].order_index < pair[1].order_index);
    }
    assert_eq!(events.last().unwrap().order_index, 3);
}

#[tokio::test]
async fn test_reorder_rewrites_positions() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    let mut keys = Vec::new();
    for i in 0..3 {
        let created =
            TimelineService::create_event(&harness.db, &manuscript, event(&format!("Event {i}")))
                .await
                .expect("create event");
        keys.push(record_key(&created.id));
    }

    let reversed: Vec<String> = keys.iter().rev().cloned().collect();
    TimelineService::reorder_events(&harness.db, &reversed)
        .await
        .expect("reorder");

    let events = TimelineService::get_events(&harness.db, &manuscript)
        .await
        .expect("list");
    let ordered: Vec<String> = events.iter().map(|e| record_key(&e.id)).collect();
    assert_eq!(ordered, reversed);
}

#[tokio::test]
async fn test_missing_transition_scenario() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    let mut first = event("Mira and Brann argue in the mill");
    first.location_id = Some("loc-mill".to_string());
    first.character_ids = vec!["c-mira".to_string(), "c-brann".to_string()];
    let first = TimelineService::create_event(&harness.db, &manuscript, first)
        .await
        .expect("first event");

    let mut second = event("Mira and Brann wake in the keep");
    second.location_id = Some("loc-keep".to_string());
    second.character_ids = vec!["c-mira".to_string(), "c-brann".to_string()];
    let second = TimelineService::create_event(&harness.db, &manuscript, second)
        .await
        .expect("second event");

    let findings = TimelineService::detect_inconsistencies(&harness.db, &manuscript)
        .await
        .expect("detect");

    let transition: Vec<_> = findings
        .iter()
        .filter(|f| f.inconsistency_type == InconsistencyType::MissingTransition)
        .collect();
    assert_eq!(transition.len(), 1);
    assert_eq!(transition[0].severity, InconsistencySeverity::Medium);
    assert_eq!(
        transition[0].affected_event_ids,
        vec![record_key(&first.id), record_key(&second.id)]
    );
}

#[tokio::test]
async fn test_detection_is_rebuilt_and_resolution_deletes() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    let mut first = event("At the mill");
    first.location_id = Some("loc-mill".to_string());
    first.character_ids = vec!["c-mira".to_string()];
    TimelineService::create_event(&harness.db, &manuscript, first)
        .await
        .expect("first");
    let mut second = event("At the keep");
    second.location_id = Some("loc-keep".to_string());
    second.character_ids = vec!["c-mira".to_string()];
    TimelineService::create_event(&harness.db, &manuscript, second)
        .await
        .expect("second");

    let first_run = TimelineService::detect_inconsistencies(&harness.db, &manuscript)
        .await
        .expect("detect");
    assert_eq!(first_run.len(), 1);

    // Re-running rebuilds rather than accumulating.
    let second_run = TimelineService::detect_inconsistencies(&harness.db, &manuscript)
        .await
        .expect("detect again");
    assert_eq!(second_run.len(), 1);

    let key = record_key(&second_run[0].id);
    assert!(TimelineService::resolve_inconsistency(&harness.db, &key)
        .await
        .expect("resolve"));
    let remaining = TimelineService::get_inconsistencies(&harness.db, &manuscript, None)
        .await
        .expect("list");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_resurrection_detected_across_events() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    let mut death = event("Brann falls at the ford");
    death.metadata = HashMap::from([(
        "character_deaths".to_string(),
        serde_json::json!(["c-brann"]),
    )]);
    TimelineService::create_event(&harness.db, &manuscript, death)
        .await
        .expect("death event");

    let mut later = event("Brann speaks at the council");
    later.character_ids = vec!["c-brann".to_string()];
    TimelineService::create_event(&harness.db, &manuscript, later)
        .await
        .expect("later event");

    let findings = TimelineService::detect_inconsistencies(&harness.db, &manuscript)
        .await
        .expect("detect");
    assert!(findings
        .iter()
        .any(|f| f.inconsistency_type == InconsistencyType::CharacterResurrection
            && f.severity == InconsistencySeverity::High));
}
