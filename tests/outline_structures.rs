//! Outline lifecycle, beat/chapter linkage, and structure migration.

mod common;

use std::collections::HashMap;

use common::builders;
use common::harness::TestHarness;

use plume::models::outline::{get_outline, list_beats, update_beat, PlotBeatUpdate};
use plume::models::record_key;
use plume::services::outline::{OutlineService, SwitchOutcome};
use plume::PlumeError;

#[tokio::test]
async fn test_single_active_outline_invariant() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    let (first, _) =
        OutlineService::create_from_template(&harness.db, &manuscript, "story-arc-9", 80_000)
            .await
            .expect("first outline");
    let (second, _) =
        OutlineService::create_from_template(&harness.db, &manuscript, "3-act", 90_000)
            .await
            .expect("second outline");

    let first_after = get_outline(&harness.db, &record_key(&first.id))
        .await
        .expect("get")
        .expect("exists");
    assert!(!first_after.is_active);
    assert!(second.is_active);
}

#[tokio::test]
async fn test_beats_materialized_with_word_targets() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;

    let (outline, beats) =
        OutlineService::create_from_template(&harness.db, &manuscript, "story-arc-9", 80_000)
            .await
            .expect("outline");
    assert_eq!(beats.len(), 9);

    let stored = list_beats(&harness.db, &record_key(&outline.id))
        .await
        .expect("list beats");
    assert_eq!(stored.len(), 9);
    // order_index strictly increasing, midpoint target = 0.5 * 80k.
    for (i, beat) in stored.iter().enumerate() {
        assert_eq!(beat.order_index, i as i64);
    }
    let midpoint = stored.iter().find(|b| b.beat_name == "midpoint").unwrap();
    assert_eq!(midpoint.target_word_count, 40_000);
}

#[tokio::test]
async fn test_unknown_structure_is_validation_error() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let result =
        OutlineService::create_from_template(&harness.db, &manuscript, "seven-point", 80_000)
            .await;
    assert!(matches!(result, Err(PlumeError::Validation(_))));
}

#[tokio::test]
async fn test_chapter_save_syncs_beat_and_completes_once() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let chapter = builders::chapter(&harness.db, &manuscript, "Ch 1", "Words.").await;

    let (outline, beats) =
        OutlineService::create_from_template(&harness.db, &manuscript, "story-arc-9", 10_000)
            .await
            .expect("outline");
    let _ = outline;
    // hook has target 0; bind the inciting-event beat (target 1200).
    let beat = beats.iter().find(|b| b.beat_name == "inciting-event").unwrap();
    let beat_key = record_key(&beat.id);
    update_beat(
        &harness.db,
        &beat_key,
        PlotBeatUpdate {
            chapter_id: Some(Some(chapter.clone())),
            ..Default::default()
        },
    )
    .await
    .expect("bind chapter");

    // Below target: synced but not complete.
    let synced = OutlineService::sync_chapter_word_count(&harness.db, &chapter, 600)
        .await
        .expect("sync")
        .expect("beat updated");
    assert_eq!(synced.actual_word_count, 600);
    assert!(!synced.is_completed);

    // At target: completed, stamp set.
    let completed = OutlineService::sync_chapter_word_count(&harness.db, &chapter, 1300)
        .await
        .expect("sync")
        .expect("beat updated");
    assert!(completed.is_completed);
    let stamp = completed.completed_at.clone().expect("completed_at set");

    // Further saves keep the original stamp.
    let again = OutlineService::sync_chapter_word_count(&harness.db, &chapter, 1400)
        .await
        .expect("sync")
        .expect("beat updated");
    assert!(again.is_completed);
    assert_eq!(again.completed_at, Some(stamp));
}

#[tokio::test]
async fn test_switch_structure_without_mappings_suggests() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let (outline, _) =
        OutlineService::create_from_template(&harness.db, &manuscript, "story-arc-9", 80_000)
            .await
            .expect("outline");

    let outcome = OutlineService::switch_structure(
        &harness.db,
        &record_key(&outline.id),
        "3-act",
        None,
    )
    .await
    .expect("suggest");

    let SwitchOutcome::Suggestions(suggestions) = outcome else {
        panic!("expected suggestions");
    };
    assert_eq!(suggestions.len(), 9);
    let midpoint = suggestions
        .iter()
        .find(|s| s.old_beat_name == "midpoint")
        .expect("midpoint suggestion");
    assert_eq!(midpoint.suggested_beat_name, "midpoint");
    assert_eq!(midpoint.confidence, 100);
}

#[tokio::test]
async fn test_structure_migration_preserves_mapped_fields() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let (outline, beats) =
        OutlineService::create_from_template(&harness.db, &manuscript, "story-arc-9", 80_000)
            .await
            .expect("outline");
    let outline_key = record_key(&outline.id);

    let midpoint = beats.iter().find(|b| b.beat_name == "midpoint").unwrap();
    let climax = beats.iter().find(|b| b.beat_name == "climax").unwrap();
    update_beat(
        &harness.db,
        &record_key(&midpoint.id),
        PlotBeatUpdate {
            user_notes: Some("Truth revealed".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("set notes");
    update_beat(
        &harness.db,
        &record_key(&climax.id),
        PlotBeatUpdate {
            chapter_id: Some(Some("ch-7".to_string())),
            ..Default::default()
        },
    )
    .await
    .expect("link chapter");

    let mappings = HashMap::from([
        (record_key(&midpoint.id), "midpoint".to_string()),
        (record_key(&climax.id), "climax".to_string()),
    ]);
    let outcome =
        OutlineService::switch_structure(&harness.db, &outline_key, "3-act", Some(mappings))
            .await
            .expect("migrate");
    let SwitchOutcome::Migrated(new_outline) = outcome else {
        panic!("expected migration");
    };
    assert!(new_outline.is_active);
    assert_eq!(new_outline.structure_id, "3-act");

    let new_beats = list_beats(&harness.db, &record_key(&new_outline.id))
        .await
        .expect("beats");
    let new_midpoint = new_beats.iter().find(|b| b.beat_name == "midpoint").unwrap();
    assert_eq!(new_midpoint.user_notes, "Truth revealed");
    let new_climax = new_beats.iter().find(|b| b.beat_name == "climax").unwrap();
    assert_eq!(new_climax.chapter_id.as_deref(), Some("ch-7"));

    let old = get_outline(&harness.db, &outline_key)
        .await
        .expect("get")
        .expect("exists");
    assert!(!old.is_active);
}

#[tokio::test]
async fn test_progress_counts() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "The Glass Road", None).await;
    let (outline, beats) =
        OutlineService::create_from_template(&harness.db, &manuscript, "3-act", 90_000)
            .await
            .expect("outline");
    let outline_key = record_key(&outline.id);

    update_beat(
        &harness.db,
        &record_key(&beats[1].id),
        PlotBeatUpdate {
            is_completed: Some(true),
            actual_word_count: Some(9_000),
            ..Default::default()
        },
    )
    .await
    .expect("complete one");

    let progress = OutlineService::progress(&harness.db, &outline_key)
        .await
        .expect("progress");
    assert_eq!(progress.total_beats, 9);
    assert_eq!(progress.completed_beats, 1);
    assert_eq!(progress.actual_word_count, 9_000);
    assert!((progress.completion_percent - 100.0 / 9.0).abs() < 1e-9);
}
