//! End-to-end background scans through the coordinator.

mod common;

use std::time::Duration;

use common::builders;
use common::harness::TestHarness;

use plume::nlp::noop_nlp;
use plume::services::codex::CodexService;
use plume::services::scan::{ScanCoordinator, ScanRegistry, ScanStatus, StartOutcome};
use plume::services::timeline::TimelineService;

const CHAPTER_TEXT: &str = "Farid Sa Garai Fol Jahan came to town. Garai Fol Jahan smiled. \
     In this world, iron burns the fae. The wagons arrived in Vask at dusk.";

async fn wait_for_terminal(
    registry: &ScanRegistry,
    task_id: &str,
) -> plume::services::scan::ScanTask {
    for _ in 0..200 {
        if let Some(task) = registry.get(task_id).await {
            if task.status != ScanStatus::Running {
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("scan did not reach a terminal state");
}

#[tokio::test]
async fn test_world_scan_runs_and_second_start_attaches() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "Book One", Some("w-1")).await;
    builders::chapter(&harness.db, &manuscript, "Chapter 1", CHAPTER_TEXT).await;

    let registry = ScanRegistry::new();
    let coordinator = ScanCoordinator::new(harness.db.clone(), registry.clone(), noop_nlp());

    let first = coordinator.start_world_scan("w-1").await.expect("start");
    let StartOutcome::Started { task_id } = &first else {
        panic!("expected a new task");
    };

    // A second immediate start returns the same task id as already running,
    // unless the first scan has already finished.
    let second = coordinator.start_world_scan("w-1").await.expect("restart");
    match second {
        StartOutcome::AlreadyRunning { task_id: second_id } => assert_eq!(&second_id, task_id),
        StartOutcome::Started { .. } => {
            let done = registry.get(task_id).await.expect("first task");
            assert_ne!(done.status, ScanStatus::Running);
        }
    }

    let task = wait_for_terminal(&registry, task_id).await;
    assert_eq!(task.status, ScanStatus::Completed);
    assert!((task.progress_percent - 100.0).abs() < 1e-9);
    assert!(task.error.is_none());

    // The extractor staged suggestions for the new names.
    let suggestions = CodexService::pending_suggestions(&harness.db, &manuscript)
        .await
        .expect("suggestions");
    assert!(suggestions
        .iter()
        .any(|s| s.name == "Farid Sa Garai Fol Jahan"));
    // Partial name was filtered before suggestion staging.
    assert!(!suggestions.iter().any(|s| s.name == "Garai Fol Jahan"));

    // Timeline stage covered the chapter with an auto event.
    let events = TimelineService::get_events(&harness.db, &manuscript)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].metadata.get("auto_generated"),
        Some(&serde_json::json!(true))
    );
}

#[tokio::test]
async fn test_scan_is_idempotent_on_rerun() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "Book One", Some("w-2")).await;
    builders::chapter(&harness.db, &manuscript, "Chapter 1", CHAPTER_TEXT).await;

    let registry = ScanRegistry::new();
    let coordinator = ScanCoordinator::new(harness.db.clone(), registry.clone(), noop_nlp());

    let first = coordinator.start_world_scan("w-2").await.expect("start");
    wait_for_terminal(&registry, first.task_id()).await;
    let after_first = CodexService::pending_suggestions(&harness.db, &manuscript)
        .await
        .expect("suggestions")
        .len();

    let second = coordinator.start_world_scan("w-2").await.expect("restart");
    wait_for_terminal(&registry, second.task_id()).await;
    let after_second = CodexService::pending_suggestions(&harness.db, &manuscript)
        .await
        .expect("suggestions")
        .len();

    // Dedup against pending suggestions keeps the rerun from duplicating.
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_manuscript_scan_without_world() {
    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "Standalone", None).await;
    builders::chapter(&harness.db, &manuscript, "Chapter 1", CHAPTER_TEXT).await;

    let registry = ScanRegistry::new();
    let coordinator = ScanCoordinator::new(harness.db.clone(), registry.clone(), noop_nlp());

    let outcome = coordinator
        .start_manuscript_scan(&manuscript)
        .await
        .expect("start");
    let task = wait_for_terminal(&registry, outcome.task_id()).await;
    assert_eq!(task.status, ScanStatus::Completed);
    assert_eq!(task.total_manuscripts, 1);
}

#[tokio::test]
async fn test_attached_reporter_receives_stage_ticks() {
    use async_trait::async_trait;
    use plume::services::progress::{ScanProgress, ScanProgressReporter};
    use std::sync::Mutex;

    struct Recording {
        ticks: Mutex<Vec<ScanProgress>>,
    }

    #[async_trait]
    impl ScanProgressReporter for Recording {
        async fn progress(&self, update: ScanProgress) {
            self.ticks.lock().expect("lock").push(update);
        }
    }

    let harness = TestHarness::new().await;
    let manuscript = builders::manuscript(&harness.db, "Book One", Some("w-3")).await;
    builders::chapter(&harness.db, &manuscript, "Chapter 1", CHAPTER_TEXT).await;

    let registry = ScanRegistry::new();
    let reporter = std::sync::Arc::new(Recording {
        ticks: Mutex::new(Vec::new()),
    });
    let coordinator = ScanCoordinator::new(harness.db.clone(), registry.clone(), noop_nlp())
        .with_reporter(reporter.clone());

    let outcome = coordinator.start_world_scan("w-3").await.expect("start");
    wait_for_terminal(&registry, outcome.task_id()).await;

    let ticks = reporter.ticks.lock().expect("lock");
    // One tick per stage plus the terminal tick.
    assert_eq!(ticks.len(), plume::services::scan::STAGES.len() + 1);
    assert_eq!(ticks[0].stage, "entities");
    assert!((ticks.last().unwrap().percent - 100.0).abs() < 1e-9);
    for pair in ticks.windows(2) {
        assert!(pair[0].percent <= pair[1].percent);
    }
}
