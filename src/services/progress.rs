//! Scan progress reporting.
//!
//! The registry remains the source of truth for reconnection; a
//! [`ScanProgressReporter`] is the push channel for surfaces that want live
//! updates without polling (a CLI bar, a log stream). The coordinator calls
//! it alongside every registry write, with the same per-stage percent
//! formula the registry records.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

/// One progress tick of a running scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// 0.0-100.0, monotonic within a scan.
    pub percent: f64,
    pub manuscript_index: usize,
    pub total_manuscripts: usize,
    pub manuscript_title: String,
    /// Stage name from the scan stage list, or "done" on the final tick.
    pub stage: String,
}

impl ScanProgress {
    /// Compute the tick for stage `stage_index` of `stage_count` within
    /// manuscript `manuscript_index` of `total_manuscripts`:
    /// `(manuscript_index + stage_index/stage_count) / total × 100`.
    pub fn at_stage(
        manuscript_index: usize,
        total_manuscripts: usize,
        stage_index: usize,
        stage_count: usize,
        manuscript_title: &str,
        stage: &str,
    ) -> Self {
        let total = total_manuscripts.max(1) as f64;
        let stage_fraction = stage_index as f64 / stage_count.max(1) as f64;
        Self {
            percent: (100.0 * (manuscript_index as f64 + stage_fraction) / total).min(100.0),
            manuscript_index,
            total_manuscripts,
            manuscript_title: manuscript_title.to_string(),
            stage: stage.to_string(),
        }
    }

    /// The terminal 100% tick.
    pub fn finished(total_manuscripts: usize) -> Self {
        Self {
            percent: 100.0,
            manuscript_index: total_manuscripts,
            total_manuscripts,
            manuscript_title: String::new(),
            stage: "done".to_string(),
        }
    }
}

/// Receives scan progress ticks. Implementations are fire-and-forget and
/// must never fail the scan.
#[async_trait]
pub trait ScanProgressReporter: Send + Sync {
    async fn progress(&self, update: ScanProgress);
}

/// No-op reporter for callers that only read the registry.
pub struct NoopProgressReporter;

#[async_trait]
impl ScanProgressReporter for NoopProgressReporter {
    async fn progress(&self, _update: ScanProgress) {}
}

/// Reporter that narrates stage transitions into the log stream.
pub struct LogProgressReporter;

#[async_trait]
impl ScanProgressReporter for LogProgressReporter {
    async fn progress(&self, update: ScanProgress) {
        info!(
            percent = update.percent,
            manuscript = %update.manuscript_title,
            stage = %update.stage,
            "scan progress"
        );
    }
}

/// Shorthand for creating a no-op reporter.
pub fn noop_progress() -> Arc<dyn ScanProgressReporter> {
    Arc::new(NoopProgressReporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Test reporter that records every tick.
    pub struct RecordingReporter {
        pub ticks: Mutex<Vec<ScanProgress>>,
    }

    impl RecordingReporter {
        pub fn new() -> Self {
            Self {
                ticks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ScanProgressReporter for RecordingReporter {
        async fn progress(&self, update: ScanProgress) {
            self.ticks.lock().expect("lock").push(update);
        }
    }

    #[test]
    fn test_stage_formula() {
        // Stage 2 of 5 in manuscript 0 of 2: (0 + 2/5) / 2 * 100 = 20.
        let tick = ScanProgress::at_stage(0, 2, 2, 5, "Book One", "descriptions");
        assert!((tick.percent - 20.0).abs() < 1e-9);
        assert_eq!(tick.stage, "descriptions");

        // Stage 3 of 5 in manuscript 1 of 2: (1 + 3/5) / 2 * 100 = 80.
        let tick = ScanProgress::at_stage(1, 2, 3, 5, "Book Two", "world_rules");
        assert!((tick.percent - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_formula_guards_zero_totals() {
        let tick = ScanProgress::at_stage(0, 0, 0, 0, "Book", "entities");
        assert!((0.0..=100.0).contains(&tick.percent));
    }

    #[test]
    fn test_finished_tick() {
        let tick = ScanProgress::finished(3);
        assert!((tick.percent - 100.0).abs() < 1e-9);
        assert_eq!(tick.stage, "done");
        assert_eq!(tick.manuscript_index, 3);
    }

    #[tokio::test]
    async fn test_noop_reporter_accepts_ticks() {
        let reporter = NoopProgressReporter;
        reporter
            .progress(ScanProgress::at_stage(0, 1, 0, 5, "Book", "entities"))
            .await;
    }

    #[tokio::test]
    async fn test_recording_reporter_collects_in_order() {
        let reporter = RecordingReporter::new();
        reporter
            .progress(ScanProgress::at_stage(0, 1, 0, 5, "Book", "entities"))
            .await;
        reporter.progress(ScanProgress::finished(1)).await;
        let ticks = reporter.ticks.lock().expect("lock");
        assert_eq!(ticks.len(), 2);
        assert!(ticks[0].percent < ticks[1].percent);
    }
}
