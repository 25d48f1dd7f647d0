//! `plume scan` - start and watch background manuscript scans.

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::{output_json, print_success, OutputMode};
use crate::cli::ScanCommands;
use crate::init::AppContext;
use crate::services::scan::{ScanStatus, StartOutcome};

pub async fn handle(ctx: &AppContext, command: &ScanCommands, mode: OutputMode) -> Result<()> {
    match command {
        ScanCommands::World { world_id } => {
            let coordinator = ctx.scan_coordinator();
            let outcome = coordinator.start_world_scan(world_id).await?;
            watch(ctx, outcome, mode).await
        }
        ScanCommands::Manuscript { manuscript_id } => {
            let coordinator = ctx.scan_coordinator();
            let outcome = coordinator.start_manuscript_scan(manuscript_id).await?;
            watch(ctx, outcome, mode).await
        }
        ScanCommands::Status { world_id } => {
            let info = ctx.scan_registry.active_for_world(world_id).await;
            if mode == OutputMode::Json {
                output_json(&info);
                return Ok(());
            }
            if info.active {
                print_success(&format!(
                    "Scan {} running: {:.0}% ({} / {})",
                    info.task_id.unwrap_or_default(),
                    info.progress_percent.unwrap_or(0.0),
                    info.current_manuscript_title.unwrap_or_default(),
                    info.current_stage.unwrap_or_default(),
                ));
            } else {
                println!("No active scan for world {world_id}");
            }
            Ok(())
        }
    }
}

/// Follow a scan to completion with a progress bar.
async fn watch(ctx: &AppContext, outcome: StartOutcome, mode: OutputMode) -> Result<()> {
    let task_id = outcome.task_id().to_string();
    if let StartOutcome::AlreadyRunning { .. } = outcome {
        println!("A scan is already running for this world; attaching to {task_id}");
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    loop {
        let Some(task) = ctx.scan_registry.get(&task_id).await else {
            anyhow::bail!("Scan task {task_id} disappeared from the registry");
        };

        bar.set_position(task.progress_percent.round() as u64);
        bar.set_message(format!(
            "{} / {}",
            task.current_manuscript_title, task.current_stage
        ));

        match task.status {
            ScanStatus::Running => tokio::time::sleep(Duration::from_millis(250)).await,
            ScanStatus::Completed => {
                bar.finish_with_message("done");
                if mode == OutputMode::Json {
                    output_json(&task);
                } else {
                    print_success(&format!(
                        "Scan complete: {} proposed changes across {} manuscripts",
                        task.total_changes, task.total_manuscripts
                    ));
                }
                return Ok(());
            }
            ScanStatus::Failed => {
                bar.abandon_with_message("failed");
                anyhow::bail!(
                    "Scan failed: {}",
                    task.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
    }
}
