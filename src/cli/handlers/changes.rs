//! `plume changes` - review the proposed-change queue.

use anyhow::Result;

use crate::cli::output::{output_json, print_success, print_table, OutputMode};
use crate::cli::ChangeCommands;
use crate::init::AppContext;
use crate::models::record_key;
use crate::services::queue::ChangeQueueService;

pub async fn handle(ctx: &AppContext, command: &ChangeCommands, mode: OutputMode) -> Result<()> {
    match command {
        ChangeCommands::List { world_id } => {
            let pending = ChangeQueueService::pending_changes(&ctx.db, world_id).await?;
            if mode == OutputMode::Json {
                output_json(&pending);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = pending
                .iter()
                .map(|change| {
                    let target = change
                        .proposed_entry
                        .as_ref()
                        .map(|p| p.title.clone())
                        .or_else(|| change.wiki_entry_id.clone())
                        .unwrap_or_default();
                    vec![
                        record_key(&change.id),
                        format!("{:?}", change.change_type).to_lowercase(),
                        target,
                        format!("{:.2}", change.confidence),
                        change.reason.clone(),
                    ]
                })
                .collect();
            print_table(&["ID", "Kind", "Target", "Confidence", "Reason"], rows);
        }
        ChangeCommands::Approve { change_id, note } => {
            let result =
                ChangeQueueService::approve_change(&ctx.db, change_id, note.clone()).await?;
            match result.created_entry {
                Some(entry) => print_success(&format!("Approved; created entry '{}'", entry.title)),
                None => print_success("Approved"),
            }
        }
        ChangeCommands::Reject { change_id, note } => {
            ChangeQueueService::reject_change(&ctx.db, change_id, note.clone()).await?;
            print_success("Rejected");
        }
        ChangeCommands::AutoApprove {
            world_id,
            threshold,
        } => {
            let outcome =
                ChangeQueueService::auto_approve(&ctx.db, world_id, Some(*threshold)).await?;
            if mode == OutputMode::Json {
                output_json(&outcome);
                return Ok(());
            }
            let approved = outcome.values().filter(|v| *v == "approved").count();
            print_success(&format!(
                "{approved}/{} eligible changes approved",
                outcome.len()
            ));
        }
    }
    Ok(())
}
