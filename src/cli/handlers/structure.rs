//! `plume structures` and `plume outline` handlers.

use anyhow::Result;

use crate::cli::output::{output_json, print_success, print_table, OutputMode};
use crate::cli::OutlineCommands;
use crate::init::AppContext;
use crate::services::outline::OutlineService;
use crate::services::structures::available_structures;

pub fn handle_list(mode: OutputMode) -> Result<()> {
    let structures = available_structures();

    if mode == OutputMode::Json {
        output_json(&structures);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = structures
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.name.to_string(),
                s.beats.len().to_string(),
                format!("{}-{}", s.word_count_range.0, s.word_count_range.1),
                s.recommended_for.join(", "),
            ]
        })
        .collect();
    print_table(&["ID", "Name", "Beats", "Words", "Recommended for"], rows);
    Ok(())
}

pub async fn handle_outline(
    ctx: &AppContext,
    command: &OutlineCommands,
    mode: OutputMode,
) -> Result<()> {
    match command {
        OutlineCommands::Create {
            manuscript,
            structure,
            words,
        } => {
            let (outline, beats) =
                OutlineService::create_from_template(&ctx.db, manuscript, structure, *words)
                    .await?;
            if mode == OutputMode::Json {
                output_json(&outline);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = beats
                .iter()
                .map(|b| {
                    vec![
                        b.order_index.to_string(),
                        b.beat_label.clone(),
                        format!("{:.0}%", b.target_position_percent * 100.0),
                        b.target_word_count.to_string(),
                    ]
                })
                .collect();
            print_table(&["#", "Beat", "Position", "Target words"], rows);
            print_success(&format!(
                "Outline {} created with {} beats",
                crate::models::record_key(&outline.id),
                beats.len()
            ));
        }
        OutlineCommands::Progress { outline_id } => {
            let progress = OutlineService::progress(&ctx.db, outline_id).await?;
            if mode == OutputMode::Json {
                output_json(&progress);
                return Ok(());
            }
            print_success(&format!(
                "{}/{} beats complete ({:.0}%), {} words written",
                progress.completed_beats,
                progress.total_beats,
                progress.completion_percent,
                progress.actual_word_count
            ));
        }
        OutlineCommands::Gaps { outline_id } => {
            let gaps = OutlineService::gap_analysis(&ctx.db, outline_id).await?;
            if mode == OutputMode::Json {
                output_json(&gaps);
                return Ok(());
            }
            let rows: Vec<Vec<String>> = gaps
                .iter()
                .map(|g| vec![g.gap_type.clone(), g.description.clone()])
                .collect();
            print_table(&["Kind", "Description"], rows);
        }
    }
    Ok(())
}
