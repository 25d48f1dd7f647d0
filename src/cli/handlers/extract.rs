//! `plume extract` - run the extraction pipeline over a text file.

use std::path::Path;

use anyhow::Result;

use crate::cli::output::{output_json, print_success, print_table, OutputMode};
use crate::init::AppContext;
use crate::models::entity::list_entities;
use crate::services::extractor::{EntityExtractor, KnownEntity};

pub async fn handle(
    ctx: &AppContext,
    file: &Path,
    manuscript_id: Option<&str>,
    mode: OutputMode,
) -> Result<()> {
    let text = std::fs::read_to_string(file)?;

    let known: Vec<KnownEntity> = match manuscript_id {
        Some(id) => list_entities(&ctx.db, id)
            .await?
            .iter()
            .map(|e| KnownEntity {
                id: Some(crate::models::record_key(&e.id)),
                name: e.name.clone(),
                aliases: e.aliases.clone(),
            })
            .collect(),
        None => Vec::new(),
    };

    let extractor = EntityExtractor::new(ctx.nlp.clone());
    let result = extractor.extract(&text, &known).await;

    if mode == OutputMode::Json {
        output_json(&result);
        return Ok(());
    }

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }

    let candidate_rows: Vec<Vec<String>> = result
        .candidates
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.entity_type.as_str().to_string(),
                format!("{:.2}", c.confidence),
                c.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["Name", "Type", "Confidence", "Description"], candidate_rows);

    if !result.relationships.is_empty() {
        let rel_rows: Vec<Vec<String>> = result
            .relationships
            .iter()
            .map(|r| {
                vec![
                    r.source_name.clone(),
                    r.rel_type.as_str().to_string(),
                    r.target_name.clone(),
                ]
            })
            .collect();
        print_table(&["Source", "Relationship", "Target"], rel_rows);
    }

    if !result.rules.is_empty() {
        let rule_rows: Vec<Vec<String>> = result
            .rules
            .iter()
            .map(|r| vec![r.rule_kind.clone(), r.rule_text.clone()])
            .collect();
        print_table(&["Rule kind", "Statement"], rule_rows);
    }

    print_success(&format!(
        "{} candidates, {} relationships, {} rules{}",
        result.candidates.len(),
        result.relationships.len(),
        result.rules.len(),
        if result.dependency_pass_disabled {
            " (dependency pass disabled)"
        } else {
            ""
        }
    ));

    Ok(())
}
