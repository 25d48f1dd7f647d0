//! `plume analyze` - run the writing analyzers over a text file.

use std::path::Path;

use anyhow::Result;

use crate::cli::output::{output_json, print_success, print_table, severity_tag, OutputMode};
use crate::init::AppContext;
use crate::services::feedback::{analyze, AnalysisMode, FeedbackSettings};

pub async fn handle(
    _ctx: &AppContext,
    file: &Path,
    mode_arg: &str,
    genre: &str,
    verbose: bool,
    mode: OutputMode,
) -> Result<()> {
    let text = std::fs::read_to_string(file)?;

    let analysis_mode = match mode_arg {
        "realtime" => AnalysisMode::Realtime,
        "paragraph" => AnalysisMode::Paragraph,
        "chapter" => AnalysisMode::Chapter,
        other => anyhow::bail!("Unknown mode '{other}'. Use realtime, paragraph, or chapter."),
    };

    let settings = FeedbackSettings {
        genre: genre.to_string(),
        show_info_level: verbose,
        ..FeedbackSettings::default()
    };

    let response = analyze(&text, &settings, analysis_mode);

    if mode == OutputMode::Json {
        output_json(&response);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = response
        .issues
        .iter()
        .map(|issue| {
            vec![
                severity_tag(issue.severity),
                issue.issue_type.clone(),
                issue.start_offset.to_string(),
                issue.message.clone(),
            ]
        })
        .collect();
    print_table(&["Severity", "Type", "Offset", "Message"], rows);

    let mut counts: Vec<(&String, &usize)> = response.stats.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let summary = counts
        .iter()
        .map(|(issue_type, count)| format!("{issue_type}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    print_success(&format!(
        "{} issues in {} chars ({} ms){}",
        response.issues.len(),
        response.text_length,
        response.analysis_time_ms,
        if summary.is_empty() {
            String::new()
        } else {
            format!(" — {summary}")
        }
    ));

    Ok(())
}
