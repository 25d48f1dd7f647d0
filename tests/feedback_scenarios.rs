//! End-to-end feedback scenarios over the analyzer pipeline.

use plume::services::feedback::{analyze, AnalysisMode, FeedbackSettings};
use plume::services::Severity;

/// A 20-line chapter: 15 said, 1 whispered, 4 exclaimed.
fn said_ism_chapter() -> String {
    let mut text = String::new();
    for i in 0..15 {
        text.push_str(&format!("\"The ledger line {i} is wrong,\" Mira said. "));
    }
    text.push_str("\"Keep your voice down about it,\" Brann whispered. ");
    for i in 0..4 {
        text.push_str(&format!("\"Entry {i} is a forgery!\" Brann exclaimed. "));
    }
    text
}

#[test]
fn test_said_ism_chapter_warns_on_fancy_tags() {
    let response = analyze(
        &said_ism_chapter(),
        &FeedbackSettings::verbose(),
        AnalysisMode::Chapter,
    );

    let warning = response
        .issues
        .iter()
        .find(|issue| {
            issue.issue_type == "dialogue"
                && issue.severity == Severity::Warning
                && issue.message.contains("Fancy dialogue tags")
        })
        .expect("fancy tag warning");

    // 15 + 1 + 4 attributions, 4 fancy: 20%.
    assert!(warning.message.contains("20%"));
}

#[test]
fn test_impossible_tag_scenario() {
    let text = r#""Great," she smiled. "We leave at dawn," Brann said. "Fine by me," Mira said."#;
    let response = analyze(text, &FeedbackSettings::verbose(), AnalysisMode::Chapter);

    let impossible: Vec<_> = response
        .issues
        .iter()
        .filter(|issue| {
            issue.issue_type == "dialogue" && issue.message.contains("Impossible dialogue tag")
        })
        .collect();
    assert_eq!(impossible.len(), 1);
    assert_eq!(impossible[0].severity, Severity::Warning);
    assert_eq!(impossible[0].original_text, "smiled");
    assert!(impossible[0].suggestions[0].contains("said, smiling"));
}

#[test]
fn test_realtime_mode_is_mechanics_only() {
    let text = "Her heart pounded as she crossed the the bridge toward the keep.";
    let response = analyze(text, &FeedbackSettings::verbose(), AnalysisMode::Realtime);

    assert!(response.issues.iter().all(|i| i.issue_type == "grammar"));
    assert!(response
        .issues
        .iter()
        .any(|i| i.message.contains("Doubled word")));
}

#[test]
fn test_chapter_mode_produces_position_sorted_issue_stream() {
    let response = analyze(
        &said_ism_chapter(),
        &FeedbackSettings::verbose(),
        AnalysisMode::Chapter,
    );

    assert!(!response.issues.is_empty());
    let offsets: Vec<usize> = response.issues.iter().map(|i| i.start_offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);

    let counted: usize = response.stats.values().sum();
    assert_eq!(counted, response.issues.len());
}

#[test]
fn test_analyzer_toggles_respected() {
    let mut settings = FeedbackSettings::verbose();
    settings.dialogue = false;
    let response = analyze(&said_ism_chapter(), &settings, AnalysisMode::Chapter);
    assert!(response.issues.iter().all(|i| i.issue_type != "dialogue"));
}

#[test]
fn test_consistency_pass_runs_with_context() {
    use std::collections::HashMap;

    let mira = plume::models::Entity {
        id: surrealdb::RecordId::from_table_key("entity", "e1"),
        manuscript_id: "m-1".to_string(),
        entity_type: plume::models::EntityType::Character,
        name: "Mira".to_string(),
        name_lower: "mira".to_string(),
        aliases: Vec::new(),
        attributes: HashMap::from([("eye_color".to_string(), serde_json::json!("green"))]),
        template_data: HashMap::new(),
        appearance_history: Vec::new(),
        linked_wiki_entry_id: None,
        scope: Default::default(),
        created_at: surrealdb::Datetime::from(chrono::Utc::now()),
        updated_at: surrealdb::Datetime::from(chrono::Utc::now()),
    };

    let mut settings = FeedbackSettings::verbose();
    settings.consistency = true;
    let text = "Mira looked up from the ledger, and her brown eyes caught the lamplight \
                while the common room emptied around her.";
    let response = plume::services::feedback::analyze_with_context(
        text,
        &settings,
        AnalysisMode::Chapter,
        std::slice::from_ref(&mira),
        &[],
    );

    assert!(response
        .issues
        .iter()
        .any(|i| i.issue_type == "consistency" && i.severity == Severity::Warning));
}
