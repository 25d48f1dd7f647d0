//! Outline lifecycle: creation from templates, beat/chapter linkage,
//! structure migration with mapping preservation, gap analysis, and
//! progress reporting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use surrealdb::Datetime;
use tracing::info;

use crate::db::connection::PlumeDb;
use crate::models::outline::{
    create_beat, create_outline, deactivate_outlines, find_beat_for_chapter, get_outline,
    list_beats, update_beat, Outline, OutlineCreate, PlotBeat, PlotBeatCreate, PlotBeatUpdate,
};
use crate::models::record_key;
use crate::services::structures::{get_structure, BeatTemplate};
use crate::PlumeError;

const SCORE_NAME_EXACT: f64 = 100.0;
const SCORE_NAME_SUBSTRING: f64 = 50.0;
const SCORE_POSITION_WEIGHT: f64 = 30.0;
const POSITION_GAP_THRESHOLD: f64 = 0.08;

/// Suggested mapping from one old beat onto the new structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub old_beat_id: String,
    pub old_beat_name: String,
    pub old_beat_label: String,
    pub suggested_beat_name: String,
    pub suggested_beat_label: String,
    /// 0-100; the score bound means positional contribution is discarded
    /// on exact name matches, which is intentional.
    pub confidence: i64,
}

/// Result of `switch_structure`: either suggestions to review, or the
/// migrated outline.
#[derive(Debug)]
pub enum SwitchOutcome {
    Suggestions(Vec<MappingSuggestion>),
    Migrated(Outline),
}

/// Progress summary for an outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineProgress {
    pub total_beats: usize,
    pub completed_beats: usize,
    pub completion_percent: f64,
    pub actual_word_count: i64,
}

/// A structural gap worth the author's attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineGap {
    /// "empty_beat" or "position_gap".
    pub gap_type: String,
    pub beat_names: Vec<String>,
    pub description: String,
}

pub struct OutlineService;

impl OutlineService {
    /// Create an outline from a structure template.
    ///
    /// Deactivates any existing active outline on the manuscript first
    /// (single-active invariant), then materializes beats with
    /// `target_word_count = round(position_percent × target)`.
    pub async fn create_from_template(
        db: &PlumeDb,
        manuscript_id: &str,
        structure_id: &str,
        target_word_count: i64,
    ) -> Result<(Outline, Vec<PlotBeat>), PlumeError> {
        if target_word_count <= 0 {
            return Err(PlumeError::Validation(
                "target_word_count must be positive".into(),
            ));
        }
        let structure = get_structure(structure_id)?;

        deactivate_outlines(db, manuscript_id).await?;

        let outline = create_outline(
            db,
            OutlineCreate {
                manuscript_id: manuscript_id.to_string(),
                structure_id: structure.id.to_string(),
                is_active: true,
                target_word_count,
                premise: None,
                genre: None,
            },
        )
        .await?;

        let outline_key = record_key(&outline.id);
        let mut beats = Vec::new();
        for template in &structure.beats {
            beats.push(create_beat(db, materialize(template, &outline_key, target_word_count)).await?);
        }

        info!(
            manuscript_id,
            structure = structure.id,
            beats = beats.len(),
            "outline created"
        );
        Ok((outline, beats))
    }

    /// Update the beat bound to a chapter after a save.
    ///
    /// Sets `actual_word_count`; marks the beat completed (stamping
    /// `completed_at` exactly once) when the actual count reaches the target.
    pub async fn sync_chapter_word_count(
        db: &PlumeDb,
        chapter_id: &str,
        word_count: i64,
    ) -> Result<Option<PlotBeat>, PlumeError> {
        let Some(beat) = find_beat_for_chapter(db, chapter_id).await? else {
            return Ok(None);
        };
        let beat_key = record_key(&beat.id);

        let mut update = PlotBeatUpdate {
            actual_word_count: Some(word_count),
            ..Default::default()
        };
        if word_count >= beat.target_word_count && !beat.is_completed {
            update.is_completed = Some(true);
            update.completed_at = Some(Some(Datetime::from(chrono::Utc::now())));
        }

        update_beat(db, &beat_key, update).await
    }

    /// Score old beats against a new structure and return the best mapping
    /// per beat.
    pub async fn suggest_mappings(
        db: &PlumeDb,
        outline_id: &str,
        new_structure_id: &str,
    ) -> Result<Vec<MappingSuggestion>, PlumeError> {
        let structure = get_structure(new_structure_id)?;
        let old_beats = list_beats(db, outline_id).await?;

        Ok(old_beats
            .iter()
            .map(|old| suggest_for_beat(old, &structure.beats))
            .collect())
    }

    /// Switch an outline to a new structure.
    ///
    /// Without mappings, returns scored suggestions for user review. With
    /// mappings (`old_beat_id → new_beat_name`), performs the migration:
    /// creates the new outline, copies `{user_notes, is_completed,
    /// chapter_id, completed_at, content_summary}` along each mapping, and
    /// deactivates the source outline.
    pub async fn switch_structure(
        db: &PlumeDb,
        outline_id: &str,
        new_structure_id: &str,
        mappings: Option<HashMap<String, String>>,
    ) -> Result<SwitchOutcome, PlumeError> {
        let Some(old_outline) = get_outline(db, outline_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "outline".into(),
                id: outline_id.into(),
            });
        };

        let Some(mappings) = mappings else {
            return Ok(SwitchOutcome::Suggestions(
                Self::suggest_mappings(db, outline_id, new_structure_id).await?,
            ));
        };

        let old_beats = list_beats(db, outline_id).await?;
        let old_by_id: HashMap<String, &PlotBeat> = old_beats
            .iter()
            .map(|b| (record_key(&b.id), b))
            .collect();

        // Creating the replacement also deactivates the source outline.
        let (new_outline, new_beats) = Self::create_from_template(
            db,
            &old_outline.manuscript_id,
            new_structure_id,
            old_outline.target_word_count,
        )
        .await?;

        for (old_beat_id, new_beat_name) in &mappings {
            let Some(old_beat) = old_by_id.get(old_beat_id) else {
                return Err(PlumeError::Validation(format!(
                    "Mapping references unknown beat id '{old_beat_id}'"
                )));
            };
            let Some(new_beat) = new_beats.iter().find(|b| &b.beat_name == new_beat_name)
            else {
                return Err(PlumeError::Validation(format!(
                    "Mapping targets unknown beat '{new_beat_name}' in structure \
                     '{new_structure_id}'"
                )));
            };

            update_beat(
                db,
                &record_key(&new_beat.id),
                PlotBeatUpdate {
                    user_notes: Some(old_beat.user_notes.clone()),
                    content_summary: Some(old_beat.content_summary.clone()),
                    is_completed: Some(old_beat.is_completed),
                    chapter_id: Some(old_beat.chapter_id.clone()),
                    completed_at: Some(old_beat.completed_at.clone()),
                    actual_word_count: Some(old_beat.actual_word_count),
                    ..Default::default()
                },
            )
            .await?;
        }

        info!(
            outline_id,
            new_structure = new_structure_id,
            mapped = mappings.len(),
            "structure migration complete"
        );
        Ok(SwitchOutcome::Migrated(new_outline))
    }

    /// Progress summary: beat completion and accumulated word count.
    pub async fn progress(db: &PlumeDb, outline_id: &str) -> Result<OutlineProgress, PlumeError> {
        let beats = list_beats(db, outline_id).await?;
        let total = beats.len();
        let completed = beats.iter().filter(|b| b.is_completed).count();
        let actual: i64 = beats.iter().map(|b| b.actual_word_count).sum();

        Ok(OutlineProgress {
            total_beats: total,
            completed_beats: completed,
            completion_percent: if total == 0 {
                0.0
            } else {
                100.0 * completed as f64 / total as f64
            },
            actual_word_count: actual,
        })
    }

    /// Report beats with no notes and no chapter, and adjacent beats whose
    /// position gap exceeds 8% with nothing written between them.
    pub async fn gap_analysis(db: &PlumeDb, outline_id: &str) -> Result<Vec<OutlineGap>, PlumeError> {
        let beats = list_beats(db, outline_id).await?;
        let mut gaps = Vec::new();

        for beat in &beats {
            if beat.user_notes.trim().is_empty() && beat.chapter_id.is_none() {
                gaps.push(OutlineGap {
                    gap_type: "empty_beat".to_string(),
                    beat_names: vec![beat.beat_name.clone()],
                    description: format!(
                        "'{}' has no notes and no linked chapter yet.",
                        beat.beat_label
                    ),
                });
            }
        }

        for pair in beats.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let gap = b.target_position_percent - a.target_position_percent;
            if gap > POSITION_GAP_THRESHOLD && a.chapter_id.is_none() && b.chapter_id.is_none() {
                gaps.push(OutlineGap {
                    gap_type: "position_gap".to_string(),
                    beat_names: vec![a.beat_name.clone(), b.beat_name.clone()],
                    description: format!(
                        "{:.0}% of the story sits between '{}' and '{}' with nothing \
                         written between them.",
                        gap * 100.0,
                        a.beat_label,
                        b.beat_label
                    ),
                });
            }
        }

        Ok(gaps)
    }
}

fn materialize(template: &BeatTemplate, outline_key: &str, target_word_count: i64) -> PlotBeatCreate {
    PlotBeatCreate {
        outline_id: outline_key.to_string(),
        beat_name: template.beat_name.to_string(),
        beat_label: template.beat_label.to_string(),
        beat_description: template.description.to_string(),
        target_position_percent: template.position_percent,
        order_index: template.order_index,
        target_word_count: (target_word_count as f64 * template.position_percent).round() as i64,
        actual_word_count: 0,
        chapter_id: None,
        user_notes: String::new(),
        content_summary: String::new(),
        is_completed: false,
        completed_at: None,
    }
}

/// Score one old beat against every new-template beat and keep the best.
fn suggest_for_beat(old: &PlotBeat, templates: &[BeatTemplate]) -> MappingSuggestion {
    let mut best_score = f64::MIN;
    let mut best = &templates[0];

    for template in templates {
        let mut score = 0.0;
        if old.beat_name == template.beat_name {
            score += SCORE_NAME_EXACT;
        }
        if old.beat_name.contains(template.beat_name) || template.beat_name.contains(&old.beat_name)
        {
            score += SCORE_NAME_SUBSTRING;
        }
        let position_diff = (old.target_position_percent - template.position_percent).abs();
        score += (1.0 - position_diff) * SCORE_POSITION_WEIGHT;

        if score > best_score {
            best_score = score;
            best = template;
        }
    }

    MappingSuggestion {
        old_beat_id: record_key(&old.id),
        old_beat_name: old.beat_name.clone(),
        old_beat_label: old.beat_label.clone(),
        suggested_beat_name: best.beat_name.to_string(),
        suggested_beat_label: best.beat_label.to_string(),
        confidence: (best_score.max(0.0) as i64).min(100),
    }
}
