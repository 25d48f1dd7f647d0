use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// An outline: an ordered list of plot beats bound to a manuscript.
/// At most one outline per manuscript is active at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    pub id: RecordId,
    pub manuscript_id: String,
    pub structure_id: String,
    pub is_active: bool,
    pub target_word_count: i64,
    #[serde(default)]
    pub premise: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct OutlineCreate {
    pub manuscript_id: String,
    pub structure_id: String,
    pub is_active: bool,
    pub target_word_count: i64,
    pub premise: Option<String>,
    pub genre: Option<String>,
}

/// A named story-structure moment with a target position and word count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotBeat {
    pub id: RecordId,
    pub outline_id: String,
    pub beat_name: String,
    pub beat_label: String,
    #[serde(default)]
    pub beat_description: String,
    pub target_position_percent: f64,
    pub order_index: i64,
    pub target_word_count: i64,
    #[serde(default)]
    pub actual_word_count: i64,
    #[serde(default)]
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub user_notes: String,
    #[serde(default)]
    pub content_summary: String,
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<Datetime>,
}

#[derive(Debug, Serialize)]
pub struct PlotBeatCreate {
    pub outline_id: String,
    pub beat_name: String,
    pub beat_label: String,
    pub beat_description: String,
    pub target_position_percent: f64,
    pub order_index: i64,
    pub target_word_count: i64,
    pub actual_word_count: i64,
    pub chapter_id: Option<String>,
    pub user_notes: String,
    pub content_summary: String,
    pub is_completed: bool,
    pub completed_at: Option<Datetime>,
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct PlotBeatUpdate {
    pub beat_description: Option<String>,
    pub actual_word_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<Option<String>>,
    pub user_notes: Option<String>,
    pub content_summary: Option<String>,
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<Datetime>>,
}

pub async fn create_outline(db: &PlumeDb, data: OutlineCreate) -> Result<Outline, PlumeError> {
    let result: Option<Outline> = db.create("outline").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create outline".into()))
}

pub async fn get_outline(db: &PlumeDb, id: &str) -> Result<Option<Outline>, PlumeError> {
    let result: Option<Outline> = db.select(("outline", id)).await?;
    Ok(result)
}

/// The active outline for a manuscript, if any.
pub async fn get_active_outline(
    db: &PlumeDb,
    manuscript_id: &str,
) -> Result<Option<Outline>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM outline WHERE manuscript_id = $manuscript_id AND is_active = true",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    let outlines: Vec<Outline> = result.take(0)?;
    Ok(outlines.into_iter().next())
}

/// Deactivate every outline on a manuscript. Runs before inserting a new
/// active outline so the single-active invariant holds.
pub async fn deactivate_outlines(db: &PlumeDb, manuscript_id: &str) -> Result<(), PlumeError> {
    db.query("UPDATE outline SET is_active = false WHERE manuscript_id = $manuscript_id")
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    Ok(())
}

pub async fn create_beat(db: &PlumeDb, data: PlotBeatCreate) -> Result<PlotBeat, PlumeError> {
    let result: Option<PlotBeat> = db.create("plot_beat").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create plot beat".into()))
}

pub async fn get_beat(db: &PlumeDb, id: &str) -> Result<Option<PlotBeat>, PlumeError> {
    let result: Option<PlotBeat> = db.select(("plot_beat", id)).await?;
    Ok(result)
}

/// Beats of an outline in structural order.
pub async fn list_beats(db: &PlumeDb, outline_id: &str) -> Result<Vec<PlotBeat>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM plot_beat WHERE outline_id = $outline_id ORDER BY order_index")
        .bind(("outline_id", outline_id.to_string()))
        .await?;
    let beats: Vec<PlotBeat> = result.take(0)?;
    Ok(beats)
}

/// The beat bound to a given chapter, if any.
pub async fn find_beat_for_chapter(
    db: &PlumeDb,
    chapter_id: &str,
) -> Result<Option<PlotBeat>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM plot_beat WHERE chapter_id = $chapter_id")
        .bind(("chapter_id", chapter_id.to_string()))
        .await?;
    let beats: Vec<PlotBeat> = result.take(0)?;
    Ok(beats.into_iter().next())
}

pub async fn update_beat(
    db: &PlumeDb,
    id: &str,
    data: PlotBeatUpdate,
) -> Result<Option<PlotBeat>, PlumeError> {
    let result: Option<PlotBeat> = db.update(("plot_beat", id)).merge(data).await?;
    Ok(result)
}
