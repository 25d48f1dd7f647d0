use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// A manuscript: the root aggregate a codex and outline belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub world_id: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Default, Serialize)]
pub struct ManuscriptCreate {
    pub title: String,
    pub world_id: Option<String>,
    pub genre: Option<String>,
}

/// A chapter of prose within a manuscript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: RecordId,
    pub manuscript_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub word_count: i64,
    #[serde(default)]
    pub order_index: i64,
    /// Character-sheet link: the codex entity this chapter documents.
    #[serde(default)]
    pub linked_entity_id: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct ChapterCreate {
    pub manuscript_id: String,
    pub title: String,
    pub content: String,
    pub word_count: i64,
    pub order_index: i64,
    pub linked_entity_id: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize)]
pub struct ChapterUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub word_count: Option<i64>,
    pub order_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<Option<String>>,
    pub updated_at: Option<Datetime>,
}

pub async fn create_manuscript(
    db: &PlumeDb,
    data: ManuscriptCreate,
) -> Result<Manuscript, PlumeError> {
    let result: Option<Manuscript> = db.create("manuscript").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create manuscript".into()))
}

pub async fn get_manuscript(db: &PlumeDb, id: &str) -> Result<Option<Manuscript>, PlumeError> {
    let result: Option<Manuscript> = db.select(("manuscript", id)).await?;
    Ok(result)
}

/// List manuscripts belonging to a world.
pub async fn list_manuscripts_for_world(
    db: &PlumeDb,
    world_id: &str,
) -> Result<Vec<Manuscript>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM manuscript WHERE world_id = $world_id ORDER BY title")
        .bind(("world_id", world_id.to_string()))
        .await?;
    let manuscripts: Vec<Manuscript> = result.take(0)?;
    Ok(manuscripts)
}

pub async fn create_chapter(db: &PlumeDb, data: ChapterCreate) -> Result<Chapter, PlumeError> {
    let result: Option<Chapter> = db.create("chapter").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create chapter".into()))
}

pub async fn get_chapter(db: &PlumeDb, id: &str) -> Result<Option<Chapter>, PlumeError> {
    let result: Option<Chapter> = db.select(("chapter", id)).await?;
    Ok(result)
}

/// List a manuscript's chapters in reading order.
pub async fn list_chapters(db: &PlumeDb, manuscript_id: &str) -> Result<Vec<Chapter>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM chapter WHERE manuscript_id = $manuscript_id ORDER BY order_index")
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    let chapters: Vec<Chapter> = result.take(0)?;
    Ok(chapters)
}

pub async fn update_chapter(
    db: &PlumeDb,
    id: &str,
    data: ChapterUpdate,
) -> Result<Option<Chapter>, PlumeError> {
    let result: Option<Chapter> = db.update(("chapter", id)).merge(data).await?;
    Ok(result)
}

/// Delete a chapter. Any plot beat bound to it has its `chapter_id` nulled
/// so the outline never references a missing chapter.
pub async fn delete_chapter(db: &PlumeDb, id: &str) -> Result<Option<Chapter>, PlumeError> {
    db.query("UPDATE plot_beat SET chapter_id = NONE WHERE chapter_id = $chapter_id")
        .bind(("chapter_id", id.to_string()))
        .await?;
    let result: Option<Chapter> = db.delete(("chapter", id)).await?;
    Ok(result)
}
