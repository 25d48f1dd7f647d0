//! Builders for common test fixtures.

use std::collections::HashMap;

use plume::db::connection::PlumeDb;
use plume::models::manuscript::{create_chapter, create_manuscript, ChapterCreate, ManuscriptCreate};
use plume::models::entity::{create_entity, EntityCreate};
use plume::models::{record_key, EntityType};
use plume::text::count_words;

/// Create a manuscript, returning its key. `world_id = None` keeps wiki-sync
/// inert for codex-focused tests.
pub async fn manuscript(db: &PlumeDb, title: &str, world_id: Option<&str>) -> String {
    let created = create_manuscript(
        db,
        ManuscriptCreate {
            title: title.to_string(),
            world_id: world_id.map(|w| w.to_string()),
            genre: Some("fantasy".to_string()),
        },
    )
    .await
    .expect("create manuscript");
    record_key(&created.id)
}

/// Create a chapter with content, returning its key.
pub async fn chapter(db: &PlumeDb, manuscript_id: &str, title: &str, content: &str) -> String {
    let created = create_chapter(
        db,
        ChapterCreate {
            manuscript_id: manuscript_id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            word_count: count_words(content) as i64,
            order_index: 0,
            linked_entity_id: None,
        },
    )
    .await
    .expect("create chapter");
    record_key(&created.id)
}

/// Create a codex entity directly (no wiki-sync side effects), returning its
/// key.
pub async fn entity(
    db: &PlumeDb,
    manuscript_id: &str,
    entity_type: EntityType,
    name: &str,
    aliases: &[&str],
) -> String {
    let mut create = EntityCreate::new(manuscript_id, entity_type, name);
    create.aliases = aliases.iter().map(|a| a.to_string()).collect();
    create.attributes = HashMap::new();
    let created = create_entity(db, create).await.expect("create entity");
    record_key(&created.id)
}
