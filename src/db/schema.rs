use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Core manuscript tables: manuscripts, chapters, entities, relationships,
/// entity suggestions
const SCHEMA_001: &str = include_str!("migrations/001_core.surql");

/// World wiki: entries with unique lowercased titles + staged change queue
const SCHEMA_002: &str = include_str!("migrations/002_wiki.surql");

/// Story structure: outlines and plot beats
const SCHEMA_003: &str = include_str!("migrations/003_outline.surql");

/// Timeline events, inconsistencies, and world rules
const SCHEMA_004: &str = include_str!("migrations/004_timeline.surql");

/// Character voice profiles and inconsistencies
const SCHEMA_005: &str = include_str!("migrations/005_voice.surql");

/// Apply the database schema to an initialized database connection.
///
/// Executes all DEFINE statements, creating tables, fields, and indexes.
/// The unique indexes on lowercased name/title mirrors are what enforce the
/// case-insensitive uniqueness rules (entity names per manuscript, wiki
/// titles per world, one beat per outline position).
///
/// Safe to call multiple times - SurrealDB updates existing definitions
/// rather than failing.
pub async fn apply_schema(db: &PlumeDb) -> Result<(), PlumeError> {
    db.query(SCHEMA_001).await?;
    db.query(SCHEMA_002).await?;
    db.query(SCHEMA_003).await?;
    db.query(SCHEMA_004).await?;
    db.query(SCHEMA_005).await?;
    Ok(())
}
