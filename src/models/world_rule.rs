use serde::{Deserialize, Serialize};
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Domain a world rule constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Magic,
    Social,
    Physical,
    Cultural,
    Custom,
}

/// How strictly validators should treat a violation of the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Strict,
    #[default]
    Warning,
    Informational,
}

/// An explicit constraint on the story world, stated in or derived from
/// prose ("Only the Emberborn can cross the glass desert"). Validators use
/// these to flag prose that contradicts established rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldRule {
    pub id: RecordId,
    pub world_id: String,
    pub rule_type: RuleType,
    pub rule_text: String,
    /// Pattern-kind tag from the catalog ("restriction", "prohibition", …).
    #[serde(default)]
    pub rule_kind: Option<String>,
    pub severity: RuleSeverity,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub source_chapter_id: Option<String>,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct WorldRuleCreate {
    pub world_id: String,
    pub rule_type: RuleType,
    pub rule_text: String,
    pub rule_kind: Option<String>,
    pub severity: RuleSeverity,
    pub source_text: Option<String>,
    pub source_chapter_id: Option<String>,
}

pub async fn create_world_rule(
    db: &PlumeDb,
    data: WorldRuleCreate,
) -> Result<WorldRule, PlumeError> {
    let result: Option<WorldRule> = db.create("world_rule").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create world rule".into()))
}

pub async fn list_world_rules(db: &PlumeDb, world_id: &str) -> Result<Vec<WorldRule>, PlumeError> {
    let mut result = db
        .query("SELECT * FROM world_rule WHERE world_id = $world_id ORDER BY created_at")
        .bind(("world_id", world_id.to_string()))
        .await?;
    let rules: Vec<WorldRule> = result.take(0)?;
    Ok(rules)
}

pub async fn delete_world_rule(db: &PlumeDb, id: &str) -> Result<Option<WorldRule>, PlumeError> {
    let result: Option<WorldRule> = db.delete(("world_rule", id)).await?;
    Ok(result)
}
