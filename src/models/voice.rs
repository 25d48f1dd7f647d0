use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use surrealdb::{Datetime, RecordId};

use crate::db::connection::PlumeDb;
use crate::PlumeError;

/// Aggregate metrics characterizing one character's dialogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceMetrics {
    pub dialogue_samples: usize,
    pub total_words: usize,
    pub avg_sentence_length: f64,
    /// Standard deviation of sentence lengths.
    pub sentence_length_variance: f64,
    /// Average syllables per word.
    pub vocabulary_complexity: f64,
    /// Type-token ratio.
    pub vocabulary_richness: f64,
    pub contraction_rate: f64,
    pub question_rate: f64,
    pub exclamation_rate: f64,
    /// Repeated 2-4 word phrases with occurrence counts.
    pub common_phrases: Vec<(String, usize)>,
    /// Words used well above the character's average frequency.
    pub signature_words: Vec<String>,
    pub filler_words: HashMap<String, usize>,
    /// 0.0 (informal) to 1.0 (formal); 0.5 when no markers present.
    pub formality_score: f64,
    /// Shares of positive/negative/neutral emotion markers.
    pub emotion_markers: HashMap<String, f64>,
}

/// Persisted voice profile for a character within a manuscript.
/// `confidence_score` grows with sample count: `min(1, samples / 20)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub id: RecordId,
    pub manuscript_id: String,
    pub character_id: String,
    pub metrics: VoiceMetrics,
    pub confidence_score: f64,
    pub calculated_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct VoiceProfileCreate {
    pub manuscript_id: String,
    pub character_id: String,
    pub metrics: VoiceMetrics,
    pub confidence_score: f64,
}

/// A detected deviation from a character's established voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceInconsistency {
    pub id: RecordId,
    pub manuscript_id: String,
    pub character_id: String,
    #[serde(default)]
    pub chapter_id: Option<String>,
    /// SENTENCE_LENGTH, FORMALITY, or VOCABULARY.
    pub inconsistency_type: String,
    /// "medium" or "low".
    pub severity: String,
    pub description: String,
    pub dialogue_excerpt: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub expected_value: String,
    pub actual_value: String,
    pub suggestion: String,
    pub teaching_point: String,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize)]
pub struct VoiceInconsistencyCreate {
    pub manuscript_id: String,
    pub character_id: String,
    pub chapter_id: Option<String>,
    pub inconsistency_type: String,
    pub severity: String,
    pub description: String,
    pub dialogue_excerpt: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub expected_value: String,
    pub actual_value: String,
    pub suggestion: String,
    pub teaching_point: String,
}

pub async fn upsert_profile(
    db: &PlumeDb,
    data: VoiceProfileCreate,
) -> Result<VoiceProfile, PlumeError> {
    // One profile per (manuscript, character); replace in place on rebuild.
    let mut existing = db
        .query(
            "SELECT * FROM voice_profile WHERE manuscript_id = $manuscript_id \
             AND character_id = $character_id",
        )
        .bind(("manuscript_id", data.manuscript_id.clone()))
        .bind(("character_id", data.character_id.clone()))
        .await?;
    let found: Vec<VoiceProfile> = existing.take(0)?;

    if let Some(profile) = found.into_iter().next() {
        let key = profile.id.key().to_string();
        #[derive(Serialize)]
        struct ProfilePatch {
            metrics: VoiceMetrics,
            confidence_score: f64,
            calculated_at: Datetime,
        }
        let result: Option<VoiceProfile> = db
            .update(("voice_profile", key.as_str()))
            .merge(ProfilePatch {
                metrics: data.metrics,
                confidence_score: data.confidence_score,
                calculated_at: Datetime::from(chrono::Utc::now()),
            })
            .await?;
        return result.ok_or_else(|| PlumeError::Database("Failed to update voice profile".into()));
    }

    let result: Option<VoiceProfile> = db.create("voice_profile").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to create voice profile".into()))
}

pub async fn get_profile(
    db: &PlumeDb,
    manuscript_id: &str,
    character_id: &str,
) -> Result<Option<VoiceProfile>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM voice_profile WHERE manuscript_id = $manuscript_id \
             AND character_id = $character_id",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .bind(("character_id", character_id.to_string()))
        .await?;
    let profiles: Vec<VoiceProfile> = result.take(0)?;
    Ok(profiles.into_iter().next())
}

pub async fn create_voice_inconsistency(
    db: &PlumeDb,
    data: VoiceInconsistencyCreate,
) -> Result<VoiceInconsistency, PlumeError> {
    let result: Option<VoiceInconsistency> =
        db.create("voice_inconsistency").content(data).await?;
    result.ok_or_else(|| PlumeError::Database("Failed to record voice inconsistency".into()))
}

pub async fn list_voice_inconsistencies(
    db: &PlumeDb,
    manuscript_id: &str,
) -> Result<Vec<VoiceInconsistency>, PlumeError> {
    let mut result = db
        .query(
            "SELECT * FROM voice_inconsistency WHERE manuscript_id = $manuscript_id \
             ORDER BY created_at",
        )
        .bind(("manuscript_id", manuscript_id.to_string()))
        .await?;
    let issues: Vec<VoiceInconsistency> = result.take(0)?;
    Ok(issues)
}
