//! Response contracts for each LLM task.
//!
//! Every task defines its own schema; the prompt builders embed the JSON
//! Schema so the provider is held to the shape, and parsing validates
//! against these types.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `{ beat_descriptions: { <beat_name>: string, … } }`
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BeatDescriptionsResponse {
    pub beat_descriptions: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlotHole {
    /// high, medium, or low.
    pub severity: String,
    /// Where in the story the problem lives (beat or chapter reference).
    pub location: String,
    pub issue: String,
    pub suggestion: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlotHolesResponse {
    pub plot_holes: Vec<PlotHole>,
    pub overall_assessment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlotHoleFix {
    /// Which reported hole this addresses.
    pub issue: String,
    pub fix: String,
    /// Chapters or beats the fix touches.
    pub affected_locations: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PlotHoleFixesResponse {
    pub fixes: Vec<PlotHoleFix>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BridgeScene {
    pub title: String,
    pub description: String,
    pub emotional_purpose: String,
    pub suggested_word_count: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BridgeScenesResponse {
    pub scenes: Vec<BridgeScene>,
    pub bridging_analysis: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PacingResponse {
    pub assessment: String,
    /// Concrete observations tied to named beats.
    pub observations: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReverseBeatMapping {
    pub beat_name: String,
    pub chapter_ids: Vec<String>,
    pub summary: String,
    /// 0-100.
    pub confidence: f64,
    pub position_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReverseScene {
    pub title: String,
    pub summary: String,
    pub chapter_id: Option<String>,
}

/// Outline reverse-engineered from an existing manuscript.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReverseOutlineResponse {
    pub suggested_structure: String,
    pub structure_rationale: String,
    pub beat_mappings: Vec<ReverseBeatMapping>,
    pub scenes: Vec<ReverseScene>,
    /// Structural holes the manuscript has not covered.
    pub gaps: Vec<String>,
    pub pacing_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedScene {
    pub description: String,
    /// SCENE, CHAPTER, FLASHBACK, DREAM, or MONTAGE.
    pub event_type: String,
    pub characters: Vec<String>,
    pub location: Option<String>,
    /// Story-time label like "Day 3, Morning" when stated in the prose.
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SceneExtractionResponse {
    pub scenes: Vec<ExtractedScene>,
}

/// Serialize a schema for embedding into a prompt.
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| "{}".to_string())
}
