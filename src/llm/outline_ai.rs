//! AI-assisted outline analysis tasks.
//!
//! Each task builds its prompt, makes one (or for scene extraction, several
//! paced) LLM calls, parses the full response against its schema, and
//! returns typed data plus cost accounting. Persistence is left entirely to
//! callers.

use std::time::Duration;

use tracing::warn;

use crate::llm::prompts;
use crate::llm::schemas::{
    schema_json, BeatDescriptionsResponse, BridgeScenesResponse, PacingResponse, PlotHole,
    PlotHoleFixesResponse, PlotHolesResponse, ReverseOutlineResponse, SceneExtractionResponse,
};
use crate::llm::{calculate_cost, extract_json, OpenRouterClient, TokenUsage};
use crate::models::{Chapter, Outline, PlotBeat};
use crate::services::structures::available_structures;
use crate::text::split_paragraphs;
use crate::PlumeError;

/// Deadlines per task class.
const TIMEOUT_STANDARD: Duration = Duration::from_secs(60);
const TIMEOUT_LONG: Duration = Duration::from_secs(90);
const TIMEOUT_CHUNK: Duration = Duration::from_secs(30);

/// Pacing delay between scene-extraction chunks.
const CHUNK_PACING: Duration = Duration::from_secs(1);
/// Back-off after a failed chunk before trying the next.
const CHUNK_BACKOFF: Duration = Duration::from_secs(2);

/// Paragraphs per scene-extraction chunk.
const CHUNK_PARAGRAPHS: usize = 12;

/// A parsed task result with usage accounting.
#[derive(Debug)]
pub struct TaskOutput<T> {
    pub data: T,
    pub usage: TokenUsage,
    pub cost_usd: f64,
}

pub struct AiOutlineService {
    client: OpenRouterClient,
}

impl AiOutlineService {
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }

    fn output<T>(&self, data: T, usage: TokenUsage) -> TaskOutput<T> {
        TaskOutput {
            data,
            usage,
            cost_usd: calculate_cost(self.client.model(), usage),
        }
    }

    /// Story-specific descriptions for every beat of an outline.
    pub async fn generate_beat_descriptions(
        &self,
        outline: &Outline,
        beats: &[PlotBeat],
        chapters: &[Chapter],
    ) -> Result<TaskOutput<BeatDescriptionsResponse>, PlumeError> {
        let linked: Vec<String> = beats.iter().filter_map(|b| b.chapter_id.clone()).collect();
        let context = prompts::manuscript_context(chapters, &linked);
        let schema = schema_json::<BeatDescriptionsResponse>();
        let prompt = prompts::beat_descriptions_prompt(outline, beats, &context, &schema);

        let completion = self
            .client
            .chat_json(&prompts::story_editor_system(), &prompt, 3000, 0.6, TIMEOUT_STANDARD)
            .await?;
        let data: BeatDescriptionsResponse = extract_json(&completion.content)?;
        Ok(self.output(data, completion.usage))
    }

    /// Detect plot holes across the manuscript and outline.
    pub async fn detect_plot_holes(
        &self,
        outline: &Outline,
        beats: &[PlotBeat],
        chapters: &[Chapter],
    ) -> Result<TaskOutput<PlotHolesResponse>, PlumeError> {
        let linked: Vec<String> = beats.iter().filter_map(|b| b.chapter_id.clone()).collect();
        let context = prompts::manuscript_context(chapters, &linked);
        let schema = schema_json::<PlotHolesResponse>();
        let prompt = prompts::plot_holes_prompt(outline, beats, &context, &schema);

        let completion = self
            .client
            .chat_json(&prompts::story_editor_system(), &prompt, 3000, 0.4, TIMEOUT_STANDARD)
            .await?;
        let data: PlotHolesResponse = extract_json(&completion.content)?;
        Ok(self.output(data, completion.usage))
    }

    /// Concrete fix proposals for previously detected holes.
    pub async fn generate_plot_hole_fixes(
        &self,
        holes: &[PlotHole],
        chapters: &[Chapter],
    ) -> Result<TaskOutput<PlotHoleFixesResponse>, PlumeError> {
        let holes_json = serde_json::to_string_pretty(holes)?;
        let context = prompts::manuscript_context(chapters, &[]);
        let schema = schema_json::<PlotHoleFixesResponse>();
        let prompt = prompts::plot_hole_fixes_prompt(&holes_json, &context, &schema);

        let completion = self
            .client
            .chat_json(&prompts::story_editor_system(), &prompt, 2000, 0.5, TIMEOUT_STANDARD)
            .await?;
        let data: PlotHoleFixesResponse = extract_json(&completion.content)?;
        Ok(self.output(data, completion.usage))
    }

    /// Bridge scenes connecting two adjacent beats.
    pub async fn generate_bridge_scenes(
        &self,
        from_beat: &PlotBeat,
        to_beat: &PlotBeat,
        chapters: &[Chapter],
    ) -> Result<TaskOutput<BridgeScenesResponse>, PlumeError> {
        let context = prompts::manuscript_context(chapters, &[]);
        let schema = schema_json::<BridgeScenesResponse>();
        let prompt = prompts::bridge_scenes_prompt(from_beat, to_beat, &context, &schema);

        let completion = self
            .client
            .chat_json(&prompts::story_editor_system(), &prompt, 2000, 0.7, TIMEOUT_STANDARD)
            .await?;
        let data: BridgeScenesResponse = extract_json(&completion.content)?;
        Ok(self.output(data, completion.usage))
    }

    /// Pacing analysis over the outline's beat targets and actuals.
    pub async fn analyze_pacing(
        &self,
        outline: &Outline,
        beats: &[PlotBeat],
    ) -> Result<TaskOutput<PacingResponse>, PlumeError> {
        let schema = schema_json::<PacingResponse>();
        let prompt = prompts::pacing_prompt(outline, beats, &schema);

        let completion = self
            .client
            .chat_json(&prompts::story_editor_system(), &prompt, 1500, 0.4, TIMEOUT_STANDARD)
            .await?;
        let data: PacingResponse = extract_json(&completion.content)?;
        Ok(self.output(data, completion.usage))
    }

    /// Reverse-engineer an outline from an existing manuscript.
    pub async fn reverse_engineer_outline(
        &self,
        chapters: &[Chapter],
        genre: Option<&str>,
    ) -> Result<TaskOutput<ReverseOutlineResponse>, PlumeError> {
        let context = prompts::manuscript_context(chapters, &[]);
        let structures = available_structures();
        let structure_ids: Vec<&str> = structures.iter().map(|s| s.id).collect();
        let schema = schema_json::<ReverseOutlineResponse>();
        let prompt = prompts::reverse_outline_prompt(&context, genre, &structure_ids, &schema);

        let completion = self
            .client
            .chat_json(&prompts::story_editor_system(), &prompt, 4000, 0.4, TIMEOUT_LONG)
            .await?;
        let data: ReverseOutlineResponse = extract_json(&completion.content)?;
        Ok(self.output(data, completion.usage))
    }

    /// Intelligent scene extraction for the timeline.
    ///
    /// Chapters are chunked by paragraphs; chunks run sequentially with a
    /// one-second pacing delay, and a two-second back-off after a failed
    /// chunk. Chunk failures are logged and skipped; the task fails only
    /// when every chunk fails.
    pub async fn extract_scenes(
        &self,
        text: &str,
        character_names: &[String],
        location_names: &[String],
    ) -> Result<TaskOutput<SceneExtractionResponse>, PlumeError> {
        let chunks = chunk_text(text);
        if chunks.is_empty() {
            return Ok(self.output(
                SceneExtractionResponse { scenes: Vec::new() },
                TokenUsage::default(),
            ));
        }

        let schema = schema_json::<SceneExtractionResponse>();
        let mut scenes = Vec::new();
        let mut usage = TokenUsage::default();
        let mut failures = 0usize;
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CHUNK_PACING).await;
            }
            let prompt = prompts::scene_extraction_prompt(
                chunk,
                character_names,
                location_names,
                &schema,
            );
            let result = self
                .client
                .chat_json(&prompts::story_editor_system(), &prompt, 2000, 0.3, TIMEOUT_CHUNK)
                .await
                .and_then(|completion| {
                    let parsed: SceneExtractionResponse = extract_json(&completion.content)?;
                    Ok((parsed, completion.usage))
                });

            match result {
                Ok((parsed, chunk_usage)) => {
                    scenes.extend(parsed.scenes);
                    usage = usage + chunk_usage;
                }
                Err(e) => {
                    failures += 1;
                    warn!(chunk = i, "scene extraction chunk failed: {e}");
                    tokio::time::sleep(CHUNK_BACKOFF).await;
                }
            }
        }

        if failures == total {
            return Err(PlumeError::llm(
                "api_error_all_chunks",
                "Every scene-extraction chunk failed",
            ));
        }

        Ok(self.output(SceneExtractionResponse { scenes }, usage))
    }
}

/// Chunk prose for scene extraction: split at chapter headings and
/// `***`/`---` section breaks, then cap each section at a fixed paragraph
/// count. The cap only keeps chunks under the provider's context limit;
/// scene boundaries themselves come from the model and from the timeline
/// service's rule-based pass.
fn chunk_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for paragraph in split_paragraphs(text) {
        if is_structural_break(&paragraph) || current.len() >= CHUNK_PARAGRAPHS {
            if !current.is_empty() {
                chunks.push(current.join("\n\n"));
                current = Vec::new();
            }
        }
        if !is_structural_break(&paragraph) {
            current.push(paragraph);
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    chunks
}

/// Section-break rows (`***`, `---`) and short chapter headings.
fn is_structural_break(paragraph: &str) -> bool {
    let trimmed = paragraph.trim();

    let break_row = trimmed.chars().all(|c| matches!(c, '*' | '-' | ' '))
        && trimmed.chars().filter(|c| matches!(c, '*' | '-')).count() >= 3;
    if break_row {
        return true;
    }

    let lower = trimmed.to_lowercase();
    (lower.starts_with("chapter ") || lower.starts_with("ch. ")) && trimmed.len() < 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_empty() {
        assert!(chunk_text("").is_empty());
    }

    #[test]
    fn test_chunking_groups_paragraphs() {
        let text = (0..30)
            .map(|i| format!("Paragraph number {i} with some words."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_text(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].contains("Paragraph number 0"));
        assert!(chunks[2].contains("Paragraph number 29"));
    }

    #[test]
    fn test_chunking_splits_at_section_breaks() {
        let text = "The first scene unfolds at the gate.\n\n\
                    ***\n\n\
                    The second scene unfolds at the ford.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("gate"));
        assert!(chunks[1].contains("ford"));
        assert!(!chunks.iter().any(|c| c.contains("***")));
    }

    #[test]
    fn test_chunking_splits_at_chapter_headings() {
        let text = "Chapter 1\n\nOpening paragraph.\n\nChapter 2\n\nSecond opening.";
        let chunks = chunk_text(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("Opening paragraph"));
        assert!(chunks[1].contains("Second opening"));
    }
}
