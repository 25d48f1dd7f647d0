//! Prompt construction for the LLM tasks.
//!
//! Prompts are built from current structured state (outline beats, chapter
//! excerpts, known codex, genre). Every prompt demands story-specific output
//! that references real names from the manuscript and forbids generic
//! template text; the expected JSON Schema is embedded verbatim.

use crate::models::{Chapter, Outline, PlotBeat};

/// Max chapters included as excerpts in manuscript context.
const MAX_CONTEXT_CHAPTERS: usize = 10;
/// Excerpt size for non-linked chapters, in characters.
const EXCERPT_CHARS: usize = 5000;

/// System prompt shared by the manuscript-analysis tasks.
pub fn story_editor_system() -> String {
    "You are a professional story editor analyzing a SPECIFIC manuscript. \
     Describe what ACTUALLY HAPPENS in this author's story, not what should \
     happen in a generic story. You MUST reference specific characters, \
     events, and plot points from the provided chapters. NEVER produce \
     generic template text like 'Introduce the protagonist' or 'Present the \
     conflict'. If a section has not been written yet, ground every \
     suggestion in what already exists."
        .to_string()
}

/// Assemble manuscript context: linked chapters in full (highest priority),
/// then excerpts of the remaining chapters up to the context cap.
pub fn manuscript_context(chapters: &[Chapter], linked_chapter_ids: &[String]) -> String {
    let mut sections = Vec::new();

    let (linked, other): (Vec<&Chapter>, Vec<&Chapter>) = chapters
        .iter()
        .partition(|c| linked_chapter_ids.iter().any(|id| c.id.key().to_string() == *id));

    for chapter in &linked {
        let content = if chapter.content.is_empty() {
            "[Empty chapter]"
        } else {
            &chapter.content
        };
        sections.push(format!("## {} [LINKED TO BEAT]\n{}", chapter.title, content));
    }

    let remaining = MAX_CONTEXT_CHAPTERS.saturating_sub(linked.len());
    for chapter in other.iter().take(remaining) {
        if chapter.content.is_empty() {
            sections.push(format!("## {}\n[Empty chapter]", chapter.title));
        } else {
            let excerpt: String = chapter.content.chars().take(EXCERPT_CHARS).collect();
            let suffix = if chapter.content.chars().count() > EXCERPT_CHARS {
                "…"
            } else {
                ""
            };
            sections.push(format!("## {}\n{}{}", chapter.title, excerpt, suffix));
        }
    }

    sections.join("\n\n")
}

fn beat_listing(beats: &[PlotBeat]) -> String {
    beats
        .iter()
        .map(|beat| {
            format!(
                "- {} ({}) at {:.0}%{}",
                beat.beat_label,
                beat.beat_name,
                beat.target_position_percent * 100.0,
                if beat.user_notes.is_empty() {
                    String::new()
                } else {
                    format!(" — author notes: {}", beat.user_notes)
                }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn outline_context(outline: &Outline) -> String {
    format!(
        "- Premise: {}\n- Genre: {}\n- Target length: {} words",
        outline.premise.as_deref().unwrap_or("Infer from the chapters"),
        outline.genre.as_deref().unwrap_or("General fiction"),
        outline.target_word_count
    )
}

/// User prompt for beat-description generation.
pub fn beat_descriptions_prompt(
    outline: &Outline,
    beats: &[PlotBeat],
    context: &str,
    schema: &str,
) -> String {
    format!(
        "Analyze the ACTUAL MANUSCRIPT below and describe what happens at each \
         plot beat of THIS story.\n\n\
         **Manuscript chapters:**\n{context}\n\n\
         **Plot beats to describe:**\n{}\n\n\
         **Story context:**\n{}\n\n\
         For each beat, describe what actually happens in this story in 2-3 \
         sentences, naming specific characters, places, and events from the \
         chapters. For unwritten beats, suggest what could happen next based \
         on the existing story.\n\n\
         Respond with JSON matching this schema:\n{schema}",
        beat_listing(beats),
        outline_context(outline),
    )
}

/// User prompt for plot-hole detection.
pub fn plot_holes_prompt(
    outline: &Outline,
    beats: &[PlotBeat],
    context: &str,
    schema: &str,
) -> String {
    format!(
        "Find plot holes in the manuscript below: contradictions, broken \
         causality, unexplained reversals, abandoned threads, and character \
         knowledge the story never established.\n\n\
         **Manuscript chapters:**\n{context}\n\n\
         **Outline beats:**\n{}\n\n\
         **Story context:**\n{}\n\n\
         Cite the specific characters and events involved in every hole; \
         severity is high, medium, or low.\n\n\
         Respond with JSON matching this schema:\n{schema}",
        beat_listing(beats),
        outline_context(outline),
    )
}

/// User prompt for suggesting fixes to previously detected holes.
pub fn plot_hole_fixes_prompt(holes_json: &str, context: &str, schema: &str) -> String {
    format!(
        "These plot holes were found in the manuscript below:\n{holes_json}\n\n\
         **Manuscript chapters:**\n{context}\n\n\
         Propose one concrete fix per hole, staying consistent with the \
         story's established characters and events.\n\n\
         Respond with JSON matching this schema:\n{schema}"
    )
}

/// User prompt for bridge-scene generation between two beats.
pub fn bridge_scenes_prompt(
    from_beat: &PlotBeat,
    to_beat: &PlotBeat,
    context: &str,
    schema: &str,
) -> String {
    format!(
        "The story jumps from '{}' ({:.0}%) to '{}' ({:.0}%) with nothing \
         written between them.\n\n\
         **Manuscript chapters:**\n{context}\n\n\
         Propose 1-3 bridge scenes that connect these beats using this \
         story's actual characters and conflicts. Explain the emotional \
         purpose each scene serves.\n\n\
         Respond with JSON matching this schema:\n{schema}",
        from_beat.beat_label,
        from_beat.target_position_percent * 100.0,
        to_beat.beat_label,
        to_beat.target_position_percent * 100.0,
    )
}

/// User prompt for pacing analysis over the outline.
pub fn pacing_prompt(outline: &Outline, beats: &[PlotBeat], schema: &str) -> String {
    let progress = beats
        .iter()
        .map(|beat| {
            format!(
                "- {} at {:.0}%: target {} words, written {} words{}",
                beat.beat_label,
                beat.target_position_percent * 100.0,
                beat.target_word_count,
                beat.actual_word_count,
                if beat.is_completed { " (complete)" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Analyze the pacing of this outline against its targets.\n\n\
         **Story context:**\n{}\n\n\
         **Beat progress:**\n{progress}\n\n\
         Identify sections that run long or thin relative to their structural \
         position, referencing beats by name.\n\n\
         Respond with JSON matching this schema:\n{schema}",
        outline_context(outline),
    )
}

/// User prompt for reverse-engineering an outline from a manuscript.
pub fn reverse_outline_prompt(
    context: &str,
    genre: Option<&str>,
    structure_ids: &[&str],
    schema: &str,
) -> String {
    format!(
        "Reverse-engineer the story structure of the manuscript below.\n\n\
         **Manuscript chapters:**\n{context}\n\n\
         Genre: {}\n\
         Choose the best-fitting structure among: {}. Map each structural \
         beat to the chapters that realize it, summarizing what actually \
         happens there, with a confidence of 0-100 per mapping. List beats \
         the manuscript has not covered as gaps.\n\n\
         Respond with JSON matching this schema:\n{schema}",
        genre.unwrap_or("unknown"),
        structure_ids.join(", "),
    )
}

/// User prompt for intelligent scene extraction over one text chunk.
pub fn scene_extraction_prompt(
    chunk: &str,
    character_names: &[String],
    location_names: &[String],
    schema: &str,
) -> String {
    format!(
        "Split this prose into discrete story scenes for a timeline.\n\n\
         **Known characters:** {}\n\
         **Known locations:** {}\n\n\
         **Prose:**\n{chunk}\n\n\
         For each scene give a one-sentence description naming the characters \
         involved, the event type (SCENE, CHAPTER, FLASHBACK, DREAM, or \
         MONTAGE), the location if identifiable, and any story-time label \
         stated in the prose.\n\n\
         Respond with JSON matching this schema:\n{schema}",
        character_names.join(", "),
        location_names.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::RecordId;

    fn chapter(key: &str, title: &str, content: &str) -> Chapter {
        Chapter {
            id: RecordId::from_table_key("chapter", key),
            manuscript_id: "m-1".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            word_count: content.split_whitespace().count() as i64,
            order_index: 0,
            linked_entity_id: None,
            created_at: surrealdb::Datetime::from(chrono::Utc::now()),
            updated_at: surrealdb::Datetime::from(chrono::Utc::now()),
        }
    }

    #[test]
    fn test_linked_chapters_take_priority() {
        let chapters = vec![
            chapter("c1", "One", "First chapter text."),
            chapter("c2", "Two", "Second chapter text."),
        ];
        let context = manuscript_context(&chapters, &["c2".to_string()]);
        assert!(context.contains("## Two [LINKED TO BEAT]"));
        let linked_pos = context.find("## Two").unwrap();
        let other_pos = context.find("## One").unwrap();
        assert!(linked_pos < other_pos);
    }

    #[test]
    fn test_long_chapters_are_excerpted() {
        let long_text = "word ".repeat(3000);
        let chapters = vec![chapter("c1", "Long", &long_text)];
        let context = manuscript_context(&chapters, &[]);
        assert!(context.len() < long_text.len());
        assert!(context.contains('…'));
    }

    #[test]
    fn test_empty_chapter_marked() {
        let chapters = vec![chapter("c1", "Blank", "")];
        let context = manuscript_context(&chapters, &[]);
        assert!(context.contains("[Empty chapter]"));
    }

    #[test]
    fn test_prompts_forbid_generic_output() {
        let system = story_editor_system();
        assert!(system.contains("NEVER produce generic template text"));
        assert!(system.contains("reference specific characters"));
    }
}
