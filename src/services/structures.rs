//! Story-structure template registry.
//!
//! A data-driven registry mapping structure ids to beat templates. Legacy
//! structure ids from earlier releases resolve to their current equivalents
//! with a warning.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::PlumeError;

/// Template for a single plot beat within a structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatTemplate {
    pub beat_name: &'static str,
    pub beat_label: &'static str,
    pub description: &'static str,
    /// Fraction of the story where the beat lands, 0.0-1.0.
    pub position_percent: f64,
    pub order_index: i64,
}

/// A named story structure with its beats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub beats: Vec<BeatTemplate>,
    pub recommended_for: &'static [&'static str],
    /// (min, max) recommended manuscript word counts.
    pub word_count_range: (i64, i64),
}

fn beat(
    beat_name: &'static str,
    beat_label: &'static str,
    description: &'static str,
    position_percent: f64,
    order_index: i64,
) -> BeatTemplate {
    BeatTemplate {
        beat_name,
        beat_label,
        description,
        position_percent,
        order_index,
    }
}

fn story_arc_9() -> Vec<BeatTemplate> {
    vec![
        beat("hook", "Hook", "Open in motion: the protagonist in their normal world, with a first hint of what matters to them.", 0.00, 0),
        beat("inciting-event", "Inciting Event", "An occurrence the protagonist cannot ignore introduces the central conflict or opportunity.", 0.12, 1),
        beat("first-plot-point", "First Plot Point", "An active choice commits the protagonist to the conflict; the old normal is closed off.", 0.25, 2),
        beat("first-pressure-point", "First Pressure Point", "Opposing forces show their real strength, raising the perceived stakes.", 0.375, 3),
        beat("midpoint", "Midpoint", "A revelation turns reaction into pursuit; strategy changes.", 0.50, 4),
        beat("second-pressure-point", "Second Pressure Point", "Opposition escalates past anything seen before, tightening the vise.", 0.625, 5),
        beat("second-turning-point", "Second Turning Point", "The bleakest moment; a loss that makes victory look unreachable.", 0.75, 6),
        beat("climax", "Climax", "The decisive confrontation, fought with everything learned on the way.", 0.90, 7),
        beat("resolution", "Resolution", "The aftermath: what changed, for the protagonist and the world.", 0.98, 8),
    ]
}

fn screenplay_15() -> Vec<BeatTemplate> {
    vec![
        beat("story-opening", "Story Opening", "A first image that sets tone and stakes.", 0.00, 0),
        beat("setup", "Setup", "The protagonist's world, flaws, and wants before the change.", 0.01, 1),
        beat("theme-stated", "Theme Stated", "Someone names the lesson the story will test.", 0.05, 2),
        beat("catalyst", "Catalyst", "The event that knocks the old life off its rails.", 0.10, 3),
        beat("debate", "Debate", "Hesitation: can the protagonist really do this?", 0.12, 4),
        beat("commitment-point", "Commitment Point", "The protagonist chooses the new path.", 0.20, 5),
        beat("b-story", "B Story", "A secondary thread, often carrying the theme.", 0.22, 6),
        beat("fun-and-games", "Fun and Games", "The promise of the premise, explored.", 0.30, 7),
        beat("midpoint", "Midpoint", "A false victory or false defeat raises the stakes.", 0.50, 8),
        beat("rising-opposition", "Rising Opposition", "Antagonistic forces regroup and press in.", 0.55, 9),
        beat("lowest-point", "Lowest Point", "The visible loss: something or someone is gone.", 0.75, 10),
        beat("moment-of-despair", "Moment of Despair", "The internal bottom that follows the loss.", 0.80, 11),
        beat("resolution-decision", "Resolution Decision", "The insight that synthesizes both stories into a plan.", 0.85, 12),
        beat("finale", "Finale", "The plan executed; the lesson proven in action.", 0.90, 13),
        beat("story-closing", "Story Closing", "A closing image mirroring the opening, transformed.", 0.99, 14),
    ]
}

fn mythic_quest() -> Vec<BeatTemplate> {
    vec![
        beat("ordinary-world", "Ordinary World", "The hero at home, before the call.", 0.00, 0),
        beat("invitation-to-change", "Invitation to Change", "The call to adventure arrives.", 0.10, 1),
        beat("hesitation", "Hesitation", "The call refused; fear names its price.", 0.15, 2),
        beat("meeting-mentor", "Meeting the Mentor", "Guidance, tools, or confidence from a mentor figure.", 0.20, 3),
        beat("crossing-threshold", "Crossing the Threshold", "Commitment: the hero enters the special world.", 0.25, 4),
        beat("tests-allies-enemies", "Tests, Allies, and Enemies", "The new world's rules learned the hard way.", 0.30, 5),
        beat("preparation", "Preparation for Crisis", "Approach to the innermost cave; plans and doubts.", 0.45, 6),
        beat("ordeal", "Ordeal", "The central crisis; death brushed against.", 0.50, 7),
        beat("victory", "Victory and Gain", "The reward seized after the ordeal.", 0.60, 8),
        beat("road-back", "The Road Back", "The journey home, with consequences in pursuit.", 0.70, 9),
        beat("resurrection", "Resurrection", "A final test where the transformation is proven.", 0.90, 10),
        beat("triumphant-return", "Triumphant Return", "Home again, carrying the elixir.", 0.98, 11),
    ]
}

fn three_act() -> Vec<BeatTemplate> {
    vec![
        beat("setup", "Setup", "Establish character, setting, and the want beneath the surface.", 0.00, 0),
        beat("inciting-incident", "Inciting Incident", "The disturbance that starts the dramatic question.", 0.10, 1),
        beat("plot-point-one", "Plot Point One", "The door closes behind the protagonist; act two begins.", 0.25, 2),
        beat("rising-action", "Rising Action", "Obstacles escalate and alliances form.", 0.35, 3),
        beat("midpoint", "Midpoint", "A reversal that reframes the goal.", 0.50, 4),
        beat("complications", "Complications", "Stakes compound; costs of the goal become clear.", 0.60, 5),
        beat("plot-point-two", "Plot Point Two", "The lowest moment propels the final act.", 0.75, 6),
        beat("climax", "Climax", "The dramatic question answered under maximum pressure.", 0.90, 7),
        beat("resolution", "Resolution", "The new equilibrium, shown not told.", 0.98, 8),
    ]
}

/// All registered structures, in display order.
pub fn available_structures() -> Vec<StructureTemplate> {
    vec![
        StructureTemplate {
            id: "story-arc-9",
            name: "9-Beat Story Arc",
            description: "A flexible nine-beat structure focused on turning points at \
                          specific story percentages. Works well for character-driven \
                          narratives.",
            beats: story_arc_9(),
            recommended_for: &["all genres", "literary fiction", "character-driven"],
            word_count_range: (50_000, 120_000),
        },
        StructureTemplate {
            id: "screenplay-15",
            name: "15-Beat Screenplay Structure",
            description: "A fifteen-beat structure emphasizing thematic development and \
                          emotional beats. Screenwriting-born but effective for novels.",
            beats: screenplay_15(),
            recommended_for: &["thriller", "action", "romance", "commercial fiction"],
            word_count_range: (60_000, 100_000),
        },
        StructureTemplate {
            id: "mythic-quest",
            name: "Mythic Quest Structure",
            description: "A twelve-stage structure based on archetypal quest narratives. \
                          Ideal for adventure stories of transformation and discovery.",
            beats: mythic_quest(),
            recommended_for: &["fantasy", "sci-fi", "adventure", "epic"],
            word_count_range: (80_000, 150_000),
        },
        StructureTemplate {
            id: "3-act",
            name: "Three-Act Structure",
            description: "Traditional dramatic structure. Simple and flexible; a good \
                          starting point.",
            beats: three_act(),
            recommended_for: &["all genres", "beginners", "short novels"],
            word_count_range: (40_000, 100_000),
        },
    ]
}

/// Legacy structure id → current id.
const LEGACY_STRUCTURE_IDS: [(&str, &str); 3] = [
    ("km-weiland", "story-arc-9"),
    ("save-the-cat", "screenplay-15"),
    ("heros-journey", "mythic-quest"),
];

/// Resolve a structure id, mapping legacy ids with a warning.
pub fn resolve_structure_id(structure_id: &str) -> &str {
    match LEGACY_STRUCTURE_IDS
        .iter()
        .find(|(legacy, _)| *legacy == structure_id)
    {
        Some((legacy, current)) => {
            warn!(
                "Legacy structure id '{legacy}' used; resolving to '{current}'. \
                 Update callers to the current id."
            );
            current
        }
        None => structure_id,
    }
}

/// Get a structure template by id (current or legacy).
pub fn get_structure(structure_id: &str) -> Result<StructureTemplate, PlumeError> {
    let resolved = resolve_structure_id(structure_id);
    available_structures()
        .into_iter()
        .find(|s| s.id == resolved)
        .ok_or_else(|| {
            let known: Vec<&str> = available_structures().iter().map(|s| s.id).collect();
            PlumeError::Validation(format!(
                "Unknown structure id: {structure_id}. Available: {}",
                known.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_four_structures() {
        let structures = available_structures();
        assert_eq!(structures.len(), 4);
        assert_eq!(structures[0].beats.len(), 9);
        assert_eq!(structures[1].beats.len(), 15);
        assert_eq!(structures[2].beats.len(), 12);
        assert_eq!(structures[3].beats.len(), 9);
    }

    #[test]
    fn test_positions_monotonic_and_bounded() {
        for structure in available_structures() {
            let mut last = -1.0;
            for (i, beat) in structure.beats.iter().enumerate() {
                assert!((0.0..=1.0).contains(&beat.position_percent), "{}", beat.beat_name);
                assert!(beat.position_percent >= last, "{} out of order", beat.beat_name);
                assert_eq!(beat.order_index, i as i64);
                last = beat.position_percent;
            }
        }
    }

    #[test]
    fn test_legacy_ids_resolve() {
        assert_eq!(get_structure("km-weiland").unwrap().id, "story-arc-9");
        assert_eq!(get_structure("save-the-cat").unwrap().id, "screenplay-15");
        assert_eq!(get_structure("heros-journey").unwrap().id, "mythic-quest");
    }

    #[test]
    fn test_unknown_id_is_validation_error() {
        let err = get_structure("seven-point").unwrap_err();
        assert!(matches!(err, PlumeError::Validation(_)));
    }

    #[test]
    fn test_story_arc_beats() {
        let arc = get_structure("story-arc-9").unwrap();
        let names: Vec<&str> = arc.beats.iter().map(|b| b.beat_name).collect();
        assert_eq!(
            names,
            vec![
                "hook",
                "inciting-event",
                "first-plot-point",
                "first-pressure-point",
                "midpoint",
                "second-pressure-point",
                "second-turning-point",
                "climax",
                "resolution"
            ]
        );
        let midpoint = &arc.beats[4];
        assert!((midpoint.position_percent - 0.5).abs() < f64::EPSILON);
    }
}
