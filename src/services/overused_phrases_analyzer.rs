//! Overused-phrase analyzer.
//!
//! A curated database of stock fiction phrases, each mapped to an
//! alternative suggestion and a category with a teaching point. Only the
//! first two occurrences of any phrase are reported, and output is capped to
//! keep the editor panel readable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;

use crate::services::issue::{Severity, Suggestion, SuggestionType};

const MIN_TEXT_LEN: usize = 50;
/// Literal phrase matches; high confidence.
const ANALYZER_CONFIDENCE: f64 = 0.8;
const MAX_OCCURRENCES_PER_PHRASE: usize = 2;
pub const MAX_ISSUES: usize = 20;

/// phrase → (alternative suggestion, category)
pub static OVERUSED_PHRASES: &[(&str, &str, &str)] = &[
    // Physical reactions - breath
    ("let out a breath", "Show the emotion causing the breath (relief, tension release)", "physical_reaction"),
    ("let out the breath", "Show the emotion causing the breath (relief, tension release)", "physical_reaction"),
    ("released a breath", "What emotion drives this? Show it through action or thought", "physical_reaction"),
    ("released the breath", "What emotion drives this? Show it through action or thought", "physical_reaction"),
    ("took a deep breath", "Why? Nervous, steeling themselves? Show the emotion directly", "physical_reaction"),
    ("drew a deep breath", "Why? Nervous, steeling themselves? Show the emotion directly", "physical_reaction"),
    ("held her breath", "Describe the anticipation or fear creating this tension", "physical_reaction"),
    ("held his breath", "Describe the anticipation or fear creating this tension", "physical_reaction"),
    ("caught her breath", "Show what caused the surprise or exertion", "physical_reaction"),
    ("caught his breath", "Show what caused the surprise or exertion", "physical_reaction"),
    ("breath caught", "Show what caused the surprise", "physical_reaction"),
    ("breath hitched", "Describe the emotion causing this physical response", "physical_reaction"),
    // Physical reactions - eyes
    ("rolled her eyes", "More specific: skyward glance, exasperated look, or show through dialogue", "physical_reaction"),
    ("rolled his eyes", "More specific: skyward glance, exasperated look, or show through dialogue", "physical_reaction"),
    ("her eyes widened", "Why? Show the surprise through her reaction or thoughts", "physical_reaction"),
    ("his eyes widened", "Why? Show the surprise through his reaction or thoughts", "physical_reaction"),
    ("eyes went wide", "Show what caused the surprise, not just the physical response", "physical_reaction"),
    ("narrowed her eyes", "Show the suspicion or anger through action or dialogue", "physical_reaction"),
    ("narrowed his eyes", "Show the suspicion or anger through action or dialogue", "physical_reaction"),
    ("blinked in surprise", "Show the surprise itself, not the blink", "physical_reaction"),
    // Physical reactions - jaw/teeth
    ("clenched his jaw", "What emotion? Show anger, determination, or frustration directly", "physical_reaction"),
    ("clenched her jaw", "What emotion? Show anger, determination, or frustration directly", "physical_reaction"),
    ("jaw clenched", "Show the underlying emotion through action or internal thought", "physical_reaction"),
    ("gritted his teeth", "Show the frustration or determination in another way", "physical_reaction"),
    ("gritted her teeth", "Show the frustration or determination in another way", "physical_reaction"),
    ("ground his teeth", "What's the emotion? Show it through action or thought", "physical_reaction"),
    ("ground her teeth", "What's the emotion? Show it through action or thought", "physical_reaction"),
    // Physical reactions - lips
    ("bit her lip", "Often signals nervousness. Find a unique tell for this character", "physical_reaction"),
    ("bit his lip", "Often signals nervousness. Find a unique tell for this character", "physical_reaction"),
    ("pursed her lips", "Show disapproval through action or dialogue instead", "physical_reaction"),
    ("pursed his lips", "Show disapproval through action or dialogue instead", "physical_reaction"),
    ("lips thinned", "Show the displeasure or anger more directly", "physical_reaction"),
    ("licked her lips", "Often nervousness. Show through unique character-specific action", "physical_reaction"),
    ("licked his lips", "Often nervousness. Show through unique character-specific action", "physical_reaction"),
    // Physical reactions - heart
    ("heart pounded", "Very common. Try a more specific physical sensation", "physical_reaction"),
    ("heart raced", "Very common. Describe the specific feeling instead", "physical_reaction"),
    ("heart hammered", "Try showing fear or excitement through action or thought", "physical_reaction"),
    ("heart skipped a beat", "Cliché for surprise. Show the surprise itself", "physical_reaction"),
    ("heart stopped", "Hyperbole that's lost impact. Show the shock differently", "physical_reaction"),
    ("heart sank", "Common. Show disappointment through action or thought", "physical_reaction"),
    ("heart leaped", "Cliché for joy. Show the happiness more specifically", "physical_reaction"),
    // Physical reactions - stomach
    ("stomach dropped", "Common. Describe the specific sensation of dread", "physical_reaction"),
    ("stomach churned", "Show the anxiety or nausea more specifically", "physical_reaction"),
    ("stomach knotted", "Show the nervousness through action or thought", "physical_reaction"),
    ("knot in her stomach", "Describe the specific anxiety causing this", "physical_reaction"),
    ("knot in his stomach", "Describe the specific anxiety causing this", "physical_reaction"),
    ("butterflies in her stomach", "Cliché. Find a fresh way to show nervousness", "physical_reaction"),
    ("butterflies in his stomach", "Cliché. Find a fresh way to show nervousness", "physical_reaction"),
    // Physical reactions - temperature/chills
    ("blood ran cold", "Cliché for fear. Show the fear more directly", "physical_reaction"),
    ("blood froze", "Cliché. Show the terror through action or thought", "physical_reaction"),
    ("shiver ran down", "Very common. Try a more specific physical reaction", "physical_reaction"),
    ("chill ran down", "Common. Describe what causes this feeling", "physical_reaction"),
    ("sent chills down", "Overused. Show the fear or unease differently", "physical_reaction"),
    ("goosebumps", "What specifically causes them? Show the stimulus", "physical_reaction"),
    ("goose bumps", "What specifically causes them? Show the stimulus", "physical_reaction"),
    // Physical reactions - other
    ("let out a sigh", "Show what emotion drives the sigh (relief, frustration, sadness)", "physical_reaction"),
    ("heaved a sigh", "What emotion? Relief, exhaustion? Show it directly", "physical_reaction"),
    ("swallowed hard", "Common for nervousness. Find a unique character-specific action", "physical_reaction"),
    ("throat tightened", "Show the emotion causing this physical response", "physical_reaction"),
    // Transitions
    ("all of a sudden", "Use 'suddenly' or show the suddenness through action", "transition"),
    ("before she knew it", "Often a POV break. Stay in the moment", "transition"),
    ("before he knew it", "Often a POV break. Stay in the moment", "transition"),
    ("before long", "Be more specific about the time that passed", "transition"),
    ("in the blink of an eye", "Cliché. Show the speed through quick action", "transition"),
    ("without warning", "Show the surprise through character reaction", "transition"),
    ("out of nowhere", "Show where it came from or make the surprise vivid", "transition"),
    ("the next thing she knew", "Often a POV break. Stay in the moment", "transition"),
    ("the next thing he knew", "Often a POV break. Stay in the moment", "transition"),
    ("suddenly realized", "'Realized' is often telling. Show the realization", "transition"),
    ("in that moment", "Usually unnecessary. Just show the moment", "transition"),
    ("at that moment", "Often filler. Just describe what happened", "transition"),
    // Descriptions
    ("crystal clear", "Be specific about what's clear and why it matters", "description"),
    ("pitch black", "Describe what the darkness feels like, how it affects the character", "description"),
    ("pitch dark", "Describe the darkness through sensory experience", "description"),
    ("inky blackness", "Cliché. Describe how darkness affects the character", "description"),
    ("blood red", "Just 'red', or describe the specific shade meaningfully", "description"),
    ("deafening silence", "Oxymoron cliché. Describe the silence's effect on character", "description"),
    ("pregnant pause", "Show the weight of the pause through character reaction", "description"),
    ("piercing blue eyes", "Very overused. Find a fresh description or skip eye color", "description"),
    ("emerald green eyes", "Cliché. Consider whether eye color needs mention", "description"),
    ("sapphire eyes", "Very overused eye description", "description"),
    ("chiseled features", "Vague and cliché. Be more specific or skip", "description"),
    ("ruggedly handsome", "Cliché. Describe specific features that create this impression", "description"),
    ("stunningly beautiful", "Telling rather than showing. Describe specific features", "description"),
    ("impossibly beautiful", "'Impossibly' is weak. Describe what makes them beautiful", "description"),
    // Actions
    ("nodded in agreement", "'Nodded' implies agreement. Just 'nodded', or show agreement otherwise", "action"),
    ("nodded his head", "'Nodded' means head-nodding. Just 'nodded'", "action"),
    ("nodded her head", "'Nodded' means head-nodding. Just 'nodded'", "action"),
    ("shook his head in disbelief", "Often 'shook his head' alone is enough", "action"),
    ("shook her head in disbelief", "Often 'shook her head' alone is enough", "action"),
    ("shrugged his shoulders", "'Shrugged' implies shoulders. Just 'shrugged'", "action"),
    ("shrugged her shoulders", "'Shrugged' implies shoulders. Just 'shrugged'", "action"),
    ("turned on her heel", "Cliché action. Describe the departure uniquely", "action"),
    ("turned on his heel", "Cliché action. Describe the departure uniquely", "action"),
    ("spun around", "Common. Try a more specific action", "action"),
    ("whipped around", "Common. Describe what prompts the quick turn", "action"),
    ("leaned in close", "What's the intent? Show it through context", "action"),
    ("closed the distance", "Common phrase. Describe the movement specifically", "action"),
    // Emotions - telling
    ("couldn't help but", "Often unnecessary. Just show the action", "emotion"),
    ("couldn't believe", "Show the disbelief through reaction, not statement", "emotion"),
    ("didn't know what to say", "Show the speechlessness through action or silence", "emotion"),
    ("at a loss for words", "Cliché. Show the character's struggle to speak", "emotion"),
    ("tears streamed down", "Very common. Find a fresh way to show crying", "emotion"),
    ("tears welled up", "Common. Show the emotion causing the tears", "emotion"),
    ("tears pricked", "Show the emotion causing this physical response", "emotion"),
    ("couldn't contain", "Just show them not containing it", "emotion"),
    ("felt a wave of", "'Felt' is telling. Show the emotion through action", "emotion"),
    ("surge of emotion", "Vague. Name and show the specific emotion", "emotion"),
    ("mixture of emotions", "Too vague. Be specific about what they feel", "emotion"),
    // Time/pacing
    ("seemed like hours", "Either be specific about time or show tedium differently", "time"),
    ("felt like forever", "Cliché. Show the tedium or anticipation directly", "time"),
    ("time stood still", "Cliché. Describe the moment's impact differently", "time"),
    ("time seemed to slow", "Overused in action scenes. Show the heightened awareness differently", "time"),
    ("everything happened so fast", "Telling. Show the rapid events instead", "time"),
];

/// Teaching point per category, attached to each finding's metadata.
pub static CATEGORY_TEACHING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "physical_reaction",
            "Physical reactions like these are shortcuts for emotion. Relying on them \
             can feel like paint-by-numbers writing. Show the emotion through unique \
             character-specific actions, internal thoughts, or dialogue.",
        ),
        (
            "transition",
            "These transitional phrases often indicate skipped time or summarized \
             action. Consider whether you can show the transition through scene \
             structure instead of telling the reader.",
        ),
        (
            "description",
            "Clichéd descriptions slide past readers without impact. Fresh, specific \
             descriptions create vivid imagery that readers remember.",
        ),
        (
            "action",
            "Many action clichés are redundant or generic. Strong verbs and specific \
             details create more vivid prose than common phrases.",
        ),
        (
            "emotion",
            "Emotional telling ('felt', 'couldn't help but') distances readers from \
             the experience. Show emotions through physical sensation, action, \
             dialogue, and internal thought.",
        ),
        (
            "time",
            "These time-related phrases tell readers how to feel about pacing rather \
             than letting the prose create that feeling. Trust your scene structure.",
        ),
    ])
});

static PHRASE_RES: Lazy<Vec<(usize, Regex)>> = Lazy::new(|| {
    OVERUSED_PHRASES
        .iter()
        .enumerate()
        .map(|(i, (phrase, _, _))| {
            let re = Regex::new(&format!(r"(?i){}", regex::escape(phrase))).expect("phrase regex");
            (i, re)
        })
        .collect()
});

/// Analyze text for overused phrases, reporting at most [`MAX_ISSUES`].
pub fn analyze(text: &str) -> Vec<Suggestion> {
    if text.trim().len() < MIN_TEXT_LEN {
        return Vec::new();
    }

    let mut suggestions = Vec::new();

    'phrases: for (i, re) in PHRASE_RES.iter() {
        let (phrase, alternative, category) = OVERUSED_PHRASES[*i];
        let mut occurrence = 0usize;

        for m in re.find_iter(text) {
            occurrence += 1;
            if occurrence > MAX_OCCURRENCES_PER_PHRASE {
                break;
            }

            let original = m.as_str().to_string();
            suggestions.push(
                Suggestion::new(
                    SuggestionType::OverusedPhrase,
                    Severity::Info,
                    format!("Overused phrase: '{original}'"),
                    alternative,
                )
                .at(m.start(), m.end())
                .highlight(original)
                .meta("phrase", json!(phrase))
                .meta("category", json!(category))
                .meta("occurrence", json!(occurrence))
                .meta(
                    "teaching_point",
                    json!(CATEGORY_TEACHING.get(category).copied().unwrap_or(
                        "Fresh language makes your prose more memorable than familiar phrases."
                    )),
                ),
            );

            if suggestions.len() >= MAX_ISSUES {
                break 'phrases;
            }
        }
    }

    // Position order for editor highlighting.
    suggestions.sort_by_key(|s| s.start_char.unwrap_or(0));
    suggestions
        .into_iter()
        .map(|s| s.with_confidence(ANALYZER_CONFIDENCE))
        .collect()
}

/// Count of phrases per category (used by the dashboard).
pub fn phrase_categories() -> HashMap<&'static str, usize> {
    let mut categories = HashMap::new();
    for (_, _, category) in OVERUSED_PHRASES {
        *categories.entry(*category).or_insert(0) += 1;
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_detected_with_original_casing() {
        let text = "She Took A Deep Breath and stepped onto the ice before anyone could speak.";
        let suggestions = analyze(text);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(
            suggestions[0].highlight_word.as_deref(),
            Some("Took A Deep Breath")
        );
        assert_eq!(
            suggestions[0].metadata.get("category"),
            Some(&json!("physical_reaction"))
        );
    }

    #[test]
    fn test_only_first_two_occurrences_reported() {
        let text = "His heart pounded at the gate. His heart pounded on the stairs. \
                    His heart pounded at the door. His heart pounded in the hall.";
        let suggestions = analyze(text);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].metadata.get("occurrence"), Some(&json!(1)));
        assert_eq!(suggestions[1].metadata.get("occurrence"), Some(&json!(2)));
    }

    #[test]
    fn test_output_capped() {
        let mut text = String::new();
        for _ in 0..15 {
            text.push_str("She took a deep breath. His heart pounded. She bit her lip. ");
        }
        let suggestions = analyze(&text);
        assert!(suggestions.len() <= MAX_ISSUES);
    }

    #[test]
    fn test_sorted_by_offset() {
        let text = "Time stood still for a moment. Then she took a deep breath and went in, \
                    and her heart pounded the whole way down.";
        let suggestions = analyze(text);
        let offsets: Vec<usize> = suggestions.iter().filter_map(|s| s.start_char).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
        assert!(suggestions.len() >= 3);
    }

    #[test]
    fn test_teaching_point_attached() {
        let text = "All of a sudden the bridge gave way beneath the wagon's rear wheels.";
        let suggestions = analyze(text);
        assert_eq!(suggestions.len(), 1);
        let tp = suggestions[0].metadata.get("teaching_point").unwrap();
        assert!(tp.as_str().unwrap().contains("transition"));
    }

    #[test]
    fn test_database_covers_all_categories() {
        let categories = phrase_categories();
        for expected in ["physical_reaction", "transition", "description", "action", "emotion", "time"] {
            assert!(categories.contains_key(expected), "missing {expected}");
        }
        assert!(OVERUSED_PHRASES.len() >= 110);
    }
}
