//! Character voice profiling.
//!
//! Builds per-character voice metrics from attributed dialogue, detects
//! deviations from the established profile, and compares two characters for
//! distinctiveness.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::connection::PlumeDb;
use crate::models::manuscript::list_chapters;
use crate::models::voice::{
    create_voice_inconsistency, get_profile, list_voice_inconsistencies, upsert_profile,
    VoiceInconsistencyCreate, VoiceMetrics, VoiceProfile, VoiceProfileCreate,
};
use crate::models::{entity, record_key, EntityType};
use crate::patterns::{
    CONTRACTIONS, FILLER_WORDS, FORMAL_INDICATORS, INFORMAL_INDICATORS, NEGATIVE_EMOTIONS,
    PHRASE_STOP_WORDS, POSITIVE_EMOTIONS, SIGNATURE_STOP_WORDS,
};
use crate::text::{syllables_in_word, tokenize_words};
use crate::PlumeError;

/// Profiles below this confidence are too thin for deviation detection.
const MIN_PROFILE_CONFIDENCE: f64 = 0.3;
/// Samples needed for full confidence.
const FULL_CONFIDENCE_SAMPLES: f64 = 20.0;
const MIN_DIALOGUE_CHARS: usize = 5;
const CONTEXT_WINDOW: usize = 50;

const SENTENCE_LENGTH_HIGH: f64 = 2.0;
const SENTENCE_LENGTH_LOW: f64 = 0.5;
const FORMALITY_DELTA: f64 = 0.4;
const VOCABULARY_DELTA: f64 = 0.5;

/// One piece of dialogue attributed to a character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSample {
    pub text: String,
    pub chapter_id: String,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Surrounding prose, ±50 chars.
    pub context: String,
}

/// Similarity report between two character voices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceComparison {
    pub character_a_id: String,
    pub character_b_id: String,
    pub character_a_name: String,
    pub character_b_name: String,
    pub overall_similarity: f64,
    pub vocabulary_similarity: f64,
    pub structure_similarity: f64,
    pub formality_similarity: f64,
    pub distinguishing_features_a: Vec<String>,
    pub distinguishing_features_b: Vec<String>,
    pub shared_traits: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Per-character row in the manuscript voice summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSummaryRow {
    pub character_id: String,
    pub character_name: String,
    pub has_profile: bool,
    pub confidence: f64,
    pub dialogue_samples: usize,
}

/// Manuscript-wide voice dashboard data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSummary {
    pub characters: Vec<VoiceSummaryRow>,
    pub total_characters: usize,
    pub open_inconsistencies: usize,
}

fn char_floor(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn char_ceil(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Name variants used for attribution matching: the canonical name, every
/// alias, and the first word of a multi-word name.
pub fn name_variants(name: &str, aliases: &[String]) -> Vec<String> {
    let mut variants = vec![name.to_lowercase()];
    for alias in aliases {
        variants.push(alias.to_lowercase());
    }
    if let Some(first) = name.split_whitespace().next() {
        let first = first.to_lowercase();
        if !variants.contains(&first) {
            variants.push(first);
        }
    }
    variants
}

/// Extract dialogue attributed to a character from one chapter's text.
///
/// Matches `"…," Name verb` (attribution after) and `Name verb, "…"`
/// (attribution before). Dialogue of five characters or fewer is skipped.
pub fn extract_attributed_dialogue(
    text: &str,
    chapter_id: &str,
    variants: &[String],
) -> Vec<DialogueSample> {
    if variants.is_empty() {
        return Vec::new();
    }
    let names = variants
        .iter()
        .map(|v| regex::escape(v))
        .collect::<Vec<_>>()
        .join("|");

    let after_re = Regex::new(&format!(
        r#"(?i)["\u{{201C}}]([^"\u{{201C}}\u{{201D}}]+)["\u{{201D}}][,.]?\s*({names})\s+\w+"#
    ))
    .expect("attribution-after regex");
    let before_re = Regex::new(&format!(
        r#"(?i)\b({names})\s+\w+,?\s*["\u{{201C}}]([^"\u{{201C}}\u{{201D}}]+)["\u{{201D}}]"#
    ))
    .expect("attribution-before regex");

    let mut samples = Vec::new();

    for (re, group) in [(&after_re, 1usize), (&before_re, 2usize)] {
        for caps in re.captures_iter(text) {
            let Some(dialogue) = caps.get(group) else {
                continue;
            };
            let content = dialogue.as_str().trim();
            if content.len() <= MIN_DIALOGUE_CHARS {
                continue;
            }
            let whole = caps.get(0).expect("match");
            let ctx_start = char_floor(text, whole.start().saturating_sub(CONTEXT_WINDOW));
            let ctx_end = char_ceil(text, (whole.end() + CONTEXT_WINDOW).min(text.len()));
            samples.push(DialogueSample {
                text: content.to_string(),
                chapter_id: chapter_id.to_string(),
                start_offset: whole.start(),
                end_offset: whole.end(),
                context: text[ctx_start..ctx_end].to_string(),
            });
        }
    }

    samples
}

/// Compute voice metrics from dialogue samples.
pub fn compute_voice_metrics(samples: &[DialogueSample]) -> VoiceMetrics {
    let mut metrics = VoiceMetrics {
        dialogue_samples: samples.len(),
        formality_score: 0.5,
        ..VoiceMetrics::default()
    };
    if samples.is_empty() {
        metrics.emotion_markers =
            HashMap::from([("positive".into(), 0.0), ("negative".into(), 0.0), ("neutral".into(), 1.0)]);
        return metrics;
    }

    let all_text = samples
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let all_text_lower = all_text.to_lowercase();
    let all_words: Vec<String> = tokenize_words(&all_text_lower);
    metrics.total_words = all_words.len();
    if all_words.is_empty() {
        metrics.emotion_markers =
            HashMap::from([("positive".into(), 0.0), ("negative".into(), 0.0), ("neutral".into(), 1.0)]);
        return metrics;
    }

    // Sentence structure.
    let mut sentences: Vec<&str> = Vec::new();
    for sample in samples {
        sentences.extend(
            sample
                .text
                .split(['.', '!', '?'])
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        );
    }
    if !sentences.is_empty() {
        let lengths: Vec<f64> = sentences
            .iter()
            .map(|s| s.split_whitespace().count() as f64)
            .collect();
        let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
        metrics.avg_sentence_length = mean;
        let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;
        metrics.sentence_length_variance = variance.sqrt();

        let questions = all_text.matches('?').count();
        metrics.question_rate = questions as f64 / sentences.len() as f64;
        let exclaiming = samples.iter().filter(|s| s.text.contains('!')).count();
        metrics.exclamation_rate = exclaiming as f64 / samples.len() as f64;
    }

    // Vocabulary.
    let total_syllables: usize = all_words.iter().map(|w| syllables_in_word(w)).sum();
    metrics.vocabulary_complexity = total_syllables as f64 / all_words.len() as f64;
    let unique: HashSet<&str> = all_words.iter().map(|w| w.as_str()).collect();
    metrics.vocabulary_richness = unique.len() as f64 / all_words.len() as f64;

    let contractions_used = all_words
        .iter()
        .filter(|w| CONTRACTIONS.contains(&w.as_str()))
        .count();
    metrics.contraction_rate = contractions_used as f64 / all_words.len() as f64;

    // Filler words (multiword fillers counted as phrases).
    for filler in FILLER_WORDS {
        let re = Regex::new(&format!(r"\b{}\b", regex::escape(filler))).expect("filler regex");
        let count = re.find_iter(&all_text_lower).count();
        if count > 0 {
            metrics.filler_words.insert(filler.to_string(), count);
        }
    }

    // Formality.
    let formal = all_words
        .iter()
        .filter(|w| FORMAL_INDICATORS.contains(&w.as_str()))
        .count();
    let mut informal = all_words
        .iter()
        .filter(|w| INFORMAL_INDICATORS.contains(&w.as_str()))
        .count();
    informal += contractions_used;
    informal += metrics.filler_words.values().sum::<usize>();
    let markers = formal + informal;
    metrics.formality_score = if markers > 0 {
        formal as f64 / markers as f64
    } else {
        0.5
    };

    // Common phrases (2-4 word n-grams seen more than once, with at least
    // one non-stop word).
    let ws_words: Vec<&str> = all_text_lower.split_whitespace().collect();
    let mut phrase_counts: HashMap<String, usize> = HashMap::new();
    for n in 2..=4usize {
        if ws_words.len() < n {
            break;
        }
        for window in ws_words.windows(n) {
            if window.iter().all(|w| PHRASE_STOP_WORDS.contains(w)) {
                continue;
            }
            *phrase_counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    let mut phrases: Vec<(String, usize)> = phrase_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    phrases.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    phrases.truncate(20);
    metrics.common_phrases = phrases;

    // Signature words: well above the character's mean word frequency.
    let mut word_counts: HashMap<&str, usize> = HashMap::new();
    for word in &all_words {
        *word_counts.entry(word.as_str()).or_insert(0) += 1;
    }
    let avg_count = all_words.len() as f64 / unique.len() as f64;
    let mut signature: Vec<(&str, usize)> = word_counts
        .into_iter()
        .filter(|(word, count)| {
            *count as f64 > avg_count * 2.0
                && word.len() > 3
                && !SIGNATURE_STOP_WORDS.contains(word)
        })
        .collect();
    signature.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    metrics.signature_words = signature
        .into_iter()
        .take(15)
        .map(|(word, _)| word.to_string())
        .collect();

    // Emotion markers.
    let positive = all_words
        .iter()
        .filter(|w| POSITIVE_EMOTIONS.contains(&w.as_str()))
        .count();
    let negative = all_words
        .iter()
        .filter(|w| NEGATIVE_EMOTIONS.contains(&w.as_str()))
        .count();
    let total_emotion = positive + negative;
    metrics.emotion_markers = if total_emotion > 0 {
        HashMap::from([
            ("positive".to_string(), positive as f64 / total_emotion as f64),
            ("negative".to_string(), negative as f64 / total_emotion as f64),
            (
                "neutral".to_string(),
                1.0 - (positive + negative) as f64 / all_words.len() as f64,
            ),
        ])
    } else {
        HashMap::from([
            ("positive".to_string(), 0.0),
            ("negative".to_string(), 0.0),
            ("neutral".to_string(), 1.0),
        ])
    };

    metrics
}

/// Per-axis similarity: `max(0, 1 - |a-b| / max_diff)`.
pub fn similarity(a: f64, b: f64, max_diff: f64) -> f64 {
    (1.0 - (a - b).abs() / max_diff).max(0.0)
}

/// Voice analysis service over the knowledge store.
pub struct VoiceAnalysisService;

impl VoiceAnalysisService {
    /// Extract all dialogue attributed to a character across a manuscript.
    pub async fn extract_character_dialogue(
        db: &PlumeDb,
        manuscript_id: &str,
        character_id: &str,
    ) -> Result<Vec<DialogueSample>, PlumeError> {
        let Some(character) = entity::get_entity(db, character_id).await? else {
            return Ok(Vec::new());
        };
        let variants = name_variants(&character.name, &character.aliases);

        let mut samples = Vec::new();
        for chapter in list_chapters(db, manuscript_id).await? {
            if chapter.content.is_empty() {
                continue;
            }
            let key = record_key(&chapter.id);
            samples.extend(extract_attributed_dialogue(&chapter.content, &key, &variants));
        }
        Ok(samples)
    }

    /// Build (or rebuild) the voice profile for a character.
    pub async fn build_profile(
        db: &PlumeDb,
        manuscript_id: &str,
        character_id: &str,
        force_rebuild: bool,
    ) -> Result<VoiceProfile, PlumeError> {
        if !force_rebuild {
            if let Some(existing) = get_profile(db, manuscript_id, character_id).await? {
                return Ok(existing);
            }
        }

        let samples = Self::extract_character_dialogue(db, manuscript_id, character_id).await?;
        let metrics = compute_voice_metrics(&samples);
        let confidence = (samples.len() as f64 / FULL_CONFIDENCE_SAMPLES).min(1.0);

        info!(
            character_id,
            samples = samples.len(),
            confidence,
            "voice profile computed"
        );

        upsert_profile(
            db,
            VoiceProfileCreate {
                manuscript_id: manuscript_id.to_string(),
                character_id: character_id.to_string(),
                metrics,
                confidence_score: confidence,
            },
        )
        .await
    }

    /// Detect voice inconsistencies for a character, optionally restricted to
    /// one chapter. Detected issues are persisted and returned.
    pub async fn detect_inconsistencies(
        db: &PlumeDb,
        manuscript_id: &str,
        character_id: &str,
        chapter_id: Option<&str>,
    ) -> Result<Vec<crate::models::VoiceInconsistency>, PlumeError> {
        let profile = Self::build_profile(db, manuscript_id, character_id, false).await?;
        if profile.confidence_score < MIN_PROFILE_CONFIDENCE {
            return Ok(Vec::new());
        }

        let Some(character) = entity::get_entity(db, character_id).await? else {
            return Ok(Vec::new());
        };
        let variants = name_variants(&character.name, &character.aliases);

        let mut persisted = Vec::new();
        for chapter in list_chapters(db, manuscript_id).await? {
            let key = record_key(&chapter.id);
            if let Some(only) = chapter_id {
                if key != only {
                    continue;
                }
            }
            if chapter.content.is_empty() {
                continue;
            }

            for sample in extract_attributed_dialogue(&chapter.content, &key, &variants) {
                for create in
                    check_sample(&sample, &profile.metrics, &character.name, manuscript_id, character_id, &key)
                {
                    persisted.push(create_voice_inconsistency(db, create).await?);
                }
            }
        }

        Ok(persisted)
    }

    /// Compare two character voices for distinctiveness.
    pub async fn compare_voices(
        db: &PlumeDb,
        manuscript_id: &str,
        character_a_id: &str,
        character_b_id: &str,
    ) -> Result<VoiceComparison, PlumeError> {
        let profile_a = Self::build_profile(db, manuscript_id, character_a_id, false).await?;
        let profile_b = Self::build_profile(db, manuscript_id, character_b_id, false).await?;

        let name_a = entity::get_entity(db, character_a_id)
            .await?
            .map(|e| e.name)
            .unwrap_or_else(|| "Unknown".to_string());
        let name_b = entity::get_entity(db, character_b_id)
            .await?
            .map(|e| e.name)
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(compare_metrics(
            &profile_a.metrics,
            &profile_b.metrics,
            character_a_id,
            character_b_id,
            &name_a,
            &name_b,
        ))
    }

    /// Manuscript-wide voice dashboard summary.
    pub async fn manuscript_summary(
        db: &PlumeDb,
        manuscript_id: &str,
    ) -> Result<VoiceSummary, PlumeError> {
        let characters: Vec<_> = entity::list_entities(db, manuscript_id)
            .await?
            .into_iter()
            .filter(|e| e.entity_type == EntityType::Character)
            .collect();

        // Profile lookups are independent; fetch them in parallel.
        let lookups = characters.iter().map(|character| {
            let key = record_key(&character.id);
            let name = character.name.clone();
            async move {
                let profile = get_profile(db, manuscript_id, &key).await?;
                Ok::<VoiceSummaryRow, PlumeError>(VoiceSummaryRow {
                    character_id: key,
                    character_name: name,
                    has_profile: profile.is_some(),
                    confidence: profile.as_ref().map(|p| p.confidence_score).unwrap_or(0.0),
                    dialogue_samples: profile.map(|p| p.metrics.dialogue_samples).unwrap_or(0),
                })
            }
        });
        let rows = futures::future::try_join_all(lookups).await?;

        let open = list_voice_inconsistencies(db, manuscript_id).await?.len();
        Ok(VoiceSummary {
            total_characters: characters.len(),
            characters: rows,
            open_inconsistencies: open,
        })
    }
}

/// Check one dialogue sample against the established profile.
fn check_sample(
    sample: &DialogueSample,
    profile: &VoiceMetrics,
    character_name: &str,
    manuscript_id: &str,
    character_id: &str,
    chapter_id: &str,
) -> Vec<VoiceInconsistencyCreate> {
    let sample_metrics = compute_voice_metrics(std::slice::from_ref(sample));
    let excerpt: String = sample.text.chars().take(200).collect();
    let mut issues = Vec::new();

    let base = |inconsistency_type: &str, severity: &str| VoiceInconsistencyCreate {
        manuscript_id: manuscript_id.to_string(),
        character_id: character_id.to_string(),
        chapter_id: Some(chapter_id.to_string()),
        inconsistency_type: inconsistency_type.to_string(),
        severity: severity.to_string(),
        description: String::new(),
        dialogue_excerpt: excerpt.clone(),
        start_offset: sample.start_offset,
        end_offset: sample.end_offset,
        expected_value: String::new(),
        actual_value: String::new(),
        suggestion: String::new(),
        teaching_point: String::new(),
    };

    // Sentence length.
    if profile.avg_sentence_length > 0.0 {
        let expected = profile.avg_sentence_length;
        let actual = sample_metrics.avg_sentence_length;
        if actual > 0.0 && (actual > expected * SENTENCE_LENGTH_HIGH || actual < expected * SENTENCE_LENGTH_LOW)
        {
            let severity = if (actual - expected).abs() > expected {
                "medium"
            } else {
                "low"
            };
            let mut issue = base("SENTENCE_LENGTH", severity);
            issue.description = format!(
                "{character_name}'s dialogue has unusual sentence length. They typically \
                 use {expected:.1} words per sentence, but this passage averages {actual:.1}."
            );
            issue.expected_value = format!("{expected:.1} words/sentence");
            issue.actual_value = format!("{actual:.1} words/sentence");
            issue.suggestion = "Consider adjusting sentence length to match this character's \
                 established speech pattern, unless the change is intentional."
                .to_string();
            issue.teaching_point = "Sentence length is a key voice marker. Short, punchy \
                 sentences suggest urgency; longer ones suggest thoughtfulness. Consistency \
                 helps readers hear the character."
                .to_string();
            issues.push(issue);
        }
    }

    // Formality.
    {
        let expected = profile.formality_score;
        let actual = sample_metrics.formality_score;
        if (expected - actual).abs() > FORMALITY_DELTA {
            let direction = if actual > expected {
                "more formal"
            } else {
                "less formal"
            };
            let mut issue = base("FORMALITY", "medium");
            issue.description = format!(
                "{character_name}'s dialogue sounds {direction} than usual. Their typical \
                 formality is {:.0}%, but this passage is {:.0}%.",
                expected * 100.0,
                actual * 100.0
            );
            issue.expected_value = format!("{:.0}% formal", expected * 100.0);
            issue.actual_value = format!("{:.0}% formal", actual * 100.0);
            issue.suggestion = "Review whether this formality shift is intentional.".to_string();
            issue.teaching_point = "Formality level, contractions versus proper grammar, \
                 creates character voice. A character who normally says 'gonna' suddenly \
                 saying 'going to' feels off unless motivated."
                .to_string();
            issues.push(issue);
        }
    }

    // Vocabulary complexity.
    if profile.vocabulary_complexity > 0.0 {
        let expected = profile.vocabulary_complexity;
        let actual = sample_metrics.vocabulary_complexity;
        if (expected - actual).abs() > VOCABULARY_DELTA {
            let direction = if actual < expected { "simpler" } else { "more complex" };
            let mut issue = base("VOCABULARY", "low");
            issue.description =
                format!("{character_name}'s vocabulary seems {direction} than usual.");
            issue.expected_value = format!("~{expected:.1} syllables/word");
            issue.actual_value = format!("~{actual:.1} syllables/word");
            issue.suggestion = "Consider whether the vocabulary matches this character's \
                 education level and typical speech patterns."
                .to_string();
            issue.teaching_point = "Vocabulary complexity reflects character background. A \
                 scholar uses different words than a street kid."
                .to_string();
            issues.push(issue);
        }
    }

    issues
}

/// Pure comparison over two metric sets.
pub fn compare_metrics(
    a: &VoiceMetrics,
    b: &VoiceMetrics,
    a_id: &str,
    b_id: &str,
    a_name: &str,
    b_name: &str,
) -> VoiceComparison {
    let vocab = similarity(a.vocabulary_complexity, b.vocabulary_complexity, 1.0);
    let structure = similarity(a.avg_sentence_length, b.avg_sentence_length, 10.0);
    let formality = similarity(a.formality_score, b.formality_score, 1.0);
    let overall = (vocab + structure + formality) / 3.0;

    let mut features_a = Vec::new();
    let mut features_b = Vec::new();
    let mut shared = Vec::new();

    if a.avg_sentence_length > b.avg_sentence_length + 3.0 {
        features_a.push("longer sentences".to_string());
        features_b.push("shorter sentences".to_string());
    } else if b.avg_sentence_length > a.avg_sentence_length + 3.0 {
        features_b.push("longer sentences".to_string());
        features_a.push("shorter sentences".to_string());
    } else {
        shared.push("similar sentence length".to_string());
    }

    if a.formality_score > b.formality_score + 0.2 {
        features_a.push("more formal speech".to_string());
        features_b.push("more casual speech".to_string());
    } else if b.formality_score > a.formality_score + 0.2 {
        features_b.push("more formal speech".to_string());
        features_a.push("more casual speech".to_string());
    }

    if a.contraction_rate > b.contraction_rate + 0.05 {
        features_a.push("uses more contractions".to_string());
    } else if b.contraction_rate > a.contraction_rate + 0.05 {
        features_b.push("uses more contractions".to_string());
    }

    if a.question_rate > b.question_rate + 0.1 {
        features_a.push("asks more questions".to_string());
    } else if b.question_rate > a.question_rate + 0.1 {
        features_b.push("asks more questions".to_string());
    }

    let sig_a: HashSet<&str> = a.signature_words.iter().map(|s| s.as_str()).collect();
    let sig_b: HashSet<&str> = b.signature_words.iter().map(|s| s.as_str()).collect();
    let mut unique_a: Vec<&&str> = sig_a.difference(&sig_b).collect();
    let mut unique_b: Vec<&&str> = sig_b.difference(&sig_a).collect();
    unique_a.sort();
    unique_b.sort();
    if !unique_a.is_empty() {
        let listed = unique_a.iter().take(3).map(|s| **s).collect::<Vec<_>>().join(", ");
        features_a.push(format!("distinctive words: {listed}"));
    }
    if !unique_b.is_empty() {
        let listed = unique_b.iter().take(3).map(|s| **s).collect::<Vec<_>>().join(", ");
        features_b.push(format!("distinctive words: {listed}"));
    }

    let mut recommendations = Vec::new();
    if overall > 0.8 {
        recommendations.push(format!(
            "Consider differentiating {a_name} and {b_name}'s voices more. They \
             currently sound quite similar."
        ));
        if (a.formality_score - b.formality_score).abs() < f64::EPSILON {
            recommendations.push("Try giving one character more formal speech patterns.".to_string());
        }
        if (a.avg_sentence_length - b.avg_sentence_length).abs() < f64::EPSILON {
            recommendations.push(
                "Vary sentence length: one could be more terse, the other more verbose."
                    .to_string(),
            );
        }
    }

    VoiceComparison {
        character_a_id: a_id.to_string(),
        character_b_id: b_id.to_string(),
        character_a_name: a_name.to_string(),
        character_b_name: b_name.to_string(),
        overall_similarity: overall,
        vocabulary_similarity: vocab,
        structure_similarity: structure,
        formality_similarity: formality,
        distinguishing_features_a: features_a,
        distinguishing_features_b: features_b,
        shared_traits: shared,
        recommendations,
    }
}
