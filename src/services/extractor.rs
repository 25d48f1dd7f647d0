//! Entity extraction pipeline.
//!
//! Turns prose plus known-entity context into candidate entities,
//! relationships, descriptions, and world rules. Candidates only; nothing
//! here persists; wiki-bound consumers go through the proposed-change queue
//! and manuscript-bound consumers through the suggestion store.
//!
//! When the NER model is unavailable the pipeline degrades to the regex and
//! heuristic passes and records a diagnostic warning; it never raises.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{EntityType, RelationshipKind};
use crate::nlp::{
    confidence_for_label, map_ner_label, DepSentence, NlpService,
    DESCRIPTIVE_PATTERN_CONFIDENCE, HEURISTIC_CONFIDENCE,
};
use crate::patterns::{
    ALLIANCE_CUES, APPEARANCE_KEYWORDS, CHARACTER_CUES, CONFLICT_CUES, CREATURE_CUES,
    DESCRIPTIVE_LORE_PATTERNS, DESCRIPTIVE_STOP_LIST, FAMILY_CUES, ITEM_CUES,
    LOCATION_PREPOSITIONS, NAME_CONNECTORS, NAME_STOP_LIST, PERSONALITY_KEYWORDS,
    PROFESSIONAL_CUES, ROMANTIC_CUES, WORLD_RULE_PATTERNS,
};
use crate::text::{sentence_spans, word_spans};

/// Common sentence-opening words that a lone capitalized token should never
/// be promoted from.
const SENTENCE_OPENERS: [&str; 55] = [
    "there", "this", "that", "these", "those", "nothing", "everything", "something", "someone",
    "no", "yes", "when", "then", "now", "here", "suddenly", "perhaps", "maybe", "meanwhile",
    "later", "once", "still", "but", "and", "so", "if", "as", "after", "before", "while", "he",
    "she", "they", "it", "we", "you", "his", "her", "their", "my", "our", "some", "any", "each",
    "every", "in", "on", "at", "by", "for", "from", "with", "into", "over", "under",
];

/// An existing entity the extractor must not re-propose.
#[derive(Debug, Clone, Default)]
pub struct KnownEntity {
    pub id: Option<String>,
    pub name: String,
    pub aliases: Vec<String>,
}

impl KnownEntity {
    pub fn named(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            aliases: Vec::new(),
        }
    }
}

/// A proposed new entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub name: String,
    pub entity_type: EntityType,
    /// The sentence the candidate was found in.
    pub context: String,
    pub confidence: f64,
    pub description: Option<String>,
    #[serde(default)]
    pub extracted_attributes: HashMap<String, Vec<String>>,
}

/// A proposed relationship between two known entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipCandidate {
    pub source_name: String,
    pub target_name: String,
    pub rel_type: RelationshipKind,
    pub context: String,
    pub strength: i64,
}

/// A descriptive sentence about a known entity, bucketed by what it reveals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionCandidate {
    pub entity_name: String,
    /// One of: appearance, personality, background, actions.
    pub bucket: String,
    pub sentence: String,
}

/// An explicit world-rule statement found in prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldRuleCandidate {
    pub rule_kind: String,
    pub rule_text: String,
    pub sentence: String,
}

/// Full output of an extraction run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub candidates: Vec<EntityCandidate>,
    pub relationships: Vec<RelationshipCandidate>,
    pub descriptions: Vec<DescriptionCandidate>,
    pub rules: Vec<WorldRuleCandidate>,
    /// Diagnostics (e.g. degraded passes). Never fatal.
    pub warnings: Vec<String>,
    /// True when the dependency-based relationship pass could not run.
    pub dependency_pass_disabled: bool,
}

/// Rule- and NER-based entity extractor.
pub struct EntityExtractor {
    nlp: Arc<dyn NlpService>,
}

impl EntityExtractor {
    pub fn new(nlp: Arc<dyn NlpService>) -> Self {
        Self { nlp }
    }

    /// Run the full extraction pipeline over a text.
    ///
    /// Malformed or empty input yields an empty result; failures in the NER
    /// pass degrade to the heuristic passes with a warning.
    pub async fn extract(&self, text: &str, known: &[KnownEntity]) -> ExtractionResult {
        let mut result = ExtractionResult::default();
        if text.trim().is_empty() {
            return result;
        }

        let known_names = known_name_set(known);
        let mut seen_in_text: HashSet<String> = HashSet::new();
        let mut candidates: Vec<EntityCandidate> = Vec::new();

        // NER pass.
        if self.nlp.is_available() {
            match self.nlp.extract_entities(text).await {
                Ok(spans) => {
                    let sentences = sentence_spans(text);
                    for span in spans {
                        let Some(entity_type) = map_ner_label(&span.label) else {
                            continue;
                        };
                        let name = span.text.trim().to_string();
                        let name_lower = name.to_lowercase();
                        if name.len() <= 1
                            || known_names.contains(&name_lower)
                            || seen_in_text.contains(&name_lower)
                        {
                            continue;
                        }
                        let context = sentences
                            .iter()
                            .find(|s| s.start <= span.start && span.start < s.end)
                            .map(|s| s.text.clone())
                            .unwrap_or_default();
                        let description = extract_description(&name, &context);
                        let extracted_attributes = if entity_type == EntityType::Character {
                            extract_attributes(&context)
                        } else {
                            HashMap::new()
                        };
                        candidates.push(EntityCandidate {
                            name,
                            entity_type,
                            context,
                            confidence: confidence_for_label(&span.label),
                            description,
                            extracted_attributes,
                        });
                        seen_in_text.insert(name_lower);
                    }
                }
                Err(e) => {
                    result
                        .warnings
                        .push(format!("NER pass failed, continuing with rules only: {e}"));
                }
            }
        } else {
            result.warnings.push(
                "NLP model unavailable: entity extraction ran regex and heuristic passes only"
                    .to_string(),
            );
        }

        // Proper-noun grouping pass.
        candidates.extend(extract_proper_nouns(text, &known_names, &mut seen_in_text));

        // Descriptive-pattern pass (catches lowercase fictional terms).
        candidates.extend(extract_descriptive_entities(
            text,
            &known_names,
            &mut seen_in_text,
        ));

        // Partial-name filtering, then case-insensitive dedup.
        let candidates = filter_partial_names(candidates);
        let mut candidates = dedup_candidates(candidates);
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        result.candidates = candidates;

        // Relationship pass (a): sentence co-occurrence among known entities.
        result.relationships = extract_co_occurrences(text, known);

        // Relationship pass (b): verb subjects and objects from the
        // dependency parse, when the backend provides one.
        if self.nlp.dependencies_available() {
            match self.nlp.dependencies(text).await {
                Ok(sentences) => {
                    result
                        .relationships
                        .extend(extract_dependency_relationships(&sentences, known));
                }
                Err(e) => {
                    result
                        .warnings
                        .push(format!("Dependency pass failed, co-occurrence only: {e}"));
                    result.dependency_pass_disabled = true;
                }
            }
        } else {
            result.dependency_pass_disabled = true;
        }

        // Descriptions of known entities.
        result.descriptions = extract_known_descriptions(text, known);

        // World-rule statements.
        result.rules = extract_world_rules(text);

        debug!(
            candidates = result.candidates.len(),
            relationships = result.relationships.len(),
            rules = result.rules.len(),
            "extraction complete"
        );
        result
    }
}

fn known_name_set(known: &[KnownEntity]) -> HashSet<String> {
    let mut set = HashSet::new();
    for entity in known {
        set.insert(entity.name.to_lowercase());
        for alias in &entity.aliases {
            set.insert(alias.to_lowercase());
        }
    }
    set
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Group consecutive capitalized tokens into candidate names, crossing
/// connector words (`of`, `the`, `and`) only when another capitalized token
/// follows. Heuristic stand-in for a proper-noun tagger.
fn extract_proper_nouns(
    text: &str,
    known_names: &HashSet<String>,
    seen_in_text: &mut HashSet<String>,
) -> Vec<EntityCandidate> {
    let mut found = Vec::new();

    for sentence in sentence_spans(text) {
        let words = word_spans(&sentence.text);
        let mut i = 0;
        while i < words.len() {
            if !is_capitalized(&words[i].text) {
                i += 1;
                continue;
            }

            let mut parts = vec![words[i].text.clone()];
            let mut j = i + 1;
            while j < words.len() {
                let lower = words[j].text.to_lowercase();
                if is_capitalized(&words[j].text) {
                    parts.push(words[j].text.clone());
                    j += 1;
                } else if NAME_CONNECTORS.contains(&lower.as_str())
                    && j + 1 < words.len()
                    && is_capitalized(&words[j + 1].text)
                {
                    parts.push(words[j].text.clone());
                    j += 1;
                } else {
                    break;
                }
            }

            let name = parts.join(" ");
            let name_lower = name.to_lowercase();

            let sentence_initial_common = parts.len() == 1
                && i == 0
                && SENTENCE_OPENERS.contains(&name_lower.as_str());

            if name.len() > 1
                && !known_names.contains(&name_lower)
                && !seen_in_text.contains(&name_lower)
                && !NAME_STOP_LIST.contains(&name_lower.as_str())
                && !sentence_initial_common
            {
                let preceding = if i > 0 {
                    Some(words[i - 1].text.to_lowercase())
                } else {
                    None
                };
                if let Some(entity_type) = infer_type_from_context(&sentence.text, &name, preceding)
                {
                    found.push(EntityCandidate {
                        name,
                        entity_type,
                        context: sentence.text.clone(),
                        confidence: HEURISTIC_CONFIDENCE,
                        description: None,
                        extracted_attributes: HashMap::new(),
                    });
                    seen_in_text.insert(name_lower);
                }
            }

            i = j;
        }
    }

    found
}

/// Infer an entity type from the words around a candidate name.
fn infer_type_from_context(
    sentence: &str,
    name: &str,
    preceding_word: Option<String>,
) -> Option<EntityType> {
    let sent_lower = sentence.to_lowercase();
    let name_lower = name.to_lowercase();

    // Creature and lore cues take priority when they follow the name.
    if CREATURE_CUES.iter().any(|cue| sent_lower.contains(cue)) {
        let after = sent_lower
            .split_once(&name_lower)
            .map(|(_, rest)| rest.get(..100).unwrap_or(rest))
            .unwrap_or("");
        if CREATURE_CUES.iter().any(|cue| after.contains(cue)) {
            return Some(EntityType::Lore);
        }
    }

    if ITEM_CUES.iter().any(|cue| sent_lower.contains(cue)) {
        return Some(EntityType::Item);
    }

    if CHARACTER_CUES.iter().any(|cue| sent_lower.contains(cue)) {
        return Some(EntityType::Character);
    }

    if let Some(prev) = preceding_word {
        if LOCATION_PREPOSITIONS.contains(&prev.as_str()) {
            return Some(EntityType::Location);
        }
    }

    Some(EntityType::Character)
}

/// Promote lowercase terms matched by descriptive patterns to LORE
/// candidates; only kept when a description could be pulled from the
/// sentence.
fn extract_descriptive_entities(
    text: &str,
    known_names: &HashSet<String>,
    seen_in_text: &mut HashSet<String>,
) -> Vec<EntityCandidate> {
    let mut found = Vec::new();

    for sentence in sentence_spans(text) {
        for pattern in DESCRIPTIVE_LORE_PATTERNS.iter() {
            for caps in pattern.captures_iter(&sentence.text) {
                let Some(name_match) = caps.get(1) else {
                    continue;
                };
                let raw = name_match.as_str().trim();
                let name_lower = raw.to_lowercase();
                if known_names.contains(&name_lower)
                    || seen_in_text.contains(&name_lower)
                    || DESCRIPTIVE_STOP_LIST.contains(&name_lower.as_str())
                {
                    continue;
                }
                let Some(description) = extract_description(raw, &sentence.text) else {
                    continue;
                };
                found.push(EntityCandidate {
                    name: capitalize(raw),
                    entity_type: EntityType::Lore,
                    context: sentence.text.clone(),
                    confidence: DESCRIPTIVE_PATTERN_CONFIDENCE,
                    description: Some(description),
                    extracted_attributes: HashMap::new(),
                });
                seen_in_text.insert(name_lower);
            }
        }
    }

    found
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Pull a description from "X is/was …" phrasings in a sentence.
fn extract_description(name: &str, sentence: &str) -> Option<String> {
    let name_lower = name.to_lowercase();
    let sent_lower = sentence.to_lowercase();

    for verb in [" is ", " was "] {
        for prefix in ["the ", "an ", "a ", ""] {
            let pattern = format!("{prefix}{name_lower}{verb}");
            if let Some(idx) = sent_lower.find(&pattern) {
                let description = sentence[idx + pattern.len()..].trim();
                if description.len() > 3 {
                    return Some(capitalize(description));
                }
            }
        }
    }

    None
}

/// Bucketize appearance/personality keywords found in a context sentence.
/// Each bucket is capped at five entries.
fn extract_attributes(context: &str) -> HashMap<String, Vec<String>> {
    let mut attributes = HashMap::new();
    if context.len() < 10 {
        return attributes;
    }
    let context_lower = context.to_lowercase();

    let appearance: Vec<String> = APPEARANCE_KEYWORDS
        .iter()
        .filter(|kw| context_lower.contains(*kw))
        .take(5)
        .map(|kw| kw.to_string())
        .collect();
    let personality: Vec<String> = PERSONALITY_KEYWORDS
        .iter()
        .filter(|kw| context_lower.contains(*kw))
        .take(5)
        .map(|kw| kw.to_string())
        .collect();

    if !appearance.is_empty() {
        attributes.insert("appearance".to_string(), appearance);
    }
    if !personality.is_empty() {
        attributes.insert("personality".to_string(), personality);
    }
    attributes
}

/// Drop candidates whose name is wholly contained in a longer kept name,
/// either as a token subset or as a direct substring.
pub fn filter_partial_names(candidates: Vec<EntityCandidate>) -> Vec<EntityCandidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let mut sorted = candidates;
    sorted.sort_by(|a, b| b.name.len().cmp(&a.name.len()));

    let mut keep: Vec<EntityCandidate> = Vec::new();
    let mut kept_names: Vec<String> = Vec::new();

    for candidate in sorted {
        let name_lower = candidate.name.to_lowercase();
        let words: HashSet<&str> = name_lower.split_whitespace().collect();

        let is_partial = kept_names.iter().any(|kept| {
            let kept_words: HashSet<&str> = kept.split_whitespace().collect();
            (words.is_subset(&kept_words) && words.len() < kept_words.len())
                || (kept.contains(&name_lower) && *kept != name_lower)
        });

        if !is_partial {
            kept_names.push(name_lower);
            keep.push(candidate);
        }
    }

    keep
}

/// Fold case-insensitive duplicate candidates, keeping the highest
/// confidence version of each name.
pub fn dedup_candidates(candidates: Vec<EntityCandidate>) -> Vec<EntityCandidate> {
    let mut by_name: HashMap<String, EntityCandidate> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for candidate in candidates {
        let key = candidate.name.to_lowercase();
        match by_name.get(&key) {
            Some(existing) if existing.confidence >= candidate.confidence => {}
            Some(_) => {
                by_name.insert(key, candidate);
            }
            None => {
                order.push(key.clone());
                by_name.insert(key, candidate);
            }
        }
    }

    order.into_iter().filter_map(|k| by_name.remove(&k)).collect()
}

/// Find pairs of known entities sharing a sentence; relationship type is
/// inferred from keyword cues in that sentence.
pub fn extract_co_occurrences(text: &str, known: &[KnownEntity]) -> Vec<RelationshipCandidate> {
    let mut lookup: HashMap<String, &KnownEntity> = HashMap::new();
    for entity in known {
        lookup.insert(entity.name.to_lowercase(), entity);
        for alias in &entity.aliases {
            lookup.insert(alias.to_lowercase(), entity);
        }
    }
    if lookup.is_empty() {
        return Vec::new();
    }

    let mut relationships = Vec::new();

    for sentence in sentence_spans(text) {
        let mut mentioned: Vec<&KnownEntity> = Vec::new();
        let mut mentioned_names: HashSet<&str> = HashSet::new();
        for word in word_spans(&sentence.text) {
            if let Some(entity) = lookup.get(&word.text.to_lowercase()) {
                if mentioned_names.insert(entity.name.as_str()) {
                    mentioned.push(entity);
                }
            }
        }

        for (i, source) in mentioned.iter().enumerate() {
            for target in mentioned.iter().skip(i + 1) {
                if source.name == target.name {
                    continue;
                }
                relationships.push(RelationshipCandidate {
                    source_name: source.name.clone(),
                    target_name: target.name.clone(),
                    rel_type: infer_relationship_type(&sentence.text),
                    context: sentence.text.clone(),
                    strength: 1,
                });
            }
        }
    }

    relationships
}

/// Infer a relationship type from keyword cues in a sentence.
pub fn infer_relationship_type(context: &str) -> RelationshipKind {
    let context_lower = context.to_lowercase();
    let has = |cues: &[&str]| cues.iter().any(|cue| context_lower.contains(cue));

    if has(&ROMANTIC_CUES) {
        RelationshipKind::Romantic
    } else if has(&CONFLICT_CUES) {
        RelationshipKind::Conflict
    } else if has(&FAMILY_CUES) {
        RelationshipKind::Family
    } else if has(&PROFESSIONAL_CUES) {
        RelationshipKind::Professional
    } else if has(&ALLIANCE_CUES) {
        RelationshipKind::Alliance
    } else {
        RelationshipKind::Acquaintance
    }
}

/// Find relationships from the dependency parse: for each VERB, a
/// `nsubj`/`nsubjpass` child and a `dobj`/`pobj` child that are both known
/// entities yield a relationship typed by the verb lemma.
pub fn extract_dependency_relationships(
    sentences: &[DepSentence],
    known: &[KnownEntity],
) -> Vec<RelationshipCandidate> {
    let mut lookup: HashMap<String, &KnownEntity> = HashMap::new();
    for entity in known {
        lookup.insert(entity.name.to_lowercase(), entity);
        for alias in &entity.aliases {
            lookup.insert(alias.to_lowercase(), entity);
        }
    }
    if lookup.is_empty() {
        return Vec::new();
    }

    let mut relationships = Vec::new();

    for sentence in sentences {
        for (verb_index, verb) in sentence.tokens.iter().enumerate() {
            if verb.pos != "VERB" {
                continue;
            }

            let mut subject: Option<&KnownEntity> = None;
            let mut object: Option<&KnownEntity> = None;
            for child in sentence.tokens.iter().filter(|t| t.head == verb_index) {
                let entity = lookup.get(&child.text.to_lowercase());
                match child.dep.as_str() {
                    "nsubj" | "nsubjpass" => {
                        if let Some(entity) = entity {
                            subject = Some(entity);
                        }
                    }
                    "dobj" | "pobj" => {
                        if let Some(entity) = entity {
                            object = Some(entity);
                        }
                    }
                    _ => {}
                }
            }

            if let (Some(subject), Some(object)) = (subject, object) {
                if subject.name == object.name {
                    continue;
                }
                relationships.push(RelationshipCandidate {
                    source_name: subject.name.clone(),
                    target_name: object.name.clone(),
                    rel_type: infer_relationship_from_verb(&verb.lemma),
                    context: sentence.text.clone(),
                    strength: 1,
                });
            }
        }
    }

    relationships
}

/// Relationship type implied by a verb lemma.
pub fn infer_relationship_from_verb(lemma: &str) -> RelationshipKind {
    match lemma {
        "love" | "kiss" | "marry" => RelationshipKind::Romantic,
        "fight" | "attack" | "kill" => RelationshipKind::Conflict,
        "help" | "support" => RelationshipKind::Alliance,
        "work" => RelationshipKind::Professional,
        "meet" | "know" => RelationshipKind::Acquaintance,
        _ => RelationshipKind::Acquaintance,
    }
}

/// Bucket sentences describing known entities by what they reveal.
fn extract_known_descriptions(text: &str, known: &[KnownEntity]) -> Vec<DescriptionCandidate> {
    const BACKGROUND_CUES: [&str; 5] = ["born", "grew up", "raised", "used to", "had been"];
    const ACTION_CUES: [&str; 8] = [
        "walked", "ran", "fought", "climbed", "rode", "drew", "struck", "fled",
    ];

    let mut descriptions = Vec::new();

    for sentence in sentence_spans(text) {
        let sent_lower = sentence.text.to_lowercase();
        for entity in known {
            let name_lower = entity.name.to_lowercase();
            if !sent_lower.contains(&name_lower) {
                continue;
            }

            let bucket = if APPEARANCE_KEYWORDS.iter().any(|kw| sent_lower.contains(kw)) {
                Some("appearance")
            } else if PERSONALITY_KEYWORDS.iter().any(|kw| sent_lower.contains(kw)) {
                Some("personality")
            } else if BACKGROUND_CUES.iter().any(|kw| sent_lower.contains(kw)) {
                Some("background")
            } else if ACTION_CUES.iter().any(|kw| sent_lower.contains(kw)) {
                Some("actions")
            } else {
                None
            };

            if let Some(bucket) = bucket {
                descriptions.push(DescriptionCandidate {
                    entity_name: entity.name.clone(),
                    bucket: bucket.to_string(),
                    sentence: sentence.text.clone(),
                });
            }
        }
    }

    descriptions
}

/// Match explicit world-rule statements against the pattern catalog.
pub fn extract_world_rules(text: &str) -> Vec<WorldRuleCandidate> {
    let mut rules = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for sentence in sentence_spans(text) {
        for (pattern, kind) in WORLD_RULE_PATTERNS.iter() {
            if let Some(m) = pattern.find(&sentence.text) {
                let rule_text = m.as_str().trim().to_string();
                if seen.insert(rule_text.to_lowercase()) {
                    rules.push(WorldRuleCandidate {
                        rule_kind: kind.to_string(),
                        rule_text,
                        sentence: sentence.text.clone(),
                    });
                }
            }
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::{noop_nlp, DepToken, NerSpan};
    use crate::PlumeError;
    use async_trait::async_trait;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new(noop_nlp())
    }

    fn token(text: &str, lemma: &str, pos: &str, dep: &str, head: usize) -> DepToken {
        DepToken {
            text: text.to_string(),
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            dep: dep.to_string(),
            head,
        }
    }

    /// Parsed "Brann attacked Sera." with the verb as root.
    fn attacked_sentence() -> DepSentence {
        DepSentence {
            text: "Brann attacked Sera.".to_string(),
            tokens: vec![
                token("Brann", "brann", "PROPN", "nsubj", 1),
                token("attacked", "attack", "VERB", "ROOT", 1),
                token("Sera", "sera", "PROPN", "dobj", 1),
            ],
        }
    }

    /// Parser-backed stub: no NER, but dependency parses are available.
    struct ParsingStub;

    #[async_trait]
    impl NlpService for ParsingStub {
        async fn extract_entities(&self, _text: &str) -> Result<Vec<NerSpan>, PlumeError> {
            Err(PlumeError::Database("no NER in stub".to_string()))
        }

        async fn dependencies(&self, _text: &str) -> Result<Vec<DepSentence>, PlumeError> {
            Ok(vec![attacked_sentence()])
        }

        fn is_available(&self) -> bool {
            false
        }

        fn dependencies_available(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_partial_name_filtering_keeps_longest() {
        let text = "Farid Sa Garai Fol Jahan came to town. Garai Fol Jahan smiled.";
        let result = extractor().extract(text, &[]).await;

        let characters: Vec<_> = result
            .candidates
            .iter()
            .filter(|c| c.entity_type == EntityType::Character)
            .collect();
        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "Farid Sa Garai Fol Jahan");
    }

    #[tokio::test]
    async fn test_known_entities_are_not_reproposed() {
        let text = "Mira crossed the square.";
        let known = vec![KnownEntity::named("Mira")];
        let result = extractor().extract(text, &known).await;
        assert!(result.candidates.iter().all(|c| c.name != "Mira"));
    }

    #[tokio::test]
    async fn test_alias_lookup_is_case_insensitive() {
        let text = "MIRA crossed the square.";
        let known = vec![KnownEntity {
            id: None,
            name: "Lady Mirabel".to_string(),
            aliases: vec!["Mira".to_string()],
        }];
        let result = extractor().extract(text, &known).await;
        assert!(result.candidates.iter().all(|c| c.name.to_lowercase() != "mira"));
    }

    #[tokio::test]
    async fn test_descriptive_pattern_promotes_lowercase_lore() {
        let text = "The alhastra is a kind of arachnid that nests in dry wells.";
        let result = extractor().extract(text, &[]).await;

        let lore = result
            .candidates
            .iter()
            .find(|c| c.name == "Alhastra")
            .expect("alhastra candidate");
        assert_eq!(lore.entity_type, EntityType::Lore);
        assert!((lore.confidence - 0.75).abs() < f64::EPSILON);
        assert!(lore
            .description
            .as_deref()
            .is_some_and(|d| d.contains("kind of arachnid")));
    }

    #[tokio::test]
    async fn test_location_inferred_from_preposition() {
        let text = "The wagons arrived in Vask at dusk.";
        let result = extractor().extract(text, &[]).await;
        let vask = result
            .candidates
            .iter()
            .find(|c| c.name == "Vask")
            .expect("Vask candidate");
        assert_eq!(vask.entity_type, EntityType::Location);
    }

    #[tokio::test]
    async fn test_degraded_mode_sets_warning_and_dependency_flag() {
        let result = extractor().extract("Some text here.", &[]).await;
        assert!(result.dependency_pass_disabled);
        assert!(!result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let result = extractor().extract("   ", &[]).await;
        assert!(result.candidates.is_empty());
        assert!(result.relationships.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_co_occurrence_infers_conflict() {
        let known = vec![KnownEntity::named("Brann"), KnownEntity::named("Sera")];
        let rels = extract_co_occurrences("Brann tried to kill Sera at the ford.", &known);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, RelationshipKind::Conflict);
        assert_eq!(rels[0].source_name, "Brann");
        assert_eq!(rels[0].target_name, "Sera");
        assert_eq!(rels[0].strength, 1);
    }

    #[test]
    fn test_co_occurrence_defaults_to_acquaintance() {
        let known = vec![KnownEntity::named("Brann"), KnownEntity::named("Sera")];
        let rels = extract_co_occurrences("Brann nodded at Sera across the room.", &known);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, RelationshipKind::Acquaintance);
    }

    #[test]
    fn test_dependency_pass_types_by_verb_lemma() {
        let known = vec![KnownEntity::named("Brann"), KnownEntity::named("Sera")];
        let rels = extract_dependency_relationships(&[attacked_sentence()], &known);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source_name, "Brann");
        assert_eq!(rels[0].target_name, "Sera");
        assert_eq!(rels[0].rel_type, RelationshipKind::Conflict);
        assert_eq!(rels[0].context, "Brann attacked Sera.");
    }

    #[test]
    fn test_dependency_pass_ignores_unknown_participants() {
        let known = vec![KnownEntity::named("Brann")];
        let rels = extract_dependency_relationships(&[attacked_sentence()], &known);
        assert!(rels.is_empty());
    }

    #[test]
    fn test_dependency_pass_matches_aliases() {
        let known = vec![
            KnownEntity {
                id: None,
                name: "Brann of the Marsh".to_string(),
                aliases: vec!["Brann".to_string()],
            },
            KnownEntity::named("Sera"),
        ];
        let rels = extract_dependency_relationships(&[attacked_sentence()], &known);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source_name, "Brann of the Marsh");
    }

    #[test]
    fn test_verb_lemma_mapping() {
        assert_eq!(infer_relationship_from_verb("kiss"), RelationshipKind::Romantic);
        assert_eq!(infer_relationship_from_verb("kill"), RelationshipKind::Conflict);
        assert_eq!(infer_relationship_from_verb("support"), RelationshipKind::Alliance);
        assert_eq!(infer_relationship_from_verb("work"), RelationshipKind::Professional);
        assert_eq!(infer_relationship_from_verb("ponder"), RelationshipKind::Acquaintance);
    }

    #[tokio::test]
    async fn test_dependency_pass_runs_when_parser_available() {
        let known = vec![KnownEntity::named("Brann"), KnownEntity::named("Sera")];
        let extractor = EntityExtractor::new(std::sync::Arc::new(ParsingStub));
        let result = extractor.extract("Brann attacked Sera.", &known).await;

        assert!(!result.dependency_pass_disabled);
        assert!(result
            .relationships
            .iter()
            .any(|r| r.rel_type == RelationshipKind::Conflict));
    }

    #[test]
    fn test_relationship_type_cues() {
        assert_eq!(
            infer_relationship_type("She could not stop thinking of the kiss."),
            RelationshipKind::Romantic
        );
        assert_eq!(
            infer_relationship_type("Her mother would not approve."),
            RelationshipKind::Family
        );
        assert_eq!(
            infer_relationship_type("They work the same shift at the mill."),
            RelationshipKind::Professional
        );
    }

    #[test]
    fn test_world_rule_extraction() {
        let text = "In this world, iron burns the fae. It is forbidden to speak the old names.";
        let rules = extract_world_rules(text);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule_kind, "declaration");
        assert_eq!(rules[1].rule_kind, "prohibition");
    }

    #[test]
    fn test_dedup_keeps_highest_confidence() {
        let make = |name: &str, confidence: f64| EntityCandidate {
            name: name.to_string(),
            entity_type: EntityType::Character,
            context: String::new(),
            confidence,
            description: None,
            extracted_attributes: HashMap::new(),
        };
        let deduped = dedup_candidates(vec![make("Mira", 0.4), make("mira", 0.9)]);
        assert_eq!(deduped.len(), 1);
        assert!((deduped[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_filter_partial_names_substring() {
        let make = |name: &str| EntityCandidate {
            name: name.to_string(),
            entity_type: EntityType::Character,
            context: String::new(),
            confidence: 0.4,
            description: None,
            extracted_attributes: HashMap::new(),
        };
        let kept = filter_partial_names(vec![make("Piggy Bob"), make("Piggy"), make("Bob")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Piggy Bob");
    }

    #[tokio::test]
    async fn test_description_buckets_for_known_entities() {
        let known = vec![KnownEntity::named("Brann")];
        let text = "Brann was tall and his beard was going silver. Brann grew up in the marshes.";
        let result = extractor().extract(text, &known).await;
        let buckets: Vec<&str> = result.descriptions.iter().map(|d| d.bucket.as_str()).collect();
        assert!(buckets.contains(&"appearance"));
        assert!(buckets.contains(&"background"));
    }
}
