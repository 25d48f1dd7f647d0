//! NLP adapter: named entities, sentences, and dependency parses over a
//! document.
//!
//! The local backend wraps a BERT token classifier (dslim/bert-base-NER,
//! BIO tagging) behind the [`NlpService`] trait. The model is loaded eagerly
//! with graceful degradation: when loading fails the service reports
//! unavailable and the extractor falls back to regex-only passes. The same
//! probe-and-branch contract covers parses: the token classifier carries no
//! parse tree, so it reports [`NlpService::dependencies_available`] false
//! and the extractor's dependency pass waits for a parser-backed service.

pub mod candle_backend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::EntityType;
use crate::nlp::candle_backend::{download_model, select_device, TokenClassifier};
use crate::PlumeError;

const NER_MODEL_REPO: &str = "dslim/bert-base-NER";

/// A named entity found in text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerSpan {
    pub text: String,
    /// Model label with BIO prefix stripped: PER, LOC, ORG, MISC
    /// (or an OntoNotes-style label when a richer backend is wired in).
    pub label: String,
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

/// One token of a dependency parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepToken {
    pub text: String,
    pub lemma: String,
    /// Universal POS tag (VERB, PROPN, NOUN, …).
    pub pos: String,
    /// Dependency relation to the head (nsubj, nsubjpass, dobj, pobj, …).
    pub dep: String,
    /// Index of the head token within the sentence.
    pub head: usize,
}

/// A dependency-parsed sentence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepSentence {
    pub text: String,
    pub tokens: Vec<DepToken>,
}

/// Map a NER label onto the codex entity taxonomy.
///
/// Covers both the BERT CoNLL label set (PER/LOC/ORG/MISC) and the richer
/// OntoNotes labels (PERSON/GPE/FAC/…) larger NER models emit.
pub fn map_ner_label(label: &str) -> Option<EntityType> {
    match label {
        "PER" | "PERSON" => Some(EntityType::Character),
        "LOC" | "GPE" | "FAC" => Some(EntityType::Location),
        "ORG" | "EVENT" => Some(EntityType::Lore),
        "MISC" | "PRODUCT" | "WORK_OF_ART" => Some(EntityType::Item),
        _ => None,
    }
}

/// Confidence assigned to a NER label class.
pub fn confidence_for_label(label: &str) -> f64 {
    match label {
        "PER" | "PERSON" => 0.9,
        "LOC" | "GPE" | "FAC" => 0.7,
        "ORG" | "MISC" | "PRODUCT" | "WORK_OF_ART" | "EVENT" => 0.5,
        _ => 0.3,
    }
}

/// Confidence for the heuristic proper-noun fallback pass.
pub const HEURISTIC_CONFIDENCE: f64 = 0.4;

/// Confidence for descriptive-pattern matches.
pub const DESCRIPTIVE_PATTERN_CONFIDENCE: f64 = 0.75;

/// Adapter trait over a document: named entities, sentences, and
/// dependency parses.
#[async_trait]
pub trait NlpService: Send + Sync {
    /// Extract named entities from text.
    async fn extract_entities(&self, text: &str) -> Result<Vec<NerSpan>, PlumeError>;

    /// Dependency-parse the text into sentences of tokens.
    ///
    /// Backends without a parser return an error; check
    /// [`NlpService::dependencies_available`] before calling.
    async fn dependencies(&self, text: &str) -> Result<Vec<DepSentence>, PlumeError>;

    /// Sentence segmentation over the document. The default delegates to the
    /// text primitives; parser-backed implementations may override with
    /// model boundaries.
    fn sentences(&self, text: &str) -> Vec<String> {
        crate::text::split_sentences(text)
    }

    /// Whether the NER model is loaded and available.
    fn is_available(&self) -> bool;

    /// Whether dependency-parse information is available. Extraction
    /// features that need a parse degrade (and are flagged disabled) when
    /// this is false, exactly as NER-based passes degrade via
    /// [`NlpService::is_available`].
    fn dependencies_available(&self) -> bool {
        false
    }
}

/// Local NER service using the candle BERT token classifier.
pub struct LocalNlpService {
    classifier: Option<Arc<TokenClassifier>>,
    available: bool,
}

impl LocalNlpService {
    /// Create a new local NLP service.
    ///
    /// Downloads and loads the BERT NER model eagerly. If model loading
    /// fails, the service will be unavailable but won't error (graceful
    /// degradation).
    pub fn new() -> Self {
        let files = match download_model(NER_MODEL_REPO, None) {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    "Failed to download NER model: {}. Entity extraction will run regex-only.",
                    e
                );
                return Self {
                    classifier: None,
                    available: false,
                };
            }
        };

        let device = select_device();

        match TokenClassifier::new(&files, device) {
            Ok(classifier) => {
                info!(
                    "NER classifier loaded ({}, {} labels via candle)",
                    NER_MODEL_REPO,
                    classifier.num_labels()
                );
                Self {
                    classifier: Some(Arc::new(classifier)),
                    available: true,
                }
            }
            Err(e) => {
                warn!(
                    "Failed to load NER model: {}. Entity extraction will run regex-only.",
                    e
                );
                Self {
                    classifier: None,
                    available: false,
                }
            }
        }
    }
}

impl Default for LocalNlpService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NlpService for LocalNlpService {
    async fn extract_entities(&self, text: &str) -> Result<Vec<NerSpan>, PlumeError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or_else(|| PlumeError::Database("NER model not loaded".to_string()))?
            .clone();

        let text_owned = text.to_string();

        let result = tokio::task::spawn_blocking(move || {
            let texts = vec![text_owned];
            classifier.extract_entities(&texts)
        })
        .await
        .map_err(|e| PlumeError::Database(format!("Task join error: {}", e)))?
        .map_err(|e| PlumeError::Database(format!("NER extraction error: {}", e)))?;

        let spans = result
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|s| NerSpan {
                text: s.text,
                label: s.label,
                score: s.score,
                start: s.start,
                end: s.end,
            })
            .collect();

        Ok(spans)
    }

    async fn dependencies(&self, _text: &str) -> Result<Vec<DepSentence>, PlumeError> {
        // The token-classification head carries no parse tree; callers see
        // dependencies_available() == false and skip this pass.
        Err(PlumeError::Database(
            "Dependency parsing is not provided by the token-classifier backend".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// ============================================================================
// No-op service (for tests / graceful degradation)
// ============================================================================

/// No-op NLP service for testing and degraded mode.
pub struct NoopNlpService;

impl Default for NoopNlpService {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopNlpService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NlpService for NoopNlpService {
    async fn extract_entities(&self, _text: &str) -> Result<Vec<NerSpan>, PlumeError> {
        Err(PlumeError::Database(
            "NLP service is not available (noop)".to_string(),
        ))
    }

    async fn dependencies(&self, _text: &str) -> Result<Vec<DepSentence>, PlumeError> {
        Err(PlumeError::Database(
            "NLP service is not available (noop)".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Shorthand for the no-op service, for tests and degraded wiring.
pub fn noop_nlp() -> Arc<dyn NlpService> {
    Arc::new(NoopNlpService)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_service_is_not_available() {
        let service = NoopNlpService::new();
        assert!(!service.is_available());
        assert!(!service.dependencies_available());
    }

    #[tokio::test]
    async fn test_noop_service_extract_returns_error() {
        let service = NoopNlpService::new();
        let result = service.extract_entities("some text").await;
        assert!(result.is_err());
        assert!(service.dependencies("some text").await.is_err());
    }

    #[test]
    fn test_default_sentence_segmentation() {
        let service = NoopNlpService::new();
        let sentences = service.sentences("One here. Two there.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(map_ner_label("PER"), Some(EntityType::Character));
        assert_eq!(map_ner_label("PERSON"), Some(EntityType::Character));
        assert_eq!(map_ner_label("GPE"), Some(EntityType::Location));
        assert_eq!(map_ner_label("LOC"), Some(EntityType::Location));
        assert_eq!(map_ner_label("ORG"), Some(EntityType::Lore));
        assert_eq!(map_ner_label("MISC"), Some(EntityType::Item));
        assert_eq!(map_ner_label("CARDINAL"), None);
    }

    #[test]
    fn test_label_confidence_tiers() {
        assert!(confidence_for_label("PER") > confidence_for_label("LOC"));
        assert!(confidence_for_label("LOC") > confidence_for_label("ORG"));
        assert!((confidence_for_label("PERSON") - 0.9).abs() < f64::EPSILON);
        assert!((confidence_for_label("UNKNOWN") - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_heuristic_confidence_below_pattern_confidence() {
        assert!(HEURISTIC_CONFIDENCE < DESCRIPTIVE_PATTERN_CONFIDENCE);
    }
}
