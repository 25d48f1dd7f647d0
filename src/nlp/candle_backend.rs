//! Candle-based inference backend for the named-entity model.
//!
//! Pure-Rust ML runtime using candle with Metal/CUDA acceleration where
//! available. Provides [`TokenClassifier`] for BIO-tagged token
//! classification (BERT NER head).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{LayerNorm, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

/// Paths to downloaded model files from HuggingFace Hub.
pub struct ModelFiles {
    pub config_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub weights_path: PathBuf,
}

/// Download model files from HuggingFace Hub.
///
/// Uses `hf_hub::api::sync::Api` which caches at `~/.cache/huggingface/hub/`.
/// Performs synchronous I/O; call from `spawn_blocking` in async contexts.
pub fn download_model(repo_id: &str, _cache_dir: Option<&Path>) -> Result<ModelFiles> {
    let api = hf_hub::api::sync::Api::new().context("Failed to initialize HuggingFace Hub API")?;
    let repo = api.model(repo_id.to_string());

    let config_path = repo
        .get("config.json")
        .context("Failed to download config.json")?;
    let tokenizer_path = repo
        .get("tokenizer.json")
        .context("Failed to download tokenizer.json")?;
    let weights_path = repo
        .get("model.safetensors")
        .context("Failed to download model.safetensors")?;

    Ok(ModelFiles {
        config_path,
        tokenizer_path,
        weights_path,
    })
}

/// Select the best available compute device.
///
/// Tries Metal (macOS) or CUDA if the corresponding feature is enabled.
/// Probes layer-norm support since BERT requires it, falling back to CPU if
/// the GPU backend lacks the kernel.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            if probe_layer_norm(&device) {
                tracing::info!("Using Metal GPU for inference");
                return device;
            }
            tracing::warn!("Metal GPU available but layer-norm not supported, falling back to CPU");
        }
    }
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            if probe_layer_norm(&device) {
                tracing::info!("Using CUDA GPU for inference");
                return device;
            }
            tracing::warn!("CUDA GPU available but layer-norm not supported, falling back to CPU");
        }
    }
    tracing::info!("Using CPU for inference");
    Device::Cpu
}

/// Probe whether a device supports layer-norm (required by BERT).
#[allow(dead_code)]
fn probe_layer_norm(device: &Device) -> bool {
    (|| -> candle_core::Result<()> {
        let weight = Tensor::ones(4, DType::F32, device)?;
        let bias = Tensor::zeros(4, DType::F32, device)?;
        let ln = LayerNorm::new(weight, bias, 1e-5);
        let input = Tensor::randn(0f32, 1.0, (1, 4), device)?;
        let _ = ln.forward(&input)?;
        Ok(())
    })()
    .is_ok()
}

/// A raw entity span produced by BIO decoding.
#[derive(Debug, Clone)]
pub struct ClassifiedSpan {
    pub text: String,
    /// Entity tag with the B-/I- prefix stripped (PER, LOC, ORG, MISC).
    pub label: String,
    /// Mean softmax probability over the span's tokens.
    pub score: f32,
    pub start: usize,
    pub end: usize,
}

/// BERT token classifier for named-entity recognition.
///
/// Wraps a `BertModel` encoder plus the linear classification head, decoding
/// BIO tags into merged entity spans. Compatible with dslim/bert-base-NER
/// and similar checkpoints.
pub struct TokenClassifier {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    id2label: HashMap<u32, String>,
    device: Device,
}

impl TokenClassifier {
    /// Load a token-classification model from downloaded files.
    pub fn new(files: &ModelFiles, device: Device) -> Result<Self> {
        let config_str =
            std::fs::read_to_string(&files.config_path).context("Failed to read model config")?;
        let config: BertConfig =
            serde_json::from_str(&config_str).context("Failed to parse BERT config")?;

        // The label map lives outside the fields BertConfig models; pull it
        // from the raw JSON.
        let raw: serde_json::Value =
            serde_json::from_str(&config_str).context("Failed to parse config JSON")?;
        let id2label: HashMap<u32, String> = raw
            .get("id2label")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| {
                        Some((k.parse::<u32>().ok()?, v.as_str()?.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if id2label.is_empty() {
            anyhow::bail!("Model config has no id2label map; not a token classifier?");
        }

        let tokenizer = Tokenizer::from_file(&files.tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        // SAFETY: mmap'd safetensors file; safe as long as the file is not
        // modified while the model is in use.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&files.weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb.pp("bert"), &config)
            .context("Failed to construct BERT encoder")?;
        let classifier = candle_nn::linear(
            config.hidden_size,
            id2label.len(),
            vb.pp("classifier"),
        )
        .context("Failed to load classification head")?;

        Ok(Self {
            model,
            classifier,
            tokenizer,
            id2label,
            device,
        })
    }

    /// Number of BIO labels the head predicts.
    pub fn num_labels(&self) -> usize {
        self.id2label.len()
    }

    /// Extract entity spans from a batch of texts.
    ///
    /// Returns one list of spans per input text, with BIO tags merged into
    /// whole entities and offsets into the original text.
    pub fn extract_entities(&self, texts: &[String]) -> Result<Vec<Vec<ClassifiedSpan>>> {
        texts.iter().map(|text| self.classify_text(text)).collect()
    }

    fn classify_text(&self, text: &str) -> Result<Vec<ClassifiedSpan>> {
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let ids = encoding.get_ids().to_vec();
        let type_ids = encoding.get_type_ids().to_vec();
        let mask = encoding.get_attention_mask().to_vec();
        let offsets = encoding.get_offsets().to_vec();
        let seq_len = ids.len();
        if seq_len == 0 {
            return Ok(vec![]);
        }

        let input_ids = Tensor::from_vec(ids, (1, seq_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(type_ids, (1, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (1, seq_len), &self.device)?;

        // Forward pass -> [1, seq_len, hidden] -> [1, seq_len, num_labels]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;

        let preds = probs.argmax(D::Minus1)?.to_vec2::<u32>()?;
        let probs = probs.to_vec3::<f32>()?;

        let mut spans: Vec<ClassifiedSpan> = Vec::new();
        let mut current: Option<(String, usize, usize, Vec<f32>)> = None;

        for (i, &pred) in preds[0].iter().enumerate() {
            let (start, end) = offsets[i];
            // Special tokens ([CLS], [SEP], padding) carry empty offsets.
            let is_special = start == 0 && end == 0;
            let label = self
                .id2label
                .get(&pred)
                .map(|s| s.as_str())
                .unwrap_or("O");
            let score = probs[0][i].get(pred as usize).copied().unwrap_or(0.0);

            if is_special || label == "O" || start == end {
                if let Some(span) = current.take() {
                    spans.push(finish_span(text, span));
                }
                continue;
            }

            let (prefix, tag) = label.split_once('-').unwrap_or(("B", label));
            match current.as_mut() {
                Some((cur_tag, _, cur_end, scores)) if prefix == "I" && cur_tag == tag => {
                    *cur_end = end;
                    scores.push(score);
                }
                _ => {
                    if let Some(span) = current.take() {
                        spans.push(finish_span(text, span));
                    }
                    current = Some((tag.to_string(), start, end, vec![score]));
                }
            }
        }
        if let Some(span) = current.take() {
            spans.push(finish_span(text, span));
        }

        Ok(spans)
    }
}

fn finish_span(text: &str, (label, start, end, scores): (String, usize, usize, Vec<f32>)) -> ClassifiedSpan {
    let score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f32>() / scores.len() as f32
    };
    ClassifiedSpan {
        text: text.get(start..end).unwrap_or("").to_string(),
        label,
        score,
        start,
        end,
    }
}
