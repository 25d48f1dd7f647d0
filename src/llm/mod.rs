//! LLM orchestrator.
//!
//! Talks to an OpenRouter-compatible chat-completions API (bring-your-own
//! key). Prompt construction lives in [`prompts`], response contracts in
//! [`schemas`], and the outline-analysis task functions in [`outline_ai`].
//! LLM calls are never interleaved with persistence writes: tasks parse the
//! full response first and leave mutation to their callers.

pub mod outline_ai;
pub mod prompts;
pub mod schemas;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PlumeError;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Per-model USD rates per million (prompt, completion) tokens.
/// Unknown models fall back to the default model's rates.
const MODEL_RATES: [(&str, f64, f64); 4] = [
    ("openai/gpt-4o-mini", 0.15, 0.60),
    ("openai/gpt-4o", 2.50, 10.00),
    ("anthropic/claude-3.5-sonnet", 3.00, 15.00),
    ("google/gemini-flash-1.5", 0.075, 0.30),
];

/// Token usage reported by the provider.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

/// A raw completion plus its usage accounting.
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Compute cost in USD from usage against the fixed rate table.
pub fn calculate_cost(model: &str, usage: TokenUsage) -> f64 {
    let (_, prompt_rate, completion_rate) = MODEL_RATES
        .iter()
        .find(|(name, ..)| *name == model)
        .or_else(|| MODEL_RATES.iter().find(|(name, ..)| *name == DEFAULT_MODEL))
        .copied()
        .unwrap_or(("", 0.5, 1.5));

    (usage.prompt_tokens as f64 * prompt_rate
        + usage.completion_tokens as f64 * completion_rate)
        / 1_000_000.0
}

/// Extract the JSON object from a completion that may carry leading or
/// trailing prose. Returns a typed `parse_error` when no object parses.
pub fn extract_json<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, PlumeError> {
    if let Ok(value) = serde_json::from_str::<T>(content.trim()) {
        return Ok(value);
    }

    let start = content.find('{');
    let end = content.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<T>(&content[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(PlumeError::llm(
        "parse_error",
        format!(
            "Response was not valid JSON for the expected schema: {}",
            content.chars().take(200).collect::<String>()
        ),
    ))
}

/// Client for an OpenRouter-compatible chat-completions API.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    pub fn with_endpoint(api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Reads `PLUME_LLM_API_KEY` (and optional `PLUME_LLM_BASE_URL`,
    /// `PLUME_LLM_MODEL`) from the environment.
    pub fn from_env() -> Result<Self, PlumeError> {
        let api_key = std::env::var("PLUME_LLM_API_KEY").map_err(|_| {
            PlumeError::llm("invalid_api_key", "PLUME_LLM_API_KEY is not set")
        })?;
        let base_url =
            std::env::var("PLUME_LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("PLUME_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::with_endpoint(&api_key, &base_url, &model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One JSON-mode chat completion with an explicit deadline.
    ///
    /// Error taxonomy: HTTP 402 → `insufficient_credits`, 401 →
    /// `invalid_api_key`, other non-2xx → `api_error_<code>`, network
    /// timeout → `timeout`.
    pub async fn chat_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<LlmCompletion, PlumeError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens,
            temperature,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlumeError::llm("timeout", format!("LLM call exceeded {timeout:?}"))
                } else {
                    PlumeError::llm("api_error_network", e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                402 => PlumeError::llm(
                    "insufficient_credits",
                    "The API key has insufficient credits. Add credits to continue \
                     using AI features.",
                ),
                401 => PlumeError::llm(
                    "invalid_api_key",
                    "The API key was rejected. Check the configured key.",
                ),
                code => PlumeError::llm(
                    format!("api_error_{code}"),
                    format!("Provider returned {status}: {body}"),
                ),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlumeError::llm("parse_error", e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PlumeError::llm("parse_error", "No choices in response"))?;
        let usage = parsed.usage.unwrap_or_default();

        debug!(
            model = %self.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "LLM completion received"
        );

        Ok(LlmCompletion { content, usage })
    }
}

// ============================================================================
// Wire types (OpenAI-compatible)
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
