//! Answer synthesis via a hosted completion endpoint.
//!
//! The [`Synthesizer`] trait is the seam between the pipeline and the
//! model provider; [`OpenRouterSynthesizer`] is the production
//! implementation, calling the OpenRouter chat-completions API with
//! near-greedy decoding and a bounded output length. Every call is a
//! fresh remote invocation with no caching and no retry: retry policy
//! belongs to external orchestrators, not the core.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::SynthesisConfig;
use crate::error::RagError;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// A completion backend that turns a composed prompt into answer text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Model identifier, for display alongside answers.
    fn model_id(&self) -> &str;
    /// Send the prompt and return the generated text.
    async fn synthesize(&self, prompt: &str) -> Result<String, RagError>;
}

/// OpenRouter chat-completions client.
///
/// Requires `OPENROUTER_API_KEY` in the environment; its absence fails
/// construction with [`RagError::CredentialMissing`] so the pipeline never
/// reaches `Ready` unconfigured. The request timeout bounds how long one
/// `ask()` can hang on the remote call.
pub struct OpenRouterSynthesizer {
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenRouterSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Result<Self, RagError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| RagError::CredentialMissing("OPENROUTER_API_KEY"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Synthesis(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }
}

#[async_trait]
impl Synthesizer for OpenRouterSynthesizer {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn synthesize(&self, prompt: &str) -> Result<String, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Synthesis(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::Synthesis(format!(
                "OpenRouter API error {status}: {body_text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::Synthesis(format!("invalid response body: {e}")))?;

        extract_answer(&json)
    }
}

fn extract_answer(json: &serde_json::Value) -> Result<String, RagError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| RagError::Synthesis("response contained no completion text".to_string()))
}
