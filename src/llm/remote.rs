//! Remote generation backends.
//!
//! Each provider builds its own request payload, sends it through
//! [`with_retry`], and extracts the generated text from its own response
//! shape. Any failure becomes `"Error calling <Provider>: <details>"`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::retry::{send_json, with_retry, RetryPolicy};
use super::{GenerationProvider, GenerationRequest, ProviderKind};
use crate::config::LlmConfig;

/// Sentinel returned when Gemini answers without any candidate (usually a safety block).
pub const GEMINI_NO_CANDIDATES: &str =
    "Error: No candidates returned from Gemini (possible safety block).";
/// Sentinel returned when Gemini's first candidate has no content.
pub const GEMINI_EMPTY_CONTENT: &str = "Error: Empty content from Gemini.";

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn error_text(kind: ProviderKind, err: &anyhow::Error) -> String {
    format!("Error calling {}: {:#}", kind.display_name(), err)
}

/// Extract `choices[0].message.content` from an OpenAI-style chat completion.
fn parse_chat_completion(json: &Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid response: missing choices[0].message.content"))
}

// ============ OpenAI Provider ============

/// Provider using the OpenAI chat completions API.
pub struct OpenAiProvider {
    api_key: String,
    endpoint: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1/chat/completions";
    pub const DEFAULT_MODEL: &'static str = "gpt-3.5-turbo";

    pub fn new(api_key: impl Into<String>, settings: &LlmConfig) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            timeout: settings.timeout(),
            retry: RetryPolicy::from_config(settings),
        }
    }

    /// Point the provider at a different chat completions URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = http_client(self.timeout)?;
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.7,
        });

        let response = with_retry(&self.retry, "OpenAI", || {
            send_json(
                client
                    .post(&self.endpoint)
                    .bearer_auth(&self.api_key)
                    .json(&body),
            )
        })
        .await?;

        parse_chat_completion(&response)
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn generate(&self, request: &GenerationRequest) -> String {
        match self.complete(&request.prompt).await {
            Ok(text) => text,
            Err(e) => error_text(self.kind(), &e),
        }
    }
}

// ============ Anthropic Provider ============

/// Provider using the Anthropic messages API.
pub struct AnthropicProvider {
    api_key: String,
    endpoint: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl AnthropicProvider {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.anthropic.com/v1/messages";
    pub const DEFAULT_MODEL: &'static str = "claude-3-haiku-20240307";
    const API_VERSION: &'static str = "2023-06-01";
    const MAX_TOKENS: u32 = 1000;

    pub fn new(api_key: impl Into<String>, settings: &LlmConfig) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            timeout: settings.timeout(),
            retry: RetryPolicy::from_config(settings),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = http_client(self.timeout)?;
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": Self::MAX_TOKENS,
        });

        let response = with_retry(&self.retry, "Anthropic", || {
            send_json(
                client
                    .post(&self.endpoint)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", Self::API_VERSION)
                    .json(&body),
            )
        })
        .await?;

        parse_anthropic_response(&response)
    }
}

/// Extract `content[0].text` from a messages API response.
fn parse_anthropic_response(json: &Value) -> Result<String> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid response: missing content[0].text"))
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn generate(&self, request: &GenerationRequest) -> String {
        match self.complete(&request.prompt).await {
            Ok(text) => text,
            Err(e) => error_text(self.kind(), &e),
        }
    }
}

// ============ Gemini Provider ============

/// Provider using Google's Gemini `generateContent` endpoint.
pub struct GeminiProvider {
    api_key: String,
    endpoint: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeminiProvider {
    pub const DEFAULT_ENDPOINT: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

    pub fn new(api_key: impl Into<String>, settings: &LlmConfig) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            timeout: settings.timeout(),
            retry: RetryPolicy::from_config(settings),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = http_client(self.timeout)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = with_retry(&self.retry, "Gemini", || {
            send_json(
                client
                    .post(&self.endpoint)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body),
            )
        })
        .await?;

        parse_gemini_response(&response)
    }
}

/// Extract `candidates[0].content.parts[0].text`.
///
/// A response without candidates, or whose first candidate has no
/// content, is a policy outcome rather than a transport failure, so it
/// yields a sentinel text instead of an error.
fn parse_gemini_response(json: &Value) -> Result<String> {
    if !json.is_object() {
        return Err(anyhow!("Invalid response: expected a JSON object"));
    }

    let Some(candidate) = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
    else {
        return Ok(GEMINI_NO_CANDIDATES.to_string());
    };

    let content = candidate
        .get("content")
        .filter(|c| c.as_object().is_some_and(|o| !o.is_empty()));
    let Some(content) = content else {
        return Ok(GEMINI_EMPTY_CONTENT.to_string());
    };

    content
        .get("parts")
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid response: missing content.parts[0].text"))
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn generate(&self, request: &GenerationRequest) -> String {
        match self.complete(&request.prompt).await {
            Ok(text) => text,
            Err(e) => error_text(self.kind(), &e),
        }
    }
}

// ============ Ollama Provider ============

/// Provider using a local Ollama instance's OpenAI-compatible API.
///
/// `base_url` is the OpenAI-compatible root, e.g. `http://localhost:11434/v1`.
/// Requires Ollama to be running with the model pulled (`ollama pull llama3`).
pub struct OllamaProvider {
    base_url: String,
    model: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, settings: &LlmConfig) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            timeout: settings.timeout(),
            retry: RetryPolicy::from_config(settings),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = http_client(self.timeout)?;
        let url = self.endpoint();
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = with_retry(&self.retry, "Ollama", || {
            send_json(client.post(&url).json(&body))
        })
        .await
        .map_err(|e| anyhow!("{} (is Ollama running at {}?)", e, self.base_url))?;

        parse_chat_completion(&response)
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    async fn generate(&self, request: &GenerationRequest) -> String {
        match self.complete(&request.prompt).await {
            Ok(text) => text,
            Err(e) => error_text(self.kind(), &e),
        }
    }
}
