pub mod error;

pub use error::{NarrativeError, NarrativeResult};

use analysis_core::{AnalysisError, NarrativeGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the narrative service
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl NarrativeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `ANTHROPIC_API_KEY` is required; model, base URL and timeout fall back to defaults.
    pub fn from_env() -> NarrativeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> NarrativeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NarrativeError::MissingConfig("ANTHROPIC_API_KEY".to_string()))?;

        let timeout_secs = match lookup("ANTHROPIC_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                NarrativeError::MissingConfig(format!("ANTHROPIC_TIMEOUT_SECS: cannot parse '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            model: lookup("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("ANTHROPIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    config: NarrativeConfig,
}

impl AnthropicClient {
    pub fn new(config: NarrativeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a single user message and return the first text block of the reply
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> NarrativeResult<String> {
        let request = build_request(&self.config.model, prompt, max_tokens);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::ServiceUnavailable(format!("Status: {} {}", status, body)));
        }

        let result = response.json::<MessagesResponse>().await?;
        first_text(result)
    }
}

fn build_request<'a>(model: &'a str, prompt: &'a str, max_tokens: u32) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        max_tokens,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
    }
}

fn first_text(response: MessagesResponse) -> NarrativeResult<String> {
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| NarrativeError::InvalidResponse("no text block in reply".to_string()))
}

#[async_trait]
impl NarrativeGenerator for AnthropicClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, AnalysisError> {
        tracing::debug!("Requesting narrative from {} ({} max tokens)", self.config.model, max_tokens);
        let text = self.complete(prompt, max_tokens).await?;
        Ok(text)
    }
}
