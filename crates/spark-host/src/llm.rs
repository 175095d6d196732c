//! Completion call
//!
//! [`LlmService`] is the seam every consumer goes through. [`HttpLlm`] talks
//! to any OpenAI-compatible `chat/completions` endpoint.

use crate::error::HostError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model used when the caller does not pick one
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Completion service
///
/// Used as `Arc<dyn LlmService>`.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Complete `prompt` with `model`
    ///
    /// With `json_mode` the model is asked to answer with a single JSON
    /// object. No retries are attempted.
    async fn complete(
        &self,
        prompt: &Prompt,
        model: &str,
        json_mode: bool,
    ) -> Result<String, HostError>;
}

/// Completion endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Full URL of the `chat/completions` endpoint
    pub endpoint: String,
    /// Default model identifier
    pub model: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// With default model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://models.github.ai/inference/chat/completions".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "SPARK_LLM_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// HTTP completion client
#[derive(Debug, Clone)]
pub struct HttpLlm {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpLlm {
    /// Create client from configuration, reading the token from the environment
    ///
    /// # Errors
    /// `HostError::Request` if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::debug!(var = %config.api_key_env, "no completion api key in environment");
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }

    /// With explicit bearer token
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Endpoint URL
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmService for HttpLlm {
    async fn complete(
        &self,
        prompt: &Prompt,
        model: &str,
        json_mode: bool,
    ) -> Result<String, HostError> {
        let body = request_body(prompt, model, json_mode);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(model, json_mode, chars = prompt.as_str().len(), "requesting completion");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        first_choice(parsed)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn request_body<'a>(prompt: &'a Prompt, model: &'a str, json_mode: bool) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt.as_str(),
        }],
        response_format: json_mode.then_some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

fn first_choice(response: ChatResponse) -> Result<String, HostError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| HostError::MalformedResponse("response has no message content".to_string()))
}
