//! LLM API client abstraction for OpenAI-compatible, Anthropic and Ollama backends.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client as OpenAIClient,
};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Upper bound on a completion request sent through `reqwest`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the Ollama availability check.
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// LLM provider selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProvider {
    /// OpenAI chat completions.
    OpenAI,
    /// Groq (OpenAI-compatible chat completions).
    Groq,
    /// Anthropic messages API.
    Anthropic,
    /// Local Ollama server.
    Ollama,
}

impl LlmProvider {
    /// Base URL used when none is configured.
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com",
            LlmProvider::Ollama => "http://localhost:11434",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Groq => "llama-3.3-70b-versatile",
            LlmProvider::Anthropic => "claude-3-5-haiku-20241022",
            LlmProvider::Ollama => "phi3:mini",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn api_key_var(self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Groq => Some("GROQ_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }
}

/// Configuration for LLM client.
#[derive(Debug, Clone, Getters)]
pub struct LlmConfig {
    provider: LlmProvider,
    #[getter(skip)]
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key))]
    pub fn new(
        provider: LlmProvider,
        api_key: Option<String>,
        model: String,
        base_url: String,
        max_tokens: u32,
    ) -> Self {
        debug!("Creating LLM config");
        Self {
            provider,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
        }
    }

    /// True if an API key was supplied.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// LLM client that abstracts over multiple providers.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = %config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!(model = %config.model(), base_url = %config.base_url(), "Creating LLM client");
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generates a completion from a system prompt and user message.
    #[instrument(skip(self, system_prompt, user_message), fields(provider = %self.config.provider, model = %self.config.model))]
    pub async fn generate(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        debug!("Generating completion");
        match self.config.provider {
            LlmProvider::OpenAI | LlmProvider::Groq => {
                self.generate_openai(system_prompt, user_message).await
            }
            LlmProvider::Anthropic => self.generate_anthropic(system_prompt, user_message).await,
            LlmProvider::Ollama => self.generate_ollama(system_prompt, user_message).await,
        }
    }

    /// Checks whether the backend is reachable and configured.
    ///
    /// Hosted providers only need an API key; Ollama is checked over HTTP.
    #[instrument(skip(self), fields(provider = %self.config.provider))]
    pub async fn is_available(&self) -> bool {
        match self.config.provider {
            LlmProvider::Ollama => {
                let url = format!("{}/api/tags", self.config.base_url);
                match self.http.get(&url).timeout(AVAILABILITY_TIMEOUT).send().await {
                    Ok(response) => response.status().is_success(),
                    Err(e) => {
                        debug!(error = %e, "Ollama not reachable");
                        false
                    }
                }
            }
            _ => self.config.has_api_key(),
        }
    }

    fn require_api_key(&self) -> Result<&str, LlmError> {
        self.config.api_key.as_deref().ok_or_else(|| {
            LlmError::new(format!("No API key configured for {}", self.config.provider))
        })
    }

    /// Sends the request and returns the JSON body of a successful response.
    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, LlmError> {
        let response = request.timeout(REQUEST_TIMEOUT).send().await.map_err(|e| {
            error!(error = ?e, "LLM request failed");
            LlmError::new(format!("{} request failed: {}", self.config.provider, e))
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read LLM response");
            LlmError::new(format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            error!(status = %status, response = %response_text, "LLM API error");
            return Err(LlmError::new(format!(
                "{} API error {}: {}",
                self.config.provider, status, response_text
            )));
        }

        debug!(response_length = response_text.len(), "Parsing LLM response");
        serde_json::from_str(&response_text).map_err(|e| {
            error!(error = ?e, response = %response_text, "Failed to parse LLM response");
            LlmError::new(format!("Failed to parse response: {}", e))
        })
    }

    /// Generates a completion using an OpenAI-compatible chat endpoint.
    ///
    /// Groq and self-hosted servers are reached through the configured base URL.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_openai(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let api_key = self.require_api_key()?;

        debug!("Creating OpenAI client");
        let client = OpenAIClient::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(&self.config.base_url),
        );

        debug!("Building chat completion request");
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|e| {
                        error!(error = ?e, "Failed to build system message");
                        LlmError::new(format!("Failed to build system message: {}", e))
                    })?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_message)
                    .build()
                    .map_err(|e| {
                        error!(error = ?e, "Failed to build user message");
                        LlmError::new(format!("Failed to build user message: {}", e))
                    })?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build request");
                LlmError::new(format!("Failed to build request: {}", e))
            })?;

        debug!("Sending chat completion request");
        let response = client.chat().create(request).await.map_err(|e| {
            error!(error = ?e, "Chat completion API error");
            LlmError::new(format!("{} API error: {}", self.config.provider, e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                error!("No content in chat completion response");
                LlmError::new("No content in chat completion response".to_string())
            })?;

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }

    /// Generates a completion using Anthropic Claude.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_anthropic(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let api_key = self.require_api_key()?;
        let request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system_prompt,
            "messages": [
                { "role": "user", "content": user_message }
            ]
        });

        debug!("Sending request to Anthropic");
        let request = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request_body);
        let response_json = self.send_json(request).await?;

        let content = response_json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                error!(response = %response_json, "No text content in Anthropic response");
                LlmError::new("No text content in Anthropic response".to_string())
            })?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }

    /// Generates a completion using a local Ollama server.
    #[instrument(skip(self, system_prompt, user_message))]
    async fn generate_ollama(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "prompt": user_message,
            "system": system_prompt,
            "stream": false
        });

        debug!("Sending request to Ollama");
        let request = self
            .http
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&request_body);
        let response_json = self.send_json(request).await?;

        let content = response_json["response"]
            .as_str()
            .ok_or_else(|| {
                error!(response = %response_json, "No response field in Ollama reply");
                LlmError::new("No response field in Ollama reply".to_string())
            })?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parses_case_insensitively() {
        assert_eq!("ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAI);
        assert_eq!(LlmProvider::Groq.to_string(), "groq");
        assert!("mistral".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let config = LlmConfig::new(
            LlmProvider::Ollama,
            None,
            "phi3:mini".to_string(),
            "http://localhost:11434/".to_string(),
            16,
        );
        assert_eq!(config.base_url(), "http://localhost:11434");
        assert!(!config.has_api_key());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let config = LlmConfig::new(
            LlmProvider::Anthropic,
            None,
            LlmProvider::Anthropic.default_model().to_string(),
            LlmProvider::Anthropic.default_base_url().to_string(),
            16,
        );
        let client = LlmClient::new(config);
        assert!(!client.is_available().await);
        let err = client.generate("system", "user").await.unwrap_err();
        assert!(err.message.contains("No API key"));
    }

    #[tokio::test]
    async fn test_ollama_check_gives_up_on_silent_server() {
        // Accepted by the backlog but never answered.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = LlmConfig::new(
            LlmProvider::Ollama,
            None,
            "phi3:mini".to_string(),
            format!("http://{}", addr),
            16,
        );
        let client = LlmClient::new(config);

        let checked = tokio::time::timeout(AVAILABILITY_TIMEOUT * 3, client.is_available()).await;
        assert_eq!(checked, Ok(false));
        drop(listener);
    }

    #[tokio::test]
    async fn test_openai_compatible_base_url_is_used() {
        async fn completions(
            axum::Json(body): axum::Json<serde_json::Value>,
        ) -> axum::Json<serde_json::Value> {
            assert_eq!(body["model"], "local-model");
            assert_eq!(body["messages"][0]["role"], "system");
            axum::Json(serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "local-model",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "4" },
                    "finish_reason": "stop"
                }]
            }))
        }

        let app = axum::Router::new().route("/v1/chat/completions", axum::routing::post(completions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = LlmConfig::new(
            LlmProvider::OpenAI,
            Some("test-key".to_string()),
            "local-model".to_string(),
            format!("http://{}/v1", addr),
            16,
        );
        let reply = LlmClient::new(config).generate("system", "user").await.unwrap();
        assert_eq!(reply, "4");
    }
}
