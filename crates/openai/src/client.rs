//! Blocking client for the OpenAI chat completions endpoint.

use reqwest::blocking::Client;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use slidescan_core::{
    ChatMessage, CompletionProvider, CompletionRequest, Credential, Error, ProviderError, Result,
};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Configuration for the chat completions client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer credential.
    pub credential: Credential,

    /// Base URL, without the trailing slash.
    pub base_url: String,

    /// Model name sent with each request.
    pub model: String,
}

impl OpenAiConfig {
    /// Config for the public API with the default model.
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL`.
    ///
    /// Only the key is required.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(Credential::from_env("OPENAI_API_KEY")?);

        if let Some(model) = non_empty_var("OPENAI_MODEL") {
            config = config.with_model(model);
        }
        if let Some(base_url) = non_empty_var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }

        Ok(config)
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Chat completions provider over blocking HTTP.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client with the transport's default timeout.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Build the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_request_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequestBody<'a> {
        ChatRequestBody {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

impl CompletionProvider for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, ProviderError> {
        let body = self.to_request_body(request);
        log::debug!(
            "POST {} model={} messages={}",
            self.completions_url(),
            body.model,
            body.messages.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.credential.expose()),
            )
            .json(&body)
            .send()
            .map_err(|e| ProviderError::from_message(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ProviderError::from_message(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::from_message(error_message(status, &text)));
        }

        parse_completion(&text)
    }
}

/// Fold an error response into one message: status, then code, type and message when present.
fn error_message(status: StatusCode, body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) else {
        return format!("HTTP {}: {}", status, body.trim());
    };

    let detail = parsed.error;
    let mut tags = Vec::new();
    if let Some(code) = detail.code.as_ref().and_then(code_text) {
        tags.push(format!("code={}", code));
    }
    if let Some(kind) = detail.error_type.as_deref().filter(|t| !t.is_empty()) {
        tags.push(format!("type={}", kind));
    }

    if tags.is_empty() {
        format!("HTTP {}: {}", status, detail.message)
    } else {
        format!("HTTP {}: [{}] {}", status, tags.join(" "), detail.message)
    }
}

fn code_text(code: &serde_json::Value) -> Option<String> {
    match code {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Text of the first choice. A `null` content field reads as an empty reply.
fn parse_completion(body: &str) -> std::result::Result<String, ProviderError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::from_message(format!("Malformed completion response: {}", e)))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Transient("Completion response has no choices".to_string()))?;

    Ok(choice.message.content.unwrap_or_else(|| {
        log::warn!("Completion response has null content");
        String::new()
    }))
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}
