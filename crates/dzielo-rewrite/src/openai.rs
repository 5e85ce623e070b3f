// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! OpenAI-compatible chat-completions service

use crate::error::RewriteError;
use crate::service::RewriteService;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Chat-completions client over blocking `reqwest`
pub struct OpenAiService {
    api_key: String,
    endpoint: String,
    temperature: Option<f32>,
    client: reqwest::blocking::Client,
}

impl OpenAiService {
    /// Default API endpoint
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    /// Default per-call timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Temperature used by default
    pub const DEFAULT_TEMPERATURE: f32 = 0.8;

    /// Create a client for the public endpoint
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            temperature: Some(Self::DEFAULT_TEMPERATURE),
            client: build_http_client(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Sets the API endpoint (base URL without `/chat/completions`)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the sampling temperature; `None` leaves the model default
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    /// Reasoning model families only accept the default temperature
    fn accepts_temperature(model: &str) -> bool {
        !(model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("o3"))
    }
}

impl RewriteService for OpenAiService {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn complete(&self, system: &str, user: &str, model: &str) -> Result<String, RewriteError> {
        if self.api_key.trim().is_empty() {
            return Err(RewriteError::NotConfigured("API key is empty".to_string()));
        }

        let request = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature.filter(|_| Self::accepts_temperature(model)),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| RewriteError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let body: ChatCompletionResponse = response
            .json()
            .map_err(|e| RewriteError::Transient(format!("malformed response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| RewriteError::Transient("response carried no message content".to_string()))?;

        debug!(model, chars = content.len(), "received completion");
        Ok(content)
    }
}

/// Map an unsuccessful HTTP status to a failure kind
fn classify_failure(status: StatusCode, body: &str) -> RewriteError {
    let detail = format!("status {status}: {}", error_message(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RewriteError::Unauthorized(detail),
        StatusCode::TOO_MANY_REQUESTS if body.contains("insufficient_quota") => {
            RewriteError::QuotaExhausted(detail)
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            RewriteError::Transient(detail)
        }
        s if s.is_server_error() => RewriteError::Transient(detail),
        _ => RewriteError::Rejected(detail),
    }
}

/// Pull `error.message` out of an API error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Builds a blocking HTTP client with the given request timeout
fn build_http_client(timeout: Duration) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Failed to build HTTP client: {err}");
            reqwest::blocking::Client::new()
        })
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
