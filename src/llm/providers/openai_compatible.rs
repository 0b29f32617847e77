//! OpenAI-compatible chat completion provider (`<base_url>/chat/completions`).
//!
//! Covers OpenRouter, OpenAI and compatible local servers. All wire types are
//! private to this module; callers only see [`CompletionRequest`] and
//! [`LlmResponse`]. One attempt per call; retries are the caller's business.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{ChatMessage, CompletionRequest, LlmResponse, LlmUsage, ProviderError, TokenLimit};

// ── Public provider ───────────────────────────────────────────────────────────

/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `base_url` is the API root (e.g. `https://openrouter.ai/api/v1`); a full
    /// `/chat/completions` URL is accepted as well. The timeout bounds every
    /// request so a stuck upstream cannot hold a channel forever.
    pub fn new(base_url: String, timeout_seconds: u64, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        Ok(Self { client, endpoint: endpoint_url(&base_url), api_key })
    }

    pub fn check_ready(&self) -> Result<(), ProviderError> {
        if self.endpoint.is_empty() || !self.endpoint.contains("://") {
            return Err(ProviderError::NotConfigured("base_url is not set".into()));
        }
        if self.api_key.is_none() {
            return Err(ProviderError::NotConfigured("missing API key (set LLM_API_KEY)".into()));
        }
        Ok(())
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        let payload = WireRequest::from_request(request);

        debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            max_completion_tokens = ?payload.max_completion_tokens,
            max_tokens = ?payload.max_tokens,
            "sending completion request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full completion request payload");
        }

        let mut req = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.endpoint, error = %e, timeout = e.is_timeout(), "completion request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<WireResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize completion response");
            ProviderError::Malformed(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received completion response");

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Malformed("empty or missing content in response".into()))?;

        let usage = parsed.usage.map(|u| LlmUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(LlmResponse { text, usage })
    }
}

fn endpoint_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/chat/completions")
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a CompletionRequest) -> Self {
        let (max_completion_tokens, max_tokens) = match request.token_limit {
            Some(TokenLimit::MaxCompletionTokens(n)) => (Some(n), None),
            Some(TokenLimit::MaxTokens(n)) => (None, Some(n)),
            None => (None, None),
        };

        // Gemini routes reject frequency_penalty.
        let frequency_penalty = if request.model.to_ascii_lowercase().contains("gemini") {
            None
        } else {
            request.frequency_penalty
        };

        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            presence_penalty: request.presence_penalty,
            frequency_penalty,
            max_completion_tokens,
            max_tokens,
            user: request.user.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = error_message(&body);
    error!(%status, %message, "completion request returned HTTP error");
    Err(ProviderError::Status { status: status.as_u16(), message })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("{}{code}", env.error.message)
        }
        Err(_) if body.trim().is_empty() => "<empty body>".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
