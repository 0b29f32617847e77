//! Completion transport abstraction.
//!
//! `CompletionProvider` is an enum over concrete backends. The dispatcher
//! hands it a fully resolved [`CompletionRequest`]; every provider-specific
//! request/response shaping stays inside the provider module.
//!
//! Provider instances are immutable after construction and cheap to clone.

pub mod providers;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

// ── Request / response vocabulary ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// The one token-limit parameter forwarded upstream. Older endpoints only
/// understand `max_tokens`; newer ones prefer `max_completion_tokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLimit {
    MaxCompletionTokens(u32),
    MaxTokens(u32),
}

/// Everything needed for one chat-completion round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub token_limit: Option<TokenLimit>,
    /// End-user identifier, forwarded for provider-side abuse tracking.
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available completion backends.
///
/// Enum dispatch keeps the async call free of trait objects.
/// Adding a backend = new module + new variant + new match arms.
#[derive(Debug, Clone)]
pub enum CompletionProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
}

impl CompletionProvider {
    /// Verify the provider has what it needs to make a call.
    pub fn check_ready(&self) -> Result<(), ProviderError> {
        match self {
            CompletionProvider::Dummy(_) => Ok(()),
            CompletionProvider::OpenAiCompatible(p) => p.check_ready(),
        }
    }

    /// Send the request and return the first choice's text.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse, ProviderError> {
        match self {
            CompletionProvider::Dummy(p) => p.complete(request).await,
            CompletionProvider::OpenAiCompatible(p) => p.complete(request).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CompletionProvider::Dummy(_) => "dummy",
            CompletionProvider::OpenAiCompatible(_) => "openai-compatible",
        }
    }
}
