//! Completion provider implementations.
//!
//! `build(config, api_key)` is the factory, called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod openai_compatible;

use crate::config::CompletionConfig;
use crate::llm::{CompletionProvider, ProviderError};

/// Construct a `CompletionProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML). A missing key is
/// not an error here: it surfaces per request as a configuration error so the
/// bridge can still start and answer `help`.
pub fn build(config: &CompletionConfig, api_key: Option<String>) -> Result<CompletionProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(CompletionProvider::Dummy(dummy::DummyProvider)),
        "openai" | "openai-compatible" | "openrouter" => {
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                config.base_url.clone(),
                config.timeout_seconds,
                api_key,
            )?;
            Ok(CompletionProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}
