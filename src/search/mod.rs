//! Web search providers used to augment time-sensitive prompts.
//!
//! Two engines, each enabled only when its API key is present:
//!   - `native`: Brave-compatible web search API (`BRAVE_API_KEY`)
//!   - `exa`: Exa neural search API (`EXA_API_KEY`)
//!
//! Both return the same [`SearchHit`] shape. Failures are reported as
//! [`SearchError`] and are never fatal to a chat request.

pub mod brave;
pub mod exa;

use std::fmt;

use thiserror::Error;

use crate::chat::settings::WebEngine;
use crate::config::SearchConfig;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search engine not configured: {0}")]
    NotConfigured(String),
    #[error("search request failed: {0}")]
    Request(String),
}

/// One result: where it came from and what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Native,
    Exa,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Native => "native",
            EngineKind::Exa => "exa",
        })
    }
}

#[derive(Debug, Clone)]
pub enum SearchProvider {
    Brave(brave::BraveSearch),
    Exa(exa::ExaSearch),
}

impl SearchProvider {
    pub fn kind(&self) -> EngineKind {
        match self {
            SearchProvider::Brave(_) => EngineKind::Native,
            SearchProvider::Exa(_) => EngineKind::Exa,
        }
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        match self {
            SearchProvider::Brave(p) => p.search(query, max_results).await,
            SearchProvider::Exa(p) => p.search(query, max_results).await,
        }
    }
}

/// The configured engines. Either slot may be empty.
#[derive(Debug, Clone, Default)]
pub struct SearchEngines {
    native: Option<SearchProvider>,
    exa: Option<SearchProvider>,
}

impl SearchEngines {
    pub fn new(native: Option<SearchProvider>, exa: Option<SearchProvider>) -> Self {
        Self { native, exa }
    }

    /// No engines at all; every search degrades to "unavailable".
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from config, enabling each engine whose key is set.
    pub fn build(
        config: &SearchConfig,
        native_key: Option<String>,
        exa_key: Option<String>,
    ) -> Result<Self, SearchError> {
        let native = match native_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Some(SearchProvider::Brave(brave::BraveSearch::new(
                config.native_url.clone(),
                key,
                config.timeout_seconds,
            )?)),
            None => None,
        };
        let exa = match exa_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Some(SearchProvider::Exa(exa::ExaSearch::new(
                config.exa_url.clone(),
                key,
                config.timeout_seconds,
            )?)),
            None => None,
        };
        Ok(Self { native, exa })
    }

    /// `auto` prefers native and falls back to exa; the others pin.
    pub fn resolve(&self, engine: WebEngine) -> Option<EngineKind> {
        match engine {
            WebEngine::Native => self.native.as_ref().map(SearchProvider::kind),
            WebEngine::Exa => self.exa.as_ref().map(SearchProvider::kind),
            WebEngine::Auto => self.native.as_ref().or(self.exa.as_ref()).map(SearchProvider::kind),
        }
    }

    pub fn get(&self, kind: EngineKind) -> Option<&SearchProvider> {
        match kind {
            EngineKind::Native => self.native.as_ref(),
            EngineKind::Exa => self.exa.as_ref(),
        }
    }

    /// Like [`get`](Self::get), but an absent engine is an error.
    pub fn require(&self, kind: Option<EngineKind>) -> Result<&SearchProvider, SearchError> {
        let kind = kind.ok_or_else(|| SearchError::NotConfigured("no search engine available".into()))?;
        self.get(kind).ok_or_else(|| SearchError::NotConfigured(kind.to_string()))
    }

    pub fn available(&self) -> Vec<EngineKind> {
        self.native.iter().chain(self.exa.iter()).map(SearchProvider::kind).collect()
    }
}

/// Strip inline HTML tags and decode the handful of entities search APIs
/// put in titles and descriptions.
pub(crate) fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SearchConfig {
        SearchConfig {
            timeout_seconds: 1,
            native_url: "http://localhost:0/native".into(),
            exa_url: "http://localhost:0/exa".into(),
        }
    }

    #[test]
    fn no_keys_means_no_engines() {
        let engines = SearchEngines::build(&config(), None, Some("  ".into())).unwrap();
        assert!(engines.available().is_empty());
        assert_eq!(engines.resolve(WebEngine::Auto), None);
    }

    #[test]
    fn auto_prefers_native_then_exa() {
        let both = SearchEngines::build(&config(), Some("n".into()), Some("e".into())).unwrap();
        assert_eq!(both.resolve(WebEngine::Auto), Some(EngineKind::Native));
        assert_eq!(both.resolve(WebEngine::Exa), Some(EngineKind::Exa));

        let exa_only = SearchEngines::build(&config(), None, Some("e".into())).unwrap();
        assert_eq!(exa_only.resolve(WebEngine::Auto), Some(EngineKind::Exa));
        assert_eq!(exa_only.resolve(WebEngine::Native), None);
        assert!(matches!(exa_only.require(Some(EngineKind::Native)), Err(SearchError::NotConfigured(_))));
        assert!(exa_only.require(None).is_err());
        assert_eq!(exa_only.require(Some(EngineKind::Exa)).unwrap().kind(), EngineKind::Exa);
    }

    #[test]
    fn clean_text_strips_tags_and_entities() {
        assert_eq!(clean_text("<strong>Rust</strong> 1.90 &amp; more"), "Rust 1.90 & more");
        assert_eq!(clean_text("a\n  b\t c"), "a b c");
        assert_eq!(clean_text("&quot;quoted&quot; &lt;tag&gt;"), "\"quoted\" <tag>");
    }
}
