//! Web-search trigger: decide whether a prompt needs live results, fetch them,
//! and fold them into the user turn.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ChatError;
use super::options::EffectiveConfig;
use super::settings::{SearchContextSize, WebEngine, WebMode};
use crate::search::{EngineKind, SearchEngines, SearchHit};

/// Words and phrases that suggest the answer depends on current events.
const TRIGGER_TERMS: &[&str] = &[
    "today", "tonight", "yesterday", "tomorrow", "now", "current", "currently",
    "latest", "recent", "recently", "breaking", "news", r"this\s+week", r"this\s+month",
    r"this\s+year", "price", "prices", "stock", "stocks", "weather", "forecast",
    "score", "scores", "election", r"exchange\s+rate",
];

static TIME_SENSITIVE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // Dates only need non-digit neighbours, so `2026-10-16T09:00Z` still counts.
    let pattern = format!(
        r"(?i)\b(?:{})\b|(?:^|\D)\d{{4}}-\d{{2}}-\d{{2}}(?:\D|$)",
        TRIGGER_TERMS.join("|")
    );
    Regex::new(&pattern).ok()
});

/// Whether `prompt` looks like it asks about something time-dependent.
pub fn is_time_sensitive(prompt: &str) -> bool {
    TIME_SENSITIVE.as_ref().is_some_and(|re| re.is_match(prompt))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchReason {
    /// Forced by `--web`.
    Flag,
    /// `auto` mode and the prompt matched the heuristic.
    Heuristic,
    /// The channel is set to `always`.
    ChannelPolicy,
    Disabled,
}

impl fmt::Display for SearchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchReason::Flag => "flag",
            SearchReason::Heuristic => "heuristic",
            SearchReason::ChannelPolicy => "channel-policy",
            SearchReason::Disabled => "disabled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchDecision {
    pub should_search: bool,
    /// Engine the search would use; `None` when nothing is configured.
    pub engine: Option<EngineKind>,
    pub reason: SearchReason,
}

pub fn decide(
    mode: WebMode,
    prompt: &str,
    forced: bool,
    engine: WebEngine,
    engines: &SearchEngines,
) -> SearchDecision {
    let (should_search, reason) = match mode {
        WebMode::Off => (false, SearchReason::Disabled),
        WebMode::Always if forced => (true, SearchReason::Flag),
        WebMode::Always => (true, SearchReason::ChannelPolicy),
        WebMode::Optin if forced => (true, SearchReason::Flag),
        WebMode::Optin => (false, SearchReason::Disabled),
        WebMode::Auto if forced => (true, SearchReason::Flag),
        WebMode::Auto if is_time_sensitive(prompt) => (true, SearchReason::Heuristic),
        WebMode::Auto => (false, SearchReason::Disabled),
    };
    let engine = if should_search { engines.resolve(engine) } else { None };
    SearchDecision { should_search, engine, reason }
}

/// The user turn as it will be sent, plus what the search contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    pub prompt: String,
    pub sources: Vec<String>,
    /// A search was wanted but produced nothing usable.
    pub failed: bool,
}

impl Augmentation {
    fn unchanged(prompt: &str, failed: bool) -> Self {
        Self { prompt: prompt.to_string(), sources: Vec::new(), failed }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchTrigger {
    engines: SearchEngines,
}

impl SearchTrigger {
    pub fn new(engines: SearchEngines) -> Self {
        Self { engines }
    }

    pub fn decide(&self, config: &EffectiveConfig, prompt: &str) -> SearchDecision {
        decide(config.web_mode, prompt, config.web_forced, config.web_engine, &self.engines)
    }

    /// Run the search the decision calls for, querying with `query` and
    /// wrapping `user_turn` in the results. Search failures degrade to the
    /// plain user turn; only cancellation is an error.
    pub async fn augment(
        &self,
        decision: &SearchDecision,
        config: &EffectiveConfig,
        query: &str,
        user_turn: &str,
        cancel: &CancellationToken,
    ) -> Result<Augmentation, ChatError> {
        if !decision.should_search {
            return Ok(Augmentation::unchanged(user_turn, false));
        }
        let provider = match self.engines.require(decision.engine) {
            Ok(p) => p,
            Err(e) => {
                warn!(reason = %decision.reason, error = %e, "web search wanted but unavailable");
                return Ok(Augmentation::unchanged(user_turn, true));
            }
        };

        debug!(engine = %provider.kind(), reason = %decision.reason, max_results = config.web_max_results, "running web search");
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            r = provider.search(query, config.web_max_results) => r,
        };

        match result {
            Ok(hits) if hits.is_empty() => {
                warn!(engine = %provider.kind(), "web search returned no results");
                Ok(Augmentation::unchanged(user_turn, true))
            }
            Ok(hits) => {
                let sources: Vec<String> = hits.iter().map(|h| h.url.clone()).collect();
                info!(engine = %provider.kind(), hits = hits.len(), sources = %sources.join(", "), "web search succeeded");
                Ok(Augmentation {
                    prompt: context_block(&config.web_search_prompt, &hits, config.web_search_context_size, user_turn),
                    sources,
                    failed: false,
                })
            }
            Err(e) => {
                warn!(engine = %provider.kind(), error = %e, "web search failed; continuing without results");
                Ok(Augmentation::unchanged(user_turn, true))
            }
        }
    }
}

/// Label, numbered results, blank line, then the user's own text.
pub fn context_block(label: &str, hits: &[SearchHit], size: SearchContextSize, prompt: &str) -> String {
    let mut block = String::from(label);
    for (i, hit) in hits.iter().enumerate() {
        block.push_str(&format!("\n[{}] {} ({})", i + 1, hit.title, hit.url));
        let snippet = truncate_chars(&hit.snippet, size.snippet_chars());
        if !snippet.is_empty() {
            block.push('\n');
            block.push_str(&snippet);
        }
    }
    block.push_str("\n\n");
    block.push_str(prompt);
    block
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", s[..cut].trim_end()),
        None => s.to_string(),
    }
}
