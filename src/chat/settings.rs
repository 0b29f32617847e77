//! Per-channel chat settings and the provider interface that serves them.
//!
//! Built-in defaults are overlaid by the `[defaults]` table and then by a
//! channel's own `[channels."<name>"]` table. Every key is optional at the
//! overlay level; [`ChannelSettings`] is always fully populated.

use std::collections::HashMap;

use serde::Deserialize;

/// How conversation histories are partitioned inside a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ContextScope {
    #[serde(rename = "channel")]
    Channel,
    #[serde(rename = "channel+model")]
    ChannelModel,
    #[serde(rename = "channel+alias")]
    ChannelAlias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebMode {
    Off,
    Auto,
    Always,
    Optin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebEngine {
    Auto,
    Native,
    Exa,
}

/// How much of each search snippet is kept in the injected context block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchContextSize {
    Low,
    Medium,
    High,
}

impl SearchContextSize {
    pub fn snippet_chars(self) -> usize {
        match self {
            SearchContextSize::Low => 160,
            SearchContextSize::Medium => 400,
            SearchContextSize::High => 1000,
        }
    }
}

pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";
pub const DEFAULT_PROMPT: &str = "You are $botnick the IRC bot. Be brief, helpful";
pub const DEFAULT_SEARCH_PROMPT: &str =
    "A web search was conducted. Use the following results to answer the user's question, citing sources where relevant:";
pub const MAX_WEB_RESULTS: u32 = 10;

/// Fully resolved settings for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    pub enabled: bool,
    pub model: String,
    /// System prompt template; `$botnick` and `$date` are substituted.
    pub prompt: String,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    /// Sent when no other token limit applies; 0 disables.
    pub max_tokens: u32,
    /// Preferred over `max_tokens` when > 0.
    pub max_completion_tokens: u32,
    /// Turn cap per scope; 0 disables history.
    pub max_history: usize,
    pub context_scope: ContextScope,
    pub nick_include: bool,
    pub nick_strip: bool,
    pub nick_prefix: bool,
    pub reply_intact: bool,
    pub web_mode: WebMode,
    pub web_engine: WebEngine,
    pub web_search_context_size: SearchContextSize,
    pub web_max_results: u32,
    pub web_search_prompt: String,
    pub web_show_sources: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            temperature: None,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
            max_tokens: 200,
            max_completion_tokens: 0,
            max_history: 10,
            context_scope: ContextScope::ChannelModel,
            nick_include: true,
            nick_strip: true,
            nick_prefix: false,
            reply_intact: false,
            web_mode: WebMode::Auto,
            web_engine: WebEngine::Auto,
            web_search_context_size: SearchContextSize::Medium,
            web_max_results: 5,
            web_search_prompt: DEFAULT_SEARCH_PROMPT.to_string(),
            web_show_sources: false,
        }
    }
}

/// Partial settings as they appear in TOML. Unknown keys are rejected so a
/// typo does not silently fall back to a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelOverrides {
    pub enabled: Option<bool>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub max_tokens: Option<u32>,
    pub max_completion_tokens: Option<u32>,
    pub max_history: Option<usize>,
    #[serde(rename = "contextScope", alias = "context_scope")]
    pub context_scope: Option<ContextScope>,
    pub nick_include: Option<bool>,
    pub nick_strip: Option<bool>,
    pub nick_prefix: Option<bool>,
    pub reply_intact: Option<bool>,
    pub web_mode: Option<WebMode>,
    pub web_engine: Option<WebEngine>,
    pub web_search_context_size: Option<SearchContextSize>,
    pub web_max_results: Option<u32>,
    pub web_search_prompt: Option<String>,
    pub web_show_sources: Option<bool>,
}

impl ChannelOverrides {
    /// Overlay every present key onto `base`.
    pub fn apply(&self, base: &mut ChannelSettings) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = &self.$field { base.$field = v.clone(); })*
            };
        }
        overlay!(
            enabled, model, prompt, max_tokens, max_completion_tokens, max_history,
            context_scope, nick_include, nick_strip, nick_prefix, reply_intact,
            web_mode, web_engine, web_search_context_size, web_search_prompt, web_show_sources,
        );
        macro_rules! overlay_optional {
            ($($field:ident),* $(,)?) => {
                $(if self.$field.is_some() { base.$field = self.$field; })*
            };
        }
        overlay_optional!(temperature, top_p, presence_penalty, frequency_penalty);
        if let Some(n) = self.web_max_results {
            base.web_max_results = n.clamp(1, MAX_WEB_RESULTS);
        }
    }
}

/// Source of per-channel settings, injected into the chat engine.
pub trait ChannelConfigProvider: Send + Sync {
    fn settings(&self, channel: &str) -> ChannelSettings;
}

/// Settings resolved once from config: defaults plus per-channel overlays.
#[derive(Debug, Clone, Default)]
pub struct StaticChannelConfig {
    defaults: ChannelSettings,
    /// Keyed by lowercased channel name.
    channels: HashMap<String, ChannelOverrides>,
}

impl StaticChannelConfig {
    pub fn new(defaults: ChannelSettings, channels: HashMap<String, ChannelOverrides>) -> Self {
        let channels = channels
            .into_iter()
            .map(|(name, o)| (name.to_lowercase(), o))
            .collect();
        Self { defaults, channels }
    }

    pub fn defaults(&self) -> &ChannelSettings {
        &self.defaults
    }
}

impl ChannelConfigProvider for StaticChannelConfig {
    fn settings(&self, channel: &str) -> ChannelSettings {
        let mut settings = self.defaults.clone();
        if let Some(overrides) = self.channels.get(&channel.to_lowercase()) {
            overrides.apply(&mut settings);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = ChannelSettings::default();
        assert!(s.enabled);
        assert_eq!(s.max_tokens, 200);
        assert_eq!(s.max_completion_tokens, 0);
        assert_eq!(s.max_history, 10);
        assert_eq!(s.context_scope, ContextScope::ChannelModel);
        assert_eq!(s.web_mode, WebMode::Auto);
        assert_eq!(s.web_max_results, 5);
        assert!(s.temperature.is_none());
    }

    #[test]
    fn overrides_apply_only_present_keys() {
        let overrides: ChannelOverrides = toml::from_str(
            r#"
model = "x-ai/grok-4"
temperature = 0.3
contextScope = "channel+alias"
web_mode = "optin"
"#,
        )
        .unwrap();
        let mut s = ChannelSettings::default();
        overrides.apply(&mut s);
        assert_eq!(s.model, "x-ai/grok-4");
        assert_eq!(s.temperature, Some(0.3));
        assert_eq!(s.context_scope, ContextScope::ChannelAlias);
        assert_eq!(s.web_mode, WebMode::Optin);
        assert_eq!(s.max_tokens, 200);
        assert_eq!(s.prompt, DEFAULT_PROMPT);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let res: Result<ChannelOverrides, _> = toml::from_str("modle = \"typo\"");
        assert!(res.is_err());
    }

    #[test]
    fn bad_enum_value_is_rejected() {
        let res: Result<ChannelOverrides, _> = toml::from_str("web_mode = \"sometimes\"");
        assert!(res.is_err());
    }

    #[test]
    fn web_max_results_is_clamped() {
        let mut s = ChannelSettings::default();
        ChannelOverrides { web_max_results: Some(50), ..Default::default() }.apply(&mut s);
        assert_eq!(s.web_max_results, MAX_WEB_RESULTS);
        ChannelOverrides { web_max_results: Some(0), ..Default::default() }.apply(&mut s);
        assert_eq!(s.web_max_results, 1);
    }

    #[test]
    fn channel_lookup_is_case_insensitive() {
        let mut channels = HashMap::new();
        channels.insert(
            "#Rust".to_string(),
            ChannelOverrides { enabled: Some(false), ..Default::default() },
        );
        let cfg = StaticChannelConfig::new(ChannelSettings::default(), channels);
        assert!(!cfg.settings("#rust").enabled);
        assert!(!cfg.settings("#RUST").enabled);
        assert!(cfg.settings("#other").enabled);
    }
}
