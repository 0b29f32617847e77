//! Chat dispatcher. Turns one chat command into one completion call.
//!
//! ```text
//! ChatRequest
//!   → OptionResolver   (flags over channel settings over defaults)
//!   → ModelBlacklist   (short-circuit, nothing else happens)
//!   → SearchTrigger    (optional web results folded into the user turn)
//!   → ConversationStore::read
//!   → CompletionProvider::complete
//!   → ConversationStore::append
//!   → ChatReply
//! ```
//!
//! [`ChatEngine`] is shared behind an `Arc` by every front-end task. It holds
//! no lock across a network call.

pub mod format;
pub mod gate;
pub mod history;
pub mod options;
pub mod scope;
pub mod settings;
pub mod trigger;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::llm::{ChatMessage, CompletionProvider, CompletionRequest, ProviderError, Role};
use crate::search::SearchEngines;

use self::gate::ModelBlacklist;
use self::history::{ConversationStore, Turn};
use self::options::OptionResolver;
use self::scope::ScopeKey;
use self::settings::ChannelConfigProvider;
use self::trigger::SearchTrigger;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid option {flag}: {reason}")]
    InvalidOption { flag: String, reason: String },
    #[error("no prompt given")]
    MissingPrompt,
    #[error("model {0} is not allowed")]
    ModelBlocked(String),
    #[error("not configured: {0}")]
    Configuration(String),
    #[error("upstream error{}: {message}", http_suffix(.status))]
    Upstream { status: Option<u16>, message: String },
    #[error("request cancelled")]
    Cancelled,
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<ProviderError> for ChatError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Status { status, message } => ChatError::Upstream { status: Some(status), message },
            ProviderError::NotConfigured(msg) | ProviderError::UnknownProvider(msg) => ChatError::Configuration(msg),
            other => ChatError::Upstream { status: None, message: other.to_string() },
        }
    }
}

// ── Request / reply ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub channel: String,
    /// Nick of the user who issued the command.
    pub nick: String,
    /// Alias the command came through, if any.
    pub alias: Option<String>,
    /// Everything after the sub-action: flags then prompt.
    pub text: String,
}

impl ChatRequest {
    pub fn new(channel: impl Into<String>, nick: impl Into<String>, text: impl Into<String>) -> Self {
        Self { channel: channel.into(), nick: nick.into(), alias: None, text: text.into() }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub lines: Vec<String>,
    /// The transport should address each line to the invoking nick.
    pub prefix_nick: bool,
}

impl ChatReply {
    /// Lines as they go out on the wire.
    pub fn rendered(&self, nick: &str) -> Vec<String> {
        if self.prefix_nick {
            self.lines.iter().map(|l| format!("{nick}: {l}")).collect()
        } else {
            self.lines.clone()
        }
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

pub struct ChatEngine {
    bot_nick: String,
    channels: Arc<dyn ChannelConfigProvider>,
    blacklist: ModelBlacklist,
    trigger: SearchTrigger,
    provider: CompletionProvider,
    store: Arc<ConversationStore>,
}

impl ChatEngine {
    pub fn new(
        bot_nick: impl Into<String>,
        channels: Arc<dyn ChannelConfigProvider>,
        blacklist: ModelBlacklist,
        engines: SearchEngines,
        provider: CompletionProvider,
    ) -> Self {
        Self {
            bot_nick: bot_nick.into(),
            channels,
            blacklist,
            trigger: SearchTrigger::new(engines),
            provider,
            store: Arc::new(ConversationStore::new()),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Shared handle; inserts and removes are visible to the next request.
    pub fn blacklist(&self) -> &ModelBlacklist {
        &self.blacklist
    }

    /// Drop every conversation held for `channel`. Returns how many scopes went.
    pub fn reset(&self, channel: &str) -> usize {
        let cleared = self.store.clear_channel(channel);
        info!(%channel, cleared, "conversation history reset");
        cleared
    }

    /// Handle one chat command. `Ok(None)` means the channel has chat disabled
    /// and the command should be ignored silently.
    pub async fn chat(&self, req: &ChatRequest, cancel: &CancellationToken) -> Result<Option<ChatReply>, ChatError> {
        let settings = self.channels.settings(&req.channel);
        if !settings.enabled {
            debug!(channel = %req.channel, "chat disabled for channel; ignoring");
            return Ok(None);
        }

        let resolver = OptionResolver::new(&self.bot_nick, Utc::now().date_naive());
        let (config, prompt) = resolver.resolve(&req.text, &settings)?;

        if self.blacklist.is_blocked(&config.model) {
            warn!(channel = %req.channel, nick = %req.nick, model = %config.model, "blocked model requested");
            return Err(ChatError::ModelBlocked(config.model));
        }

        self.provider.check_ready().map_err(ChatError::from)?;

        let user_turn = if config.nick_include { format!("{}: {}", req.nick, prompt) } else { prompt.clone() };

        let decision = self.trigger.decide(&config, &prompt);
        let augmentation = self.trigger.augment(&decision, &config, &prompt, &user_turn, cancel).await?;

        let key = ScopeKey::derive(&req.channel, config.context_scope, &config.model, req.alias.as_deref());
        let history = if config.max_history > 0 { self.store.read(&key) } else { Default::default() };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(Role::System, config.system_prompt.clone()));
        messages.extend(history.recent(config.max_history).iter().map(Turn::to_message));
        messages.push(ChatMessage::new(Role::User, augmentation.prompt.clone()));

        let request = CompletionRequest {
            model: config.model.clone(),
            messages,
            temperature: config.temperature,
            top_p: config.top_p,
            presence_penalty: config.presence_penalty,
            frequency_penalty: config.frequency_penalty,
            token_limit: config.token_limit,
            user: Some(req.nick.clone()),
        };

        info!(
            channel = %req.channel,
            nick = %req.nick,
            model = %config.model,
            scope = %key,
            history = history.len().min(config.max_history),
            search = decision.should_search,
            provider = self.provider.name(),
            "dispatching chat completion"
        );
        trace!(request = ?request, "completion request");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(channel = %req.channel, scope = %key, "chat request cancelled");
                return Err(ChatError::Cancelled);
            }
            r = self.provider.complete(&request) => r,
        };
        let response = response.map_err(|e| {
            warn!(channel = %req.channel, model = %config.model, error = %e, "completion failed");
            ChatError::from(e)
        })?;

        if let Some(usage) = &response.usage {
            debug!(input_tokens = usage.input_tokens, output_tokens = usage.output_tokens, "completion usage");
        }

        let text = if config.nick_strip {
            format::strip_own_nick(response.text.trim(), &self.bot_nick)
        } else {
            response.text.trim().to_string()
        };

        self.store.append(&key, Turn::user(user_turn), Turn::assistant(text.clone()), config.max_history);

        let mut lines = format::reply_lines(&text, config.reply_intact);
        if config.web_show_sources && decision.should_search {
            if augmentation.failed {
                lines.push("(web search unavailable)".to_string());
            } else if !augmentation.sources.is_empty() {
                lines.push(format!("Sources: {}", augmentation.sources.join(", ")));
            }
        }

        Ok(Some(ChatReply { lines, prefix_nick: config.nick_prefix }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::settings::{ChannelOverrides, ChannelSettings, ContextScope, StaticChannelConfig};
    use super::*;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;

    fn engine_with(settings: ChannelSettings, provider: CompletionProvider) -> ChatEngine {
        let channels = Arc::new(StaticChannelConfig::new(settings, HashMap::new()));
        ChatEngine::new("bridgebot", channels, ModelBlacklist::default(), SearchEngines::none(), provider)
    }

    fn dummy_engine(settings: ChannelSettings) -> ChatEngine {
        engine_with(settings, CompletionProvider::Dummy(DummyProvider))
    }

    fn no_web() -> ChannelSettings {
        ChannelSettings { web_mode: settings::WebMode::Off, ..Default::default() }
    }

    #[tokio::test]
    async fn echo_round_trip_records_history() {
        let engine = dummy_engine(no_web());
        let reply = engine
            .chat(&ChatRequest::new("#rust", "alice", "hello there"), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.lines, ["[echo] alice: hello there"]);
        assert!(!reply.prefix_nick);

        let key = ScopeKey::derive("#rust", ContextScope::ChannelModel, settings::DEFAULT_MODEL, None);
        let history = engine.store().read(&key);
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].content, "alice: hello there");
        assert_eq!(history.turns()[1].content, "[echo] alice: hello there");
    }

    #[tokio::test]
    async fn disabled_channel_returns_none() {
        let mut channels = HashMap::new();
        channels.insert("#quiet".to_string(), ChannelOverrides { enabled: Some(false), ..Default::default() });
        let engine = ChatEngine::new(
            "bridgebot",
            Arc::new(StaticChannelConfig::new(no_web(), channels)),
            ModelBlacklist::default(),
            SearchEngines::none(),
            CompletionProvider::Dummy(DummyProvider),
        );
        let reply = engine.chat(&ChatRequest::new("#Quiet", "bob", "hi"), &CancellationToken::new()).await.unwrap();
        assert!(reply.is_none());
        assert_eq!(engine.store().scope_count(), 0);
    }

    #[tokio::test]
    async fn blocked_model_short_circuits() {
        let engine = dummy_engine(no_web());
        let err = engine
            .chat(&ChatRequest::new("#rust", "bob", "--model OpenAI/o1-pro hi"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ModelBlocked(m) if m == "OpenAI/o1-pro"));
        assert_eq!(engine.store().scope_count(), 0);
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let provider = OpenAiCompatibleProvider::new("http://127.0.0.1:9/v1".into(), 1, None).unwrap();
        let engine = engine_with(no_web(), CompletionProvider::OpenAiCompatible(provider));
        let err = engine.chat(&ChatRequest::new("#rust", "bob", "hi"), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)), "{err:?}");
        let shown = err.to_string();
        assert!(shown.starts_with("not configured: "), "{shown}");
        assert_eq!(shown.matches("not configured").count(), 1, "{shown}");
    }

    #[tokio::test]
    async fn bad_flag_surfaces_invalid_option() {
        let engine = dummy_engine(no_web());
        let err = engine
            .chat(&ChatRequest::new("#rust", "bob", "--top_p lots hi"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--top_p"));
    }

    #[tokio::test]
    async fn already_cancelled_request_leaves_no_history() {
        let engine = dummy_engine(no_web());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.chat(&ChatRequest::new("#rust", "bob", "hi"), &cancel).await.unwrap_err();
        assert!(matches!(err, ChatError::Cancelled));
        assert_eq!(engine.store().scope_count(), 0);
    }

    #[tokio::test]
    async fn nick_prefix_and_intact_formatting() {
        let settings = ChannelSettings {
            nick_include: false,
            nick_prefix: true,
            reply_intact: true,
            ..no_web()
        };
        let engine = dummy_engine(settings);
        let reply = engine
            .chat(&ChatRequest::new("#rust", "carol", "line one\nline two"), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.lines, ["[echo] line one", "line two"]);
        assert_eq!(reply.rendered("carol"), ["carol: [echo] line one", "carol: line two"]);
    }

    #[tokio::test]
    async fn forced_search_without_engines_annotates_when_showing_sources() {
        let settings = ChannelSettings { nick_include: false, web_show_sources: true, ..no_web() };
        let engine = dummy_engine(settings);
        let reply = engine
            .chat(&ChatRequest::new("#rust", "dave", "--web what is new"), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.lines, ["[echo] what is new", "(web search unavailable)"]);
    }

    #[tokio::test]
    async fn zero_max_history_stores_nothing() {
        let engine = dummy_engine(ChannelSettings { max_history: 0, ..no_web() });
        engine.chat(&ChatRequest::new("#rust", "erin", "hi"), &CancellationToken::new()).await.unwrap();
        let key = ScopeKey::derive("#rust", ContextScope::ChannelModel, settings::DEFAULT_MODEL, None);
        assert!(engine.store().read(&key).is_empty());
    }

    #[tokio::test]
    async fn reset_clears_every_scope_of_the_channel() {
        let engine = dummy_engine(no_web());
        let cancel = CancellationToken::new();
        engine.chat(&ChatRequest::new("#rust", "f", "--model a/one hi"), &cancel).await.unwrap();
        engine.chat(&ChatRequest::new("#rust", "f", "--model a/two hi"), &cancel).await.unwrap();
        engine.chat(&ChatRequest::new("#other", "f", "hi"), &cancel).await.unwrap();
        assert_eq!(engine.reset("#RUST"), 2);
        assert_eq!(engine.store().scope_count(), 1);
    }

    #[test]
    fn provider_errors_map_to_chat_errors() {
        let e: ChatError = ProviderError::Status { status: 502, message: "bad gateway".into() }.into();
        assert!(matches!(e, ChatError::Upstream { status: Some(502), .. }));
        assert_eq!(e.to_string(), "upstream error (HTTP 502): bad gateway");

        let e: ChatError = ProviderError::Malformed("empty".into()).into();
        assert!(matches!(e, ChatError::Upstream { status: None, .. }));

        let e: ChatError = ProviderError::NotConfigured("no key".into()).into();
        assert!(matches!(e, ChatError::Configuration(_)));
    }
}
