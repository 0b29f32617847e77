//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or the file given with `-f`), then applies the
//! `CHATBRIDGE_LOG_LEVEL` override. Secrets never come from TOML: API keys are
//! read from `LLM_API_KEY`, `BRAVE_API_KEY` and `EXA_API_KEY`.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::chat::gate::{DEFAULT_BLOCKED_MODELS, ModelBlacklist};
use crate::chat::settings::{ChannelOverrides, ChannelSettings, StaticChannelConfig};
use crate::error::AppError;
use crate::logger;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Sub-actions that an alias may not shadow.
const RESERVED_COMMANDS: &[&str] = &["chat", "reset", "help"];

/// Completion endpoint configuration (`[completion]`).
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// `"openai-compatible"` or `"dummy"`.
    pub provider: String,
    /// API root; `/chat/completions` is appended when missing.
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Search endpoint configuration (`[search]`).
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub timeout_seconds: u64,
    /// Brave-compatible web search endpoint.
    pub native_url: String,
    pub exa_url: String,
}

/// Identity used by the stdin console front-end (`[console]`).
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub channel: String,
    pub nick: String,
}

/// API keys, sourced from the environment only.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<String>,
    pub brave_api_key: Option<String>,
    pub exa_api_key: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            llm_api_key: non_empty_env("LLM_API_KEY"),
            brave_api_key: non_empty_env("BRAVE_API_KEY"),
            exa_api_key: non_empty_env("EXA_API_KEY"),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Fully-resolved bridge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    pub completion: CompletionConfig,
    pub search: SearchConfig,
    pub console: ConsoleConfig,
    pub channels: StaticChannelConfig,
    /// alias name (lowercased) -> flag string it expands to.
    pub aliases: HashMap<String, String>,
    /// Replaces the built-in blacklist entirely when configured.
    pub models_blacklist: Vec<String>,
    pub secrets: Secrets,
}

impl Config {
    pub fn blacklist(&self) -> ModelBlacklist {
        ModelBlacklist::from_models(&self.models_blacklist)
    }
}

/// Raw TOML shape, deserialized before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    bridge: RawBridge,
    #[serde(default)]
    completion: RawCompletion,
    #[serde(default)]
    search: RawSearch,
    #[serde(default)]
    console: RawConsole,
    #[serde(default)]
    defaults: ChannelOverrides,
    #[serde(default)]
    channels: HashMap<String, ChannelOverrides>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

#[derive(Deserialize)]
struct RawBridge {
    #[serde(default = "default_bot_name")]
    bot_name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawBridge {
    fn default() -> Self {
        Self { bot_name: default_bot_name(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawCompletion {
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_completion_timeout")]
    timeout_seconds: u64,
    /// `None` keeps the built-in list; `Some(vec![])` blocks nothing.
    #[serde(default)]
    models_blacklist: Option<Vec<String>>,
}

impl Default for RawCompletion {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            timeout_seconds: default_completion_timeout(),
            models_blacklist: None,
        }
    }
}

#[derive(Deserialize)]
struct RawSearch {
    #[serde(default = "default_search_timeout")]
    timeout_seconds: u64,
    #[serde(default = "default_native_url")]
    native_url: String,
    #[serde(default = "default_exa_url")]
    exa_url: String,
}

impl Default for RawSearch {
    fn default() -> Self {
        Self {
            timeout_seconds: default_search_timeout(),
            native_url: default_native_url(),
            exa_url: default_exa_url(),
        }
    }
}

#[derive(Deserialize)]
struct RawConsole {
    #[serde(default = "default_console_channel")]
    channel: String,
    #[serde(default = "default_console_nick")]
    nick: String,
}

impl Default for RawConsole {
    fn default() -> Self {
        Self { channel: default_console_channel(), nick: default_console_nick() }
    }
}

fn default_bot_name() -> String { "chatbridge".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_provider() -> String { "openai-compatible".to_string() }
fn default_base_url() -> String { "https://openrouter.ai/api/v1".to_string() }
fn default_completion_timeout() -> u64 { 60 }
fn default_search_timeout() -> u64 { 15 }
fn default_native_url() -> String { "https://api.search.brave.com/res/v1/web/search".to_string() }
fn default_exa_url() -> String { "https://api.exa.ai/search".to_string() }
fn default_console_channel() -> String { "#console".to_string() }
fn default_console_nick() -> String { "operator".to_string() }

/// Load config from `path` (or `config/default.toml`), then apply env-var
/// overrides and read secrets from the environment.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let path = expand_home(path.unwrap_or(DEFAULT_CONFIG_PATH));
    let log_level_override = env::var("CHATBRIDGE_LOG_LEVEL").ok();
    load_from(&path, log_level_override.as_deref(), Secrets::from_env())
}

/// Loader with an explicit path, log-level override and secrets.
/// Tests pass these directly instead of mutating env vars.
pub fn load_from(path: &Path, log_level_override: Option<&str>, secrets: Secrets) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, log_level_override, secrets)
}

fn resolve(parsed: RawConfig, log_level_override: Option<&str>, secrets: Secrets) -> Result<Config, AppError> {
    let b = parsed.bridge;
    if b.bot_name.trim().is_empty() {
        return Err(AppError::Config("bridge.bot_name must not be empty".into()));
    }
    let log_level = log_level_override.unwrap_or(&b.log_level).to_string();
    logger::parse_level(&log_level).map_err(|e| AppError::Config(format!("bridge.log_level: {e}")))?;

    if parsed.completion.timeout_seconds == 0 {
        return Err(AppError::Config("completion.timeout_seconds must be greater than 0".into()));
    }
    if parsed.search.timeout_seconds == 0 {
        return Err(AppError::Config("search.timeout_seconds must be greater than 0".into()));
    }

    let mut defaults = ChannelSettings::default();
    parsed.defaults.apply(&mut defaults);

    let aliases = resolve_aliases(parsed.aliases)?;

    let models_blacklist = parsed
        .completion
        .models_blacklist
        .unwrap_or_else(|| DEFAULT_BLOCKED_MODELS.iter().map(|m| m.to_string()).collect());

    Ok(Config {
        bot_name: b.bot_name,
        log_level,
        completion: CompletionConfig {
            provider: parsed.completion.provider,
            base_url: parsed.completion.base_url,
            timeout_seconds: parsed.completion.timeout_seconds,
        },
        search: SearchConfig {
            timeout_seconds: parsed.search.timeout_seconds,
            native_url: parsed.search.native_url,
            exa_url: parsed.search.exa_url,
        },
        console: ConsoleConfig {
            channel: parsed.console.channel,
            nick: parsed.console.nick,
        },
        channels: StaticChannelConfig::new(defaults, parsed.channels),
        aliases,
        models_blacklist,
        secrets,
    })
}

fn resolve_aliases(raw: HashMap<String, String>) -> Result<HashMap<String, String>, AppError> {
    raw.into_iter()
        .map(|(name, flags)| {
            let name = name.trim().to_lowercase();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(AppError::Config(format!("invalid alias name '{name}'")));
            }
            if RESERVED_COMMANDS.contains(&name.as_str()) {
                return Err(AppError::Config(format!("alias '{name}' shadows a built-in command")));
            }
            Ok((name, flags.trim().to_string()))
        })
        .collect()
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
