//! Option resolution: call-level flags over channel settings over defaults.
//!
//! The command text after the sub-action looks like
//! `[--flag value | --flag=value | --web | --no-web]... [--] prompt`.
//! Flag parsing stops at `--` or at the first token that is not a flag; the
//! rest of the text, spacing intact, is the prompt.

use chrono::NaiveDate;

use super::ChatError;
use super::settings::{ChannelSettings, ContextScope, SearchContextSize, WebEngine, WebMode};
use crate::llm::TokenLimit;

/// Flags given on a single call. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallFlags {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_completion_tokens: Option<u32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    /// `Some(true)` for `--web`, `Some(false)` for `--no-web`.
    pub web: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatArgs {
    pub flags: CallFlags,
    pub prompt: String,
}

#[derive(Debug, Clone, Copy)]
enum ValueFlag {
    Model,
    Temperature,
    TopP,
    MaxCompletionTokens,
    MaxTokens,
    PresencePenalty,
    FrequencyPenalty,
}

impl ValueFlag {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "model" => ValueFlag::Model,
            "temperature" | "temp" => ValueFlag::Temperature,
            "top_p" => ValueFlag::TopP,
            "max_completion_tokens" => ValueFlag::MaxCompletionTokens,
            "max_tokens" => ValueFlag::MaxTokens,
            "presence_penalty" => ValueFlag::PresencePenalty,
            "frequency_penalty" => ValueFlag::FrequencyPenalty,
            _ => return None,
        })
    }
}

impl CallFlags {
    fn set(&mut self, flag: ValueFlag, given_as: &str, raw: &str) -> Result<(), ChatError> {
        match flag {
            ValueFlag::Model => self.model = Some(raw.to_string()),
            ValueFlag::Temperature => self.temperature = Some(parse_float(given_as, raw)?),
            ValueFlag::TopP => self.top_p = Some(parse_float(given_as, raw)?),
            ValueFlag::MaxCompletionTokens => self.max_completion_tokens = Some(parse_count(given_as, raw)?),
            ValueFlag::MaxTokens => self.max_tokens = Some(parse_count(given_as, raw)?),
            ValueFlag::PresencePenalty => self.presence_penalty = Some(parse_float(given_as, raw)?),
            ValueFlag::FrequencyPenalty => self.frequency_penalty = Some(parse_float(given_as, raw)?),
        }
        Ok(())
    }
}

fn invalid(flag: impl Into<String>, reason: impl Into<String>) -> ChatError {
    ChatError::InvalidOption { flag: flag.into(), reason: reason.into() }
}

fn parse_float(flag: &str, raw: &str) -> Result<f64, ChatError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(flag, format!("expected a number, got '{raw}'")))
}

fn parse_count(flag: &str, raw: &str) -> Result<u32, ChatError> {
    raw.parse::<u32>()
        .map_err(|_| invalid(flag, format!("expected a non-negative integer, got '{raw}'")))
}

/// Split off the next whitespace-delimited token. The remainder keeps its
/// leading whitespace so the prompt can be sliced out verbatim.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// Parse call flags and the prompt out of the command text.
pub fn parse_args(text: &str) -> Result<ChatArgs, ChatError> {
    let mut flags = CallFlags::default();
    let mut rest = text;

    while let Some((token, after)) = next_token(rest) {
        if token == "--" {
            rest = after;
            break;
        }
        let Some(body) = token.strip_prefix("--") else {
            break;
        };
        let (name, inline) = match body.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (body, None),
        };
        let given_as = format!("--{name}");

        if name == "web" || name == "no-web" {
            if inline.is_some() {
                return Err(invalid(given_as, "takes no value"));
            }
            let on = name == "web";
            if flags.web == Some(!on) {
                return Err(invalid("--web/--no-web", "flags are mutually exclusive"));
            }
            flags.web = Some(on);
            rest = after;
            continue;
        }

        let flag = ValueFlag::from_name(name).ok_or_else(|| invalid(&given_as, "unrecognized flag"))?;
        let (value, after_value) = match inline {
            Some(v) => (v, after),
            None => next_token(after).ok_or_else(|| invalid(&given_as, "missing value"))?,
        };
        if value.is_empty() || value.starts_with("--") {
            return Err(invalid(&given_as, "missing value"));
        }
        flags.set(flag, &given_as, value)?;
        rest = after_value;
    }

    Ok(ChatArgs { flags, prompt: rest.trim().to_string() })
}

/// The fully resolved, immutable configuration for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub model: String,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub token_limit: Option<TokenLimit>,
    pub system_prompt: String,
    pub web_mode: WebMode,
    /// `--web` was given on this call.
    pub web_forced: bool,
    pub web_engine: WebEngine,
    pub web_max_results: usize,
    pub web_search_context_size: SearchContextSize,
    pub web_search_prompt: String,
    pub web_show_sources: bool,
    pub context_scope: ContextScope,
    pub max_history: usize,
    pub nick_include: bool,
    pub nick_strip: bool,
    pub nick_prefix: bool,
    pub reply_intact: bool,
}

impl EffectiveConfig {
    pub fn max_completion_tokens(&self) -> Option<u32> {
        match self.token_limit {
            Some(TokenLimit::MaxCompletionTokens(n)) => Some(n),
            _ => None,
        }
    }

    pub fn max_tokens(&self) -> Option<u32> {
        match self.token_limit {
            Some(TokenLimit::MaxTokens(n)) => Some(n),
            _ => None,
        }
    }
}

/// First present value wins: call `max_completion_tokens`, call `max_tokens`,
/// channel `max_completion_tokens` (> 0), channel `max_tokens` (> 0).
fn token_limit(flags: &CallFlags, settings: &ChannelSettings) -> Option<TokenLimit> {
    if let Some(n) = flags.max_completion_tokens {
        return Some(TokenLimit::MaxCompletionTokens(n));
    }
    if let Some(n) = flags.max_tokens {
        return Some(TokenLimit::MaxTokens(n));
    }
    if settings.max_completion_tokens > 0 {
        return Some(TokenLimit::MaxCompletionTokens(settings.max_completion_tokens));
    }
    if settings.max_tokens > 0 {
        return Some(TokenLimit::MaxTokens(settings.max_tokens));
    }
    None
}

/// Substitute `$botnick`, then inject the date: in place of `$date` when the
/// template has it, appended otherwise.
pub fn render_system_prompt(template: &str, bot_nick: &str, today: NaiveDate) -> String {
    let date = today.format("%Y-%m-%d").to_string();
    let prompt = template.replace("$botnick", bot_nick);
    if prompt.contains("$date") {
        prompt.replace("$date", &date)
    } else if prompt.trim().is_empty() {
        format!("Current date: {date} (UTC).")
    } else {
        format!("{}\n\nCurrent date: {date} (UTC).", prompt.trim_end())
    }
}

/// Turns command text plus channel settings into an [`EffectiveConfig`].
#[derive(Debug, Clone)]
pub struct OptionResolver {
    bot_nick: String,
    today: NaiveDate,
}

impl OptionResolver {
    pub fn new(bot_nick: impl Into<String>, today: NaiveDate) -> Self {
        Self { bot_nick: bot_nick.into(), today }
    }

    /// Parse `text` and resolve it against `settings`. Returns the effective
    /// config and the bare prompt.
    pub fn resolve(&self, text: &str, settings: &ChannelSettings) -> Result<(EffectiveConfig, String), ChatError> {
        let args = parse_args(text)?;
        if args.prompt.is_empty() {
            return Err(ChatError::MissingPrompt);
        }
        Ok((self.build(&args.flags, settings), args.prompt))
    }

    pub fn build(&self, flags: &CallFlags, settings: &ChannelSettings) -> EffectiveConfig {
        let web_mode = match flags.web {
            Some(true) => WebMode::Always,
            Some(false) => WebMode::Off,
            None => settings.web_mode,
        };

        EffectiveConfig {
            model: flags.model.clone().unwrap_or_else(|| settings.model.clone()),
            temperature: flags.temperature.or(settings.temperature),
            top_p: flags.top_p.or(settings.top_p),
            presence_penalty: flags.presence_penalty.or(settings.presence_penalty),
            frequency_penalty: flags.frequency_penalty.or(settings.frequency_penalty),
            token_limit: token_limit(flags, settings),
            system_prompt: render_system_prompt(&settings.prompt, &self.bot_nick, self.today),
            web_mode,
            web_forced: flags.web == Some(true),
            web_engine: settings.web_engine,
            web_max_results: settings.web_max_results.max(1) as usize,
            web_search_context_size: settings.web_search_context_size,
            web_search_prompt: settings.web_search_prompt.clone(),
            web_show_sources: settings.web_show_sources,
            context_scope: settings.context_scope,
            max_history: settings.max_history,
            nick_include: settings.nick_include,
            nick_strip: settings.nick_strip,
            nick_prefix: settings.nick_prefix,
            reply_intact: settings.reply_intact,
        }
    }
}
