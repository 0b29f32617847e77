//! The shipped `config/default.toml` parses and matches the built-in defaults.

use std::path::Path;

use chatbridge::chat::settings::{ChannelConfigProvider, ChannelSettings, ContextScope, WebMode};
use chatbridge::command::{Command, CommandParser};
use chatbridge::config::{DEFAULT_CONFIG_PATH, Secrets, load_from};

#[test]
fn default_config_parses() {
    let cfg = load_from(Path::new(DEFAULT_CONFIG_PATH), None, Secrets::default()).unwrap();
    assert_eq!(cfg.bot_name, "chatbridge");
    assert_eq!(cfg.completion.provider, "openai-compatible");
    assert_eq!(cfg.completion.timeout_seconds, 60);
    assert_eq!(cfg.search.timeout_seconds, 15);
    assert_eq!(cfg.console.channel, "#console");
}

#[test]
fn default_config_matches_builtin_channel_defaults() {
    let cfg = load_from(Path::new(DEFAULT_CONFIG_PATH), None, Secrets::default()).unwrap();
    assert_eq!(cfg.channels.defaults(), &ChannelSettings::default());

    let console = cfg.channels.settings("#console");
    assert!(console.web_show_sources);
    assert_eq!(console.context_scope, ContextScope::ChannelModel);
    assert_eq!(console.web_mode, WebMode::Auto);
}

#[test]
fn default_config_blocks_o1_pro() {
    let cfg = load_from(Path::new(DEFAULT_CONFIG_PATH), None, Secrets::default()).unwrap();
    assert!(cfg.blacklist().is_blocked("openai/o1-pro"));
}

#[test]
fn default_aliases_expand() {
    let cfg = load_from(Path::new(DEFAULT_CONFIG_PATH), None, Secrets::default()).unwrap();
    let parser = CommandParser::new(cfg.aliases);
    assert_eq!(
        parser.parse("grok hello"),
        Some(Command::Chat { alias: Some("grok".into()), text: "--model x-ai/grok-4 hello".into() })
    );
}

#[test]
fn ordinary_prompts_starting_with_web_stay_plain_chat() {
    let cfg = load_from(Path::new(DEFAULT_CONFIG_PATH), None, Secrets::default()).unwrap();
    let parser = CommandParser::new(cfg.aliases);
    assert_eq!(
        parser.parse("web development tips"),
        Some(Command::Chat { alias: None, text: "web development tips".into() })
    );
    assert_eq!(
        parser.parse("websearch rust news"),
        Some(Command::Chat { alias: Some("websearch".into()), text: "--web rust news".into() })
    );
}
