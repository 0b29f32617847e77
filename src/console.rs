//! Console channel: reads command lines from stdin, runs them through the
//! [`ChatEngine`], prints replies to stdout.
//!
//! A line may start with `#channel` to address a channel other than the
//! configured one. Runs until the `shutdown` token is cancelled (Ctrl-C) or
//! stdin is closed. Each command gets a child token, so Ctrl-C also abandons
//! an in-flight completion.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::{ChatEngine, ChatError, ChatRequest};
use crate::command::{Command, CommandParser};
use crate::config::ConsoleConfig;
use crate::error::AppError;

pub struct Console {
    engine: Arc<ChatEngine>,
    parser: CommandParser,
    config: ConsoleConfig,
}

impl Console {
    pub fn new(engine: Arc<ChatEngine>, parser: CommandParser, config: ConsoleConfig) -> Self {
        Self { engine, parser, config }
    }

    /// Interactive loop on the process's stdin/stdout.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), AppError> {
        println!("─────────────────────────────────");
        println!(" chatbridge console  (Ctrl-C to quit, 'help' for commands)");
        println!("─────────────────────────────────");
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with(stdin, std::io::stdout(), shutdown, true).await
    }

    /// Loop over any line source. `prompt` toggles the `> ` marker.
    pub async fn run_with<R, W>(
        &self,
        reader: R,
        mut out: W,
        shutdown: CancellationToken,
        prompt: bool,
    ) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        info!(channel = %self.config.channel, nick = %self.config.nick, "console channel started");
        let mut lines = reader.lines();

        loop {
            if prompt {
                write!(out, "> ")?;
                out.flush()?;
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("console shutting down");
                    break;
                }

                line = lines.next_line() => {
                    match line {
                        Err(e) => {
                            warn!("console read error: {e}");
                            break;
                        }
                        Ok(None) => {
                            info!("console stdin closed");
                            break;
                        }
                        Ok(Some(input)) => {
                            for reply in self.handle_line(&input, &shutdown).await {
                                writeln!(out, "{reply}")?;
                            }
                            out.flush()?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Run one input line and return what should be printed.
    pub async fn handle_line(&self, input: &str, shutdown: &CancellationToken) -> Vec<String> {
        let (channel, rest) = split_channel(input.trim(), &self.config.channel);
        let Some(command) = self.parser.parse(rest) else {
            return Vec::new();
        };
        debug!(%channel, ?command, "console command");

        match command {
            Command::Help => self.parser.help_lines(),
            Command::Reset => {
                let cleared = self.engine.reset(channel);
                vec![format!("history cleared for {channel} ({cleared} conversation(s))")]
            }
            Command::Chat { alias, text } => {
                let mut request = ChatRequest::new(channel, self.config.nick.clone(), text);
                if let Some(alias) = alias {
                    request = request.with_alias(alias);
                }
                let cancel = shutdown.child_token();
                match self.engine.chat(&request, &cancel).await {
                    Ok(Some(reply)) => reply.rendered(&self.config.nick),
                    Ok(None) => Vec::new(),
                    Err(ChatError::Cancelled) => vec!["(cancelled)".to_string()],
                    Err(e) => vec![format!("error: {e}")],
                }
            }
        }
    }
}

/// Peel an optional leading `#channel` token off the line.
fn split_channel<'a>(line: &'a str, default: &'a str) -> (&'a str, &'a str) {
    if line.starts_with('#') {
        match line.split_once(char::is_whitespace) {
            Some((channel, rest)) => (channel, rest.trim_start()),
            None => (line, ""),
        }
    } else {
        (default, line)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::chat::gate::ModelBlacklist;
    use crate::chat::settings::{ChannelSettings, StaticChannelConfig, WebMode};
    use crate::llm::CompletionProvider;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::search::SearchEngines;

    fn console() -> Console {
        let settings = ChannelSettings { web_mode: WebMode::Off, nick_include: false, ..Default::default() };
        let engine = ChatEngine::new(
            "bridgebot",
            Arc::new(StaticChannelConfig::new(settings, HashMap::new())),
            ModelBlacklist::default(),
            SearchEngines::none(),
            CompletionProvider::Dummy(DummyProvider),
        );
        let parser = CommandParser::new(HashMap::from([("pro".to_string(), "--model openai/o1-pro".to_string())]));
        Console::new(Arc::new(engine), parser, ConsoleConfig { channel: "#console".into(), nick: "op".into() })
    }

    #[test]
    fn channel_prefix_is_optional() {
        assert_eq!(split_channel("#rust chat hi", "#console"), ("#rust", "chat hi"));
        assert_eq!(split_channel("chat hi", "#console"), ("#console", "chat hi"));
        assert_eq!(split_channel("#rust", "#console"), ("#rust", ""));
    }

    #[tokio::test]
    async fn chat_and_errors_render_as_lines() {
        let c = console();
        let token = CancellationToken::new();
        assert_eq!(c.handle_line("hello", &token).await, ["[echo] hello"]);
        assert_eq!(
            c.handle_line("pro hi", &token).await,
            ["error: model openai/o1-pro is not allowed"]
        );
        let bad = c.handle_line("chat --bogus hi", &token).await;
        assert!(bad[0].starts_with("error: invalid option --bogus"), "{bad:?}");
    }

    #[tokio::test]
    async fn reset_targets_the_addressed_channel() {
        let c = console();
        let token = CancellationToken::new();
        c.handle_line("#a chat one", &token).await;
        c.handle_line("#b chat two", &token).await;
        assert_eq!(c.handle_line("#a reset", &token).await, ["history cleared for #a (1 conversation(s))"]);
        assert_eq!(c.engine.store().scope_count(), 1);
    }

    #[tokio::test]
    async fn loop_runs_until_input_ends() {
        let c = console();
        let input: &[u8] = b"chat first\n\nhelp\n";
        let mut out = Vec::new();
        c.run_with(input, &mut out, CancellationToken::new(), false).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("[echo] first\n"), "{text}");
        assert!(text.contains("reset  clear"));
        assert!(text.contains("pro <prompt>"));
    }

    #[tokio::test]
    async fn cancelled_shutdown_stops_immediately() {
        let c = console();
        let token = CancellationToken::new();
        token.cancel();
        let mut out = Vec::new();
        c.run_with(&b"chat never\n"[..], &mut out, token, false).await.unwrap();
        assert!(out.is_empty());
    }
}
