//! chatbridge console entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build completion provider, search engines, blacklist, chat engine
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run the console until shutdown or EOF

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use chatbridge::chat::ChatEngine;
use chatbridge::command::CommandParser;
use chatbridge::console::Console;
use chatbridge::error::AppError;
use chatbridge::search::SearchEngines;
use chatbridge::{config, llm, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();
    logger::init(effective_log_level, force_cli_level)?;

    info!(
        bot_name = %config.bot_name,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        provider = %config.completion.provider,
        "config loaded"
    );

    let provider = llm::providers::build(&config.completion, config.secrets.llm_api_key.clone())
        .map_err(|e| AppError::Provider(e.to_string()))?;
    if let Err(e) = provider.check_ready() {
        tracing::warn!(error = %e, "completion provider not ready; chat commands will fail until configured");
    }

    let engines = SearchEngines::build(
        &config.search,
        config.secrets.brave_api_key.clone(),
        config.secrets.exa_api_key.clone(),
    )
    .map_err(|e| AppError::Config(e.to_string()))?;
    info!(engines = ?engines.available(), "search engines ready");

    let blacklist = config.blacklist();
    info!(blocked = ?blacklist.list(), "model blacklist loaded");

    let engine = Arc::new(ChatEngine::new(
        config.bot_name.clone(),
        Arc::new(config.channels.clone()),
        blacklist,
        engines,
        provider,
    ));
    let console = Console::new(engine, CommandParser::new(config.aliases.clone()), config.console.clone());

    // Ctrl-C cancels this; the console and in-flight requests watch it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    console.run(shutdown).await?;
    info!("chatbridge stopped");
    Ok(())
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: chatbridge [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // -v warn, -vv info, -vvv debug (routing, search decisions),
    // -vvvv trace (full request payloads).
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
