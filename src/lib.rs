//! chatbridge turns chat commands into calls against an OpenAI-compatible
//! completion endpoint, with per-channel options, bounded conversation
//! history, optional web-search augmentation and a model blacklist.

pub mod chat;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod llm;
pub mod logger;
pub mod search;
