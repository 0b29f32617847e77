//! Sub-action parsing: `chat`, configured aliases, `reset`, `help`.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `chat [flags] [--] prompt`, or an alias expanded to the same shape.
    Chat { alias: Option<String>, text: String },
    /// Clear every conversation of the current channel.
    Reset,
    Help,
}

/// Parses command lines, expanding aliases into their flag strings.
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    aliases: HashMap<String, String>,
}

impl CommandParser {
    /// `aliases` maps a lowercased alias name to the flags it stands for.
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// `None` for a blank line. A line that does not start with a known
    /// sub-action is chat text in its entirety.
    pub fn parse(&self, line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim_start()),
            None => (line, ""),
        };
        let head = head.to_lowercase();

        Some(match head.as_str() {
            "chat" => Command::Chat { alias: None, text: rest.to_string() },
            "reset" if rest.is_empty() => Command::Reset,
            "help" if rest.is_empty() => Command::Help,
            _ => match self.aliases.get(&head) {
                Some(flags) => Command::Chat { alias: Some(head.clone()), text: expand(flags, rest) },
                None => Command::Chat { alias: None, text: line.to_string() },
            },
        })
    }

    pub fn help_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "chat [--model M] [--temperature T] [--top_p P] [--max_tokens N] [--max_completion_tokens N]".to_string(),
            "     [--presence_penalty X] [--frequency_penalty X] [--web | --no-web] [--] <prompt>".to_string(),
            "reset  clear this channel's conversation history".to_string(),
        ];
        let mut names: Vec<&String> = self.aliases.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("{name} <prompt>  same as: chat {} <prompt>", self.aliases[name]));
        }
        lines
    }
}

fn expand(flags: &str, rest: &str) -> String {
    match (flags.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => flags.to_string(),
        (false, false) => format!("{flags} {rest}"),
    }
}
