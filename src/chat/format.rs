//! Reply post-processing before the text goes back to the channel.

/// Remove a leading `<nick>:` (and one following space) that some models
/// echo back. Case-insensitive on the nick.
pub fn strip_own_nick(text: &str, nick: &str) -> String {
    if nick.is_empty() {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let matches = bytes.len() > nick.len()
        && bytes[..nick.len()].eq_ignore_ascii_case(nick.as_bytes())
        && bytes[nick.len()] == b':';
    if !matches {
        return text.to_string();
    }
    let rest = &text[nick.len() + 1..];
    rest.strip_prefix(' ').unwrap_or(rest).to_string()
}

/// Split the reply into channel lines. Intact mode keeps every non-empty line;
/// otherwise everything collapses into one space-joined line.
pub fn reply_lines(text: &str, intact: bool) -> Vec<String> {
    if intact {
        text.lines()
            .map(str::trim_end)
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    } else {
        let joined = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() { Vec::new() } else { vec![joined] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_nick() {
        assert_eq!(strip_own_nick("bridgebot: hello", "bridgebot"), "hello");
        assert_eq!(strip_own_nick("bridgebot:hello", "bridgebot"), "hello");
        assert_eq!(strip_own_nick("BridgeBot: hi", "bridgebot"), "hi");
    }

    #[test]
    fn leaves_other_text_alone() {
        assert_eq!(strip_own_nick("hello bridgebot: x", "bridgebot"), "hello bridgebot: x");
        assert_eq!(strip_own_nick("bridgebotx: y", "bridgebot"), "bridgebotx: y");
        assert_eq!(strip_own_nick("bri", "bridgebot"), "bri");
        assert_eq!(strip_own_nick("héllo wörld", "bridgebot"), "héllo wörld");
    }

    #[test]
    fn collapses_by_default() {
        assert_eq!(reply_lines("one\n\n  two\nthree  ", false), ["one two three"]);
    }

    #[test]
    fn intact_keeps_non_empty_lines() {
        assert_eq!(reply_lines("one\n\n  two\nthree  ", true), ["one", "  two", "three"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(reply_lines("\n \n", false).is_empty());
        assert!(reply_lines("", true).is_empty());
    }
}
