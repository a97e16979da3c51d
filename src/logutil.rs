//! Keeps chat-supplied text (player names, raw command lines) on a single log line.

use std::fmt::Write;

/// Longest chat fragment copied into a log record.
const MAX_LOGGED_CHARS: usize = 120;

/// Escape control characters and cap length so a chat string cannot forge log lines.
///
/// Newlines, carriage returns and tabs become `\n`, `\r`, `\t`; other control
/// characters become `\xNN`; a backslash is doubled.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_LOGGED_CHARS) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_LOGGED_CHARS {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// First line of a multi-message reply, escaped, for debug traces.
pub fn first_line(messages: &[String]) -> String {
    messages
        .first()
        .and_then(|m| m.lines().next())
        .map(escape_log)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("bob\n/roll\t\x07"), "bob\\n/roll\\t\\x07");
        assert_eq!(escape_log("a\\b"), "a\\\\b");
    }

    #[test]
    fn truncates_long_names() {
        let long = "x".repeat(500);
        let esc = escape_log(&long);
        assert!(esc.ends_with('…'));
        assert_eq!(esc.chars().count(), MAX_LOGGED_CHARS + 1);
    }

    #[test]
    fn first_line_of_reply() {
        let reply = vec!["Turn order\n1. a".to_string(), "next".to_string()];
        assert_eq!(first_line(&reply), "Turn order");
        assert_eq!(first_line(&[]), "");
    }
}
