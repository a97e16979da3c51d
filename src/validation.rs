//! Input checks for values that arrive from chat: session keys, display names and
//! square arguments.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

/// Longest accepted session key (chat id, channel name, ...).
pub const MAX_SESSION_KEY_LEN: usize = 128;

/// Longest display name kept for a player.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Session key cannot be empty")]
    Empty,

    #[error("Session key is too long (maximum {max} bytes)")]
    TooLong { max: usize },

    #[error("Session key contains control characters")]
    ControlCharacters,
}

/// Check a session key before it is used for locking or as a file name.
pub fn validate_session_key(key: &str) -> Result<String, KeyError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(KeyError::Empty);
    }
    if trimmed.len() > MAX_SESSION_KEY_LEN {
        return Err(KeyError::TooLong {
            max: MAX_SESSION_KEY_LEN,
        });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(KeyError::ControlCharacters);
    }
    Ok(trimmed.to_string())
}

/// Filesystem-safe document name for a session key.
pub fn session_file_name(key: &str) -> String {
    format!("{}.json", utf8_percent_encode(key, NON_ALPHANUMERIC))
}

/// Display name as shown in game messages.
///
/// Control characters are dropped and the result is capped; an empty result falls
/// back to `Player <id>`.
pub fn display_name(raw: &str, user_id: i64) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_DISPLAY_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        format!("Player {}", user_id)
    } else {
        cleaned.to_string()
    }
}

/// Square argument with runs of whitespace collapsed, so `/sell Detention   Center`
/// still names the square.
pub fn normalize_square_arg(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys() {
        assert_eq!(validate_session_key("  -100123 ").unwrap(), "-100123");
        assert_eq!(validate_session_key("   "), Err(KeyError::Empty));
        assert_eq!(
            validate_session_key(&"k".repeat(200)),
            Err(KeyError::TooLong {
                max: MAX_SESSION_KEY_LEN
            })
        );
        assert_eq!(
            validate_session_key("a\nb"),
            Err(KeyError::ControlCharacters)
        );
    }

    #[test]
    fn file_names_are_path_safe() {
        assert_eq!(session_file_name("chat42"), "chat42.json");
        assert_eq!(session_file_name("-1001"), "%2D1001.json");
        let traversal = session_file_name("../etc/passwd");
        assert!(!traversal.contains('/'));
        assert!(!traversal.starts_with(".."));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name(" alice ", 1), "alice");
        assert_eq!(display_name("\u{7}", 9), "Player 9");
        assert_eq!(
            display_name(&"n".repeat(80), 1).chars().count(),
            MAX_DISPLAY_NAME_CHARS
        );
    }

    #[test]
    fn square_arguments() {
        assert_eq!(
            normalize_square_arg("  Detention   Center ").as_deref(),
            Some("Detention Center")
        );
        assert_eq!(normalize_square_arg(" \t "), None);
    }
}
