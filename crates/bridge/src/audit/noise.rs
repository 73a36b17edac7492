//! Noise patterns excluded from auditing.
//!
//! Shells echo their prompt and bare newlines back through the terminal.
//! Those chunks carry no command content and would corrupt the audit buffer,
//! so any chunk matching a [`NoisePattern`] is skipped before the audit state
//! machine sees it.

use serde::{Deserialize, Serialize};

use super::ascii::{CR, HASH, LF, SPACE};
use super::Direction;

/// A chunk shape that is never audited.
///
/// Byte strings are written as TOML/JSON strings, so escapes such as `"\r\n"`
/// work in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoisePattern {
    /// The chunk starts with `prefix` and ends with `suffix`.
    Framed {
        /// Leading bytes.
        prefix: String,
        /// Trailing bytes.
        suffix: String,
    },
    /// The chunk is exactly `bytes`, optionally only in one direction.
    Exact {
        /// The whole chunk.
        bytes: String,
        /// Restrict the match to this direction.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<Direction>,
    },
}

impl NoisePattern {
    /// Pattern matching chunks framed by `prefix` and `suffix`.
    pub fn framed(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::Framed {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Pattern matching exactly `bytes` in either direction.
    pub fn exact(bytes: impl Into<String>) -> Self {
        Self::Exact {
            bytes: bytes.into(),
            direction: None,
        }
    }

    /// Pattern matching exactly `bytes` in one direction.
    pub fn exact_in(direction: Direction, bytes: impl Into<String>) -> Self {
        Self::Exact {
            bytes: bytes.into(),
            direction: Some(direction),
        }
    }

    /// Returns true if `chunk` flowing in `direction` is noise.
    pub fn matches(&self, direction: Direction, chunk: &[u8]) -> bool {
        match self {
            Self::Framed { prefix, suffix } => {
                chunk.len() > 1
                    && chunk.starts_with(prefix.as_bytes())
                    && chunk.ends_with(suffix.as_bytes())
            }
            Self::Exact {
                bytes,
                direction: only,
            } => only.map_or(true, |d| d == direction) && chunk == bytes.as_bytes(),
        }
    }
}

/// The prompt-echo patterns of a `sh-4.3#` root shell.
pub fn default_patterns() -> Vec<NoisePattern> {
    let crlf = bytes_to_string(&[CR, LF]);
    let prompt_end = bytes_to_string(&[HASH, SPACE]);
    vec![
        NoisePattern::framed(crlf.clone(), prompt_end.clone()),
        NoisePattern::framed("sh", prompt_end),
        NoisePattern::exact(crlf),
        NoisePattern::exact_in(Direction::Send, bytes_to_string(&[CR])),
    ]
}

/// Returns true if any pattern matches.
pub fn is_noise(patterns: &[NoisePattern], direction: Direction, chunk: &[u8]) -> bool {
    patterns.iter().any(|p| p.matches(direction, chunk))
}

fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_echo_is_noise() {
        let patterns = default_patterns();
        assert!(is_noise(&patterns, Direction::Send, b"\r\nsh-4.3# "));
        assert!(is_noise(&patterns, Direction::Receive, b"\r\nsh-4.3# "));
    }

    #[test]
    fn test_partial_prompt_is_noise() {
        let patterns = default_patterns();
        assert!(is_noise(&patterns, Direction::Send, b"sh-4.3# "));
    }

    #[test]
    fn test_bare_crlf_is_noise_both_directions() {
        let patterns = default_patterns();
        assert!(is_noise(&patterns, Direction::Send, b"\r\n"));
        assert!(is_noise(&patterns, Direction::Receive, b"\r\n"));
    }

    #[test]
    fn test_single_cr_only_noise_when_sent() {
        let patterns = default_patterns();
        assert!(is_noise(&patterns, Direction::Send, b"\r"));
        assert!(!is_noise(&patterns, Direction::Receive, b"\r"));
    }

    #[test]
    fn test_command_text_is_not_noise() {
        let patterns = default_patterns();
        assert!(!is_noise(&patterns, Direction::Receive, b"ls"));
        assert!(!is_noise(&patterns, Direction::Send, b"\r\ntotal 0\r\n"));
        assert!(!is_noise(&patterns, Direction::Send, b"shell"));
    }

    #[test]
    fn test_framed_needs_two_bytes() {
        let pattern = NoisePattern::framed("#", "#");
        assert!(!pattern.matches(Direction::Send, b"#"));
        assert!(pattern.matches(Direction::Send, b"##"));
    }

    #[test]
    fn test_empty_pattern_list() {
        assert!(!is_noise(&[], Direction::Send, b"\r\n"));
    }

    #[test]
    fn test_patterns_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            noise: Vec<NoisePattern>,
        }

        let toml = r#"
noise = [
    { kind = "framed", prefix = "\r\n", suffix = "$ " },
    { kind = "exact", bytes = "\r", direction = "send" },
]
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.noise[0], NoisePattern::framed("\r\n", "$ "));
        assert_eq!(
            wrapper.noise[1],
            NoisePattern::exact_in(Direction::Send, "\r")
        );
    }
}
