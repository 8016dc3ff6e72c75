//! Logging helpers that keep player-typed text on a single log line.

use std::fmt::Write;

const MAX_PREVIEW: usize = 200;

/// Escape a string for single-line logging, truncated to a short preview.
///
/// Newlines, carriage returns, tabs and backslashes become their escaped
/// forms; other control characters become `\xNN`.
pub fn escape_log(s: &str) -> String {
    escape_log_with_limit(s, MAX_PREVIEW)
}

/// Like [`escape_log`] with an explicit character limit; longer input ends in `…`.
pub fn escape_log_with_limit(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= limit {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("buy\n1\r\t\\"), "buy\\n1\\r\\t\\\\");
        assert_eq!(escape_log("a\u{7}b"), "a\\x07b");
    }

    #[test]
    fn truncates_long_input() {
        assert_eq!(escape_log_with_limit("abcdef", 3), "abc…");
        assert_eq!(escape_log_with_limit("abc", 3), "abc");
    }
}
