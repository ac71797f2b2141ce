//! Small helpers shared by the publisher, the router and the built-in commands.

use std::time::Duration;

/// Marker appended to truncated text.
pub const ELLIPSIS: char = '…';

/// Truncates `text` to at most `max_chars` characters.
///
/// Characters are counted as Unicode scalar values, so multi-byte text is never
/// split in the middle of a character. When truncation happens the last kept
/// character is replaced by [`ELLIPSIS`], so the result is still exactly
/// `max_chars` long.
///
/// # Arguments
///
/// * `text` - The text to shorten
/// * `max_chars` - Maximum number of characters of the result
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("abcdef", 4), "abc…");
/// assert_eq!(truncate_chars("abc", 4), "abc");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    if max_chars == 0 {
        return String::new();
    }

    let mut truncated: String = text.chars().take(max_chars - 1).collect();
    truncated.push(ELLIPSIS);
    truncated
}

/// Converts a duration to whole milliseconds, rounding up.
///
/// A non-zero duration never rounds down to `0`, so a cooldown rejection always
/// reports a positive wait.
pub fn ceil_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis() + u128::from(duration.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Formats a millisecond count as seconds with one decimal, rounding up, e.g. `3.8s`.
pub fn format_seconds(millis: u64) -> String {
    let tenths = millis.div_ceil(100);
    format!("{}.{}s", tenths / 10, tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_is_unchanged() {
        assert_eq!(truncate_chars("ping", 100), "ping");
        assert_eq!(truncate_chars("", 100), "");
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "a".repeat(150);
        let truncated = truncate_chars(&long, 100);

        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "é".repeat(101);
        let truncated = truncate_chars(&text, 100);

        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.starts_with("éé"));
    }

    #[test]
    fn test_ceil_millis() {
        assert_eq!(ceil_millis(Duration::from_millis(3800)), 3800);
        assert_eq!(ceil_millis(Duration::from_nanos(1)), 1);
        assert_eq!(ceil_millis(Duration::from_micros(1500)), 2);
        assert_eq!(ceil_millis(Duration::ZERO), 0);
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(3800), "3.8s");
        assert_eq!(format_seconds(1), "0.1s");
        assert_eq!(format_seconds(5000), "5.0s");
        assert_eq!(format_seconds(999), "1.0s");
    }
}
