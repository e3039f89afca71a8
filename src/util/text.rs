use std::borrow::Cow;

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal columns a string occupies.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: char = '…';

/// Cut `s` to at most `max_width` columns, ending in `…` when shortened.
///
/// Borrows when the string already fits.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - 1;
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    let mut out = String::with_capacity(end + ELLIPSIS.len_utf8());
    out.push_str(&s[..end]);
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Drop control characters and escape sequences from names read off disk
/// or out of imported source files. Tabs become spaces.
pub fn sanitize_line(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\t' => out.push(' '),
            '\u{1b}' => {
                // Skip a CSI sequence through its final byte
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&next) {
                            break;
                        }
                    }
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Compact age of a unix timestamp: `5m`, `3h`, `2d`, then `Mar 04`.
pub fn format_relative_time(timestamp: i64, now: i64) -> String {
    if timestamp <= 0 {
        return "never".to_string();
    }
    let diff = now - timestamp;
    if diff < 60 {
        return "now".to_string();
    }
    if diff < 3_600 {
        return format!("{}m", diff / 60);
    }
    if diff < 86_400 {
        return format!("{}h", diff / 3_600);
    }
    if diff < 604_800 {
        return format!("{}d", diff / 86_400);
    }
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %d").to_string())
        .unwrap_or_default()
}

/// Human file size with one decimal above a kilobyte.
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes.max(0));
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_fits_borrows() {
        assert!(matches!(truncate_to_width("Short", 10), Cow::Borrowed("Short")));
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello W…");
        assert_eq!(display_width(&truncate_to_width("Hello World", 8)), 8);
        assert_eq!(truncate_to_width("Hello", 0), "");
        assert_eq!(truncate_to_width("Hello", 1), "…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK char is two columns; never split one
        let out = truncate_to_width("你好世界", 6);
        assert_eq!(out, "你好…");
        assert!(display_width(&out) <= 6);
    }

    #[test]
    fn test_sanitize_strips_escapes() {
        assert_eq!(sanitize_line("plain"), "plain");
        assert_eq!(sanitize_line("a\u{1b}[31mred\u{1b}[0m\tb"), "ared b");
        assert_eq!(sanitize_line("bell\u{7}"), "bell");
    }

    #[test]
    fn test_relative_time() {
        let now = 1_700_000_000;
        assert_eq!(format_relative_time(0, now), "never");
        assert_eq!(format_relative_time(now - 10, now), "now");
        assert_eq!(format_relative_time(now - 300, now), "5m");
        assert_eq!(format_relative_time(now - 7_200, now), "2h");
        assert_eq!(format_relative_time(now - 172_800, now), "2d");
        assert_eq!(format_relative_time(now + 500, now), "now");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
