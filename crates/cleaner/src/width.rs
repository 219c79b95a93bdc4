//! Display-column measurement for progress lines.
//!
//! Lengths are counted in terminal columns, not chars, so wide scripts keep
//! the status suffixes aligned.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` so it fits in `max_width` columns. Returns the text and its width.
pub fn truncate_to_width(s: &str, max_width: usize) -> (String, usize) {
    let full = display_width(s);
    if full <= max_width {
        return (s.to_string(), full);
    }

    let mut result = String::new();
    let mut width = 0;
    for c in s.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > max_width {
            break;
        }
        result.push(c);
        width += cw;
    }
    (result, width)
}

/// Append `suffix` so that it ends on column `columns`, padding after `text`.
///
/// `text_width` is the already measured width of `text`. When the line is
/// too long the suffix follows the text directly.
pub fn pad_with_suffix(text: &str, text_width: usize, columns: usize, suffix: &str) -> String {
    let padding = columns.saturating_sub(text_width + display_width(suffix));
    let mut line = String::with_capacity(text.len() + padding + suffix.len());
    line.push_str(text);
    line.extend(std::iter::repeat(' ').take(padding));
    line.push_str(suffix);
    line
}

/// Right-align `text` on a line of `columns` columns.
pub fn right_align(text: &str, columns: usize) -> String {
    pad_with_suffix("", 0, columns, text)
}
