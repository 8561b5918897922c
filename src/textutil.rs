//! Small UTF-8-safe text helpers for log and CLI previews.
//!
//! Fragments and argument values are arbitrary model output; previews must
//! cut on character boundaries and stay on one line.

/// Truncate by characters and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_chars(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let prefix: String = text.chars().take(max_chars).collect();
    format!("{prefix}{suffix}")
}

/// Single-line truncation helper that also flattens newlines to spaces.
pub fn single_line_preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    truncate_with_suffix_by_chars(&flat, max_chars, "...")
}
