//! Utility functions for text cleanup, truncation, and HTML escaping.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static MARKDOWN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```|[*_#>`~]").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Strip HTML tags and Markdown symbols from text and normalize whitespace.
///
/// Used to sanitize scraped fragments before they are interpolated into
/// prompts or rendered summaries.
pub fn clean_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = TAG_RE.replace_all(text, " ");
    let text = MARKDOWN_RE.replace_all(&text, " ");
    let text = text.replace('\n', " ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Collapse runs of two or more newlines into a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").to_string()
}

/// Truncate a string to at most `max` characters.
///
/// Character-based rather than byte-based so CJK text never splits a
/// codepoint.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and a count of
/// the characters dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        format!("{}…(+{} chars)", truncate_chars(s, max), total - max)
    }
}

/// Escape a string for safe interpolation into HTML text or attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When a model response is cut off the resulting JSON fails with an EOF
/// error; callers use this to decide whether re-asking once is worthwhile.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}
