//! Input validation for free-text form fields.

use regex::Regex;
use std::sync::LazyLock;

// Branch names, revisions, and property names share one restricted
// character set; property values may additionally contain whitespace.
static CLEAN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-/]*$").expect("static regex"));
static CLEAN_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-/\s]*$").expect("static regex"));

/// True for the empty string or anything composed only of word
/// characters, dots, hyphens, and forward slashes.
pub fn is_clean_path_component(s: &str) -> bool {
    CLEAN_PATH.is_match(s)
}

/// Like [`is_clean_path_component`], but whitespace is also allowed.
pub fn is_clean_property_value(s: &str) -> bool {
    CLEAN_VALUE.is_match(s)
}

/// Escape a string for embedding in HTML or in HTML-bound log text.
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
