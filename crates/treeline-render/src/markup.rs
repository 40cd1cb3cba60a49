//! Helpers for the small amount of markup handling the formatters need.
//!
//! Stored field values may carry HTML fragments (links, pictures, rich
//! text). Titles are always plain text, output lines are HTML-safe, and a
//! few field types need to peek inside anchors and image tags.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));

static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
        .expect("static regex")
});

static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']*)["']"#).expect("static regex")
});

/// Escapes `&`, `<` and `>` so text can be injected into HTML.
///
/// # Example
///
/// ```rust
/// use treeline_render::markup::escape_html;
///
/// assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            other => result.push(other),
        }
    }
    result
}

/// Reverses [`escape_html`], also decoding quote entities.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Removes every markup tag, keeping the text between tags.
///
/// # Example
///
/// ```rust
/// use treeline_render::markup::strip_markup;
///
/// assert_eq!(strip_markup("<b>bold</b> text"), "bold text");
/// ```
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') {
        return text.to_string();
    }
    TAG_RE.replace_all(text, "").into_owned()
}

/// Extracts `(inner_text, href)` from the first anchor in `text`.
pub fn anchor_parts(text: &str) -> Option<(String, String)> {
    let caps = ANCHOR_RE.captures(text)?;
    let href = caps.get(1).map_or("", |m| m.as_str()).to_string();
    let inner = strip_markup(caps.get(2).map_or("", |m| m.as_str()))
        .trim()
        .to_string();
    Some((inner, href))
}

/// Extracts the `src` attribute of the first image tag in `text`.
pub fn image_source(text: &str) -> Option<String> {
    IMAGE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Splits `text` on `delim`, treating a doubled delimiter as a literal one.
///
/// This is the convention used by choice lists, boolean display pairs and
/// numbering patterns.
///
/// # Example
///
/// ```rust
/// use treeline_render::markup::split_escaped;
///
/// assert_eq!(split_escaped("yes/no", '/'), vec!["yes", "no"]);
/// assert_eq!(split_escaped("n//a/ok", '/'), vec!["n/a", "ok"]);
/// ```
pub fn split_escaped(text: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == delim {
            if chars.peek() == Some(&delim) {
                chars.next();
                current.push(delim);
            } else {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}

/// Returns `true` if `text` holds `delim` on its own, not doubled.
pub fn has_single_delimiter(text: &str, delim: char) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == delim {
            if chars.peek() == Some(&delim) {
                chars.next();
            } else {
                return true;
            }
        }
    }
    false
}

/// Returns the text up to the first line break (newline or `<br>` tag).
pub fn first_line(text: &str) -> &str {
    let newline = text.find('\n');
    let br = text.to_ascii_lowercase().find("<br");
    let cut = match (newline, br) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match cut {
        Some(idx) => text[..idx].trim_end_matches('\r'),
        None => text,
    }
}
