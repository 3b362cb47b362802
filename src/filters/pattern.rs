//! Translation of filter patterns into regular expressions.
//!
//! Supported syntax: `*` wildcard, `^` separator placeholder, `|` start/end
//! anchors, `||` domain anchor, and `/.../` raw regular expressions.

use regex::{Regex, RegexBuilder};

/// Matches a single separator character or the end of the address.
const SEPARATOR: &str = r"(?:[\x00-\x24\x26-\x2C\x2F\x3A-\x40\x5B-\x5E\x60\x7B-\x7F]|$)";

/// Matches the scheme and any subdomain prefix of a `||` anchored pattern.
const DOMAIN_ANCHOR: &str = r"^[\w\-]+:/+(?:[^/]+\.)?";

/// Compile a pattern; matching is case-insensitive unless `match_case` is set.
pub fn compile(pattern: &str, match_case: bool) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&to_regex_source(pattern))
        .case_insensitive(!match_case)
        .build()
}

/// Regular expression source for a pattern.
pub fn to_regex_source(pattern: &str) -> String {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        return pattern[1..pattern.len() - 1].to_string();
    }

    let mut text = collapse_wildcards(pattern);
    if text.ends_with("^|") {
        text.pop();
    }

    let (prefix, body) = if let Some(rest) = text.strip_prefix("||") {
        (DOMAIN_ANCHOR, rest)
    } else if let Some(rest) = text.strip_prefix('|') {
        ("^", rest)
    } else {
        ("", text.as_str())
    };
    let (body, suffix) = match body.strip_suffix('|') {
        Some(rest) => (rest, "$"),
        None => (body, ""),
    };

    let body = if prefix.is_empty() {
        body.trim_start_matches('*')
    } else {
        body
    };
    let body = if suffix.is_empty() {
        body.trim_end_matches('*')
    } else {
        body
    };

    let mut source = String::with_capacity(prefix.len() + body.len() * 2);
    source.push_str(prefix);
    let mut buf = [0u8; 4];
    for ch in body.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '^' => source.push_str(SEPARATOR),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push_str(suffix);
    source
}

/// Number of literal characters in a pattern, used to rank specificity.
pub fn literal_len(pattern: &str) -> usize {
    pattern
        .chars()
        .filter(|c| !matches!(c, '*' | '^' | '|'))
        .count()
}

fn collapse_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut previous_star = false;
    for ch in pattern.chars() {
        if ch == '*' {
            if !previous_star {
                out.push(ch);
            }
            previous_star = true;
        } else {
            out.push(ch);
            previous_star = false;
        }
    }
    out
}
