//! Tolerant JSON recovery (spec §4.3 steps i-vii).
//!
//! Assistants routinely emit near-JSON: trailing commas, unquoted keys,
//! single-quoted strings, bare word values, inline comments. Each step
//! is applied on top of the previous one's output; we attempt a parse
//! after every step and stop at the first success.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([\]}])").unwrap())
}

fn unquoted_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*:)"#).unwrap())
}

fn single_quoted_string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^'\\]*(?:\\.[^'\\]*)*)'").unwrap())
}

fn bare_identifier_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(:\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*[,\]}])"#).unwrap())
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"//[^\n]*").unwrap())
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").unwrap())
}

fn largest_braces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").unwrap())
}

/// (ii) strip trailing commas before `]`/`}`.
fn strip_trailing_commas(s: &str) -> String {
    trailing_comma_re().replace_all(s, "$1").into_owned()
}

/// (iii) quote unquoted object keys.
fn quote_unquoted_keys(s: &str) -> String {
    unquoted_key_re().replace_all(s, "$1\"$2\"$3").into_owned()
}

/// (iv) convert single-quoted strings to double-quoted.
fn single_to_double_quotes(s: &str) -> String {
    single_quoted_string_re()
        .replace_all(s, |caps: &regex::Captures| format!("\"{}\"", &caps[1]))
        .into_owned()
}

/// (v) quote bare identifier values, except `true`/`false`/`null`.
fn quote_bare_values(s: &str) -> String {
    bare_identifier_value_re()
        .replace_all(s, |caps: &regex::Captures| {
            let ident = &caps[2];
            if matches!(ident, "true" | "false" | "null") {
                caps[0].to_string()
            } else {
                format!("{}\"{}\"{}", &caps[1], ident, &caps[3])
            }
        })
        .into_owned()
}

/// (vi) strip `//` and `/* ... */` comments.
fn strip_comments(s: &str) -> String {
    let no_block = block_comment_re().replace_all(s, "").into_owned();
    line_comment_re().replace_all(&no_block, "").into_owned()
}

/// (vii) extract the largest `{...}` substring.
fn extract_largest_braces(s: &str) -> Option<String> {
    largest_braces_re().find(s).map(|m| m.as_str().to_string())
}

/// Run the recovery pipeline (spec §4.3), returning the first
/// successfully-parsed value.
pub fn tolerant_parse(raw: &str) -> Result<Value, serde_json::Error> {
    // (i) parse as-is
    if let Ok(v) = serde_json::from_str(raw) {
        return Ok(v);
    }

    let mut working = raw.to_string();

    working = strip_trailing_commas(&working);
    if let Ok(v) = serde_json::from_str(&working) {
        return Ok(v);
    }

    working = quote_unquoted_keys(&working);
    if let Ok(v) = serde_json::from_str(&working) {
        return Ok(v);
    }

    working = single_to_double_quotes(&working);
    if let Ok(v) = serde_json::from_str(&working) {
        return Ok(v);
    }

    working = quote_bare_values(&working);
    if let Ok(v) = serde_json::from_str(&working) {
        return Ok(v);
    }

    working = strip_comments(&working);
    if let Ok(v) = serde_json::from_str(&working) {
        return Ok(v);
    }

    if let Some(extracted) = extract_largest_braces(&working) {
        return serde_json::from_str(&extracted);
    }

    // Final attempt so the caller gets a real serde_json::Error, not a
    // synthesized one.
    serde_json::from_str(&working)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json_unchanged() {
        let v = tolerant_parse(r#"{"a":1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn strips_trailing_comma() {
        let v = tolerant_parse(r#"{"a":1,}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn quotes_unquoted_keys() {
        let v = tolerant_parse(r#"{a: 1, b: "two"}"#).unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"], "two");
    }

    #[test]
    fn converts_single_quotes() {
        let v = tolerant_parse(r#"{'a': 'one'}"#).unwrap();
        assert_eq!(v["a"], "one");
    }

    #[test]
    fn quotes_bare_values_but_not_booleans_or_null() {
        let v = tolerant_parse(r#"{"a": running, "b": true, "c": null}"#).unwrap();
        assert_eq!(v["a"], "running");
        assert_eq!(v["b"], true);
        assert!(v["c"].is_null());
    }

    #[test]
    fn strips_line_and_block_comments() {
        let v = tolerant_parse("{\"a\": 1 // trailing\n, /* block */ \"b\": 2}").unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(v["b"], 2);
    }

    #[test]
    fn extracts_largest_braces_from_surrounding_prose() {
        let v = tolerant_parse("Sure thing! {\"a\": 1} Hope that helps.").unwrap();
        assert_eq!(v["a"], 1);
    }
}
