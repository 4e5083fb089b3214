//! Tolerant parsing of model responses into structured data

use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const FENCE: &str = "```";

/// Marker stored under `error` in the sentinel value of a failed parse
pub const PARSE_FAILED: &str = "parse-failed";

/// Outcome of parsing one raw model response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Structured(Value),
    Failure(ParseFailure),
}

/// A response that could not be parsed; `raw` is the unmodified model text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub raw: String,
    pub reason: String,
}

impl ParseFailure {
    /// Structured stand-in that flows downstream in place of the parsed value
    pub fn sentinel(&self) -> Value {
        json!({ "error": PARSE_FAILED, "raw": self.raw })
    }
}

impl ParsedResponse {
    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedResponse::Structured(_))
    }

    /// Collapse into a value, substituting the sentinel on failure
    pub fn into_value(self) -> Value {
        match self {
            ParsedResponse::Structured(value) => value,
            ParsedResponse::Failure(failure) => failure.sentinel(),
        }
    }
}

/// True if `value` is the stand-in produced for a failed parse
pub fn is_sentinel(value: &Value) -> bool {
    value.get("error").and_then(Value::as_str) == Some(PARSE_FAILED)
}

/// Parse a raw model response, tolerating code fences around the payload.
///
/// Never fails: malformed input comes back as [`ParsedResponse::Failure`]
/// carrying the original text.
pub fn parse(raw: &str) -> ParsedResponse {
    let cleaned = strip_fences(raw);

    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => ParsedResponse::Structured(value),
        Err(e) => {
            error!("Failed to parse model response as JSON ({}). Raw output: {}", e, raw);
            ParsedResponse::Failure(ParseFailure {
                raw: raw.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Parse and collapse to a value in one step
pub fn parse_or_sentinel(raw: &str) -> Value {
    parse(raw).into_value()
}

/// Remove a leading fence (with or without a language tag) and a trailing fence
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = &rest[language_tag_len(rest)..];
    }

    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }

    text.trim()
}

/// Length of a language tag (`json`, `JSON`, `json5`) opening the fenced body.
///
/// A tag starts with a letter, is not a JSON literal and is followed by
/// whitespace or the start of an object or array, so `true` in "```true```"
/// stays part of the body.
fn language_tag_len(body: &str) -> usize {
    let end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')))
        .unwrap_or(body.len());
    let tag = &body[..end];

    let starts_with_letter = tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let is_literal = matches!(tag, "true" | "false" | "null");
    let delimited = body[end..]
        .chars()
        .next()
        .is_some_and(|c| c.is_whitespace() || c == '{' || c == '[');

    if starts_with_letter && !is_literal && delimited {
        end
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_parses() {
        let parsed = parse(r#"{"role_title": "Data Engineer", "years": 5}"#);
        assert_eq!(
            parsed,
            ParsedResponse::Structured(json!({"role_title": "Data Engineer", "years": 5}))
        );
    }

    #[test]
    fn test_fenced_json_with_language_tag() {
        let parsed = parse("```json\n{\"a\":1}\n```");
        assert_eq!(parsed, ParsedResponse::Structured(json!({"a": 1})));
    }

    #[test]
    fn test_fences_yield_same_value_as_bare_text() {
        let body = r#"{"strengths": ["rust", "sql"], "gaps": []}"#;
        let bare = parse(body);
        let tagged = parse(&format!("```json\n{}\n```", body));
        let untagged = parse(&format!("```\n{}\n```", body));
        let inline_tag = parse(&format!("```JSON{}```", body));

        assert!(bare.is_structured());
        assert_eq!(bare, tagged);
        assert_eq!(bare, untagged);
        assert_eq!(bare, inline_tag);
    }

    #[test]
    fn test_fenced_scalars_are_not_mistaken_for_tags() {
        assert_eq!(parse("```true```"), parse("true"));
        assert_eq!(parse("```null```"), ParsedResponse::Structured(Value::Null));
        assert_eq!(parse("```\n42\n```"), ParsedResponse::Structured(json!(42)));
        assert_eq!(parse("```json\ntrue\n```"), ParsedResponse::Structured(json!(true)));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let parsed = parse("  \n```json\n{\"ok\": true}\n```\n\n");
        assert_eq!(parsed, ParsedResponse::Structured(json!({"ok": true})));
    }

    #[test]
    fn test_malformed_input_keeps_original_raw_text() {
        let raw = "```json\n{\"a\": 1,,}\n```  ";
        match parse(raw) {
            ParsedResponse::Failure(failure) => {
                assert_eq!(failure.raw, raw);
                assert!(!failure.reason.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_prose_and_empty_input_fail_without_panicking() {
        for raw in ["Sorry, I cannot help with that.", "", "```", "``````", "{", "Error: Could not generate content."] {
            assert!(!parse(raw).is_structured(), "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_sentinel_shape() {
        let value = parse_or_sentinel("not json");
        assert_eq!(value, json!({"error": "parse-failed", "raw": "not json"}));
        assert!(is_sentinel(&value));
        assert!(!is_sentinel(&json!({"error": "something else"})));
    }
}
