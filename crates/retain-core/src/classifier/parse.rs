//! Parsing of classifier responses.
//!
//! Models often wrap JSON in code fences or emit reasoning tags around it,
//! so the text is cleaned before decoding. Anything that still fails to
//! decode, or names a rating outside the closed set, becomes a
//! [`FallbackReason`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::str::FromStr;

use super::{FallbackReason, Judgment};
use crate::types::MemoryRating;

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").unwrap());

static THINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

#[derive(Debug, Deserialize)]
struct RawJudgment {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    rating: Option<serde_json::Value>,
}

/// Strip reasoning tags and code fences, returning the JSON candidate.
pub fn extract_json(text: &str) -> String {
    let text = THINK_RE.replace_all(text.trim(), "");
    let text = text.trim();

    if let Some(content) = CODE_BLOCK_RE.captures(text).and_then(|c| c.get(1)) {
        return content.as_str().trim().to_string();
    }

    // Fall back to the outermost braces if there is chatter around the object
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Normalise a rating value. Matching is case-insensitive; anything else
/// is out of domain.
pub fn parse_rating(raw: &str) -> Result<MemoryRating, FallbackReason> {
    MemoryRating::from_str(&raw.trim().to_uppercase())
        .map_err(|_| FallbackReason::InvalidRating(raw.to_string()))
}

/// Decode a classifier response into a judgment.
pub fn parse_judgment(response: &str) -> Result<Judgment, FallbackReason> {
    let json_str = extract_json(response);
    if json_str.is_empty() {
        return Err(FallbackReason::Malformed("empty response".to_string()));
    }

    let raw: RawJudgment = serde_json::from_str(&json_str)
        .map_err(|e| FallbackReason::Malformed(format!("invalid JSON: {}", e)))?;

    let rating = match raw.rating {
        Some(serde_json::Value::String(value)) => parse_rating(&value)?,
        Some(other) => return Err(FallbackReason::InvalidRating(other.to_string())),
        None => return Err(FallbackReason::Malformed("missing 'rating' field".to_string())),
    };

    Ok(Judgment {
        summary: raw.summary.unwrap_or_default().trim().to_string(),
        rating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let judgment =
            parse_judgment(r#"{"summary": "Recalled the hash map idea.", "rating": "REMEMBERED"}"#)
                .unwrap();
        assert_eq!(judgment.rating, MemoryRating::Remembered);
        assert_eq!(judgment.summary, "Recalled the hash map idea.");
    }

    #[test]
    fn test_parse_fenced_json() {
        let input = "```json\n{\"summary\": \"Missed the edge case.\", \"rating\": \"PARTIAL\"}\n```";
        let judgment = parse_judgment(input).unwrap();
        assert_eq!(judgment.rating, MemoryRating::Partial);
    }

    #[test]
    fn test_parse_with_surrounding_chatter() {
        let input = "Sure! Here is my verdict:\n{\"summary\": \"Stuck.\", \"rating\": \"FORGOT\"}\nHope it helps.";
        assert_eq!(parse_judgment(input).unwrap().rating, MemoryRating::Forgot);
    }

    #[test]
    fn test_parse_strips_think_tags() {
        let input = "<think>they used a heap</think>{\"summary\": \"ok\", \"rating\": \"remembered\"}";
        assert_eq!(parse_judgment(input).unwrap().rating, MemoryRating::Remembered);
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_judgment("I think they remembered it.").unwrap_err();
        assert!(matches!(err, FallbackReason::Malformed(_)));
    }

    #[test]
    fn test_empty_is_malformed() {
        assert!(matches!(
            parse_judgment("   ").unwrap_err(),
            FallbackReason::Malformed(_)
        ));
    }

    #[test]
    fn test_out_of_domain_rating() {
        let err = parse_judgment(r#"{"summary": "meh", "rating": "MOSTLY"}"#).unwrap_err();
        assert_eq!(err, FallbackReason::InvalidRating("MOSTLY".to_string()));

        let err = parse_judgment(r#"{"summary": "meh", "rating": 3}"#).unwrap_err();
        assert_eq!(err, FallbackReason::InvalidRating("3".to_string()));
    }

    #[test]
    fn test_missing_rating_is_malformed() {
        let err = parse_judgment(r#"{"summary": "no verdict"}"#).unwrap_err();
        assert!(matches!(err, FallbackReason::Malformed(_)));
    }

    #[test]
    fn test_missing_summary_defaults_to_empty() {
        let judgment = parse_judgment(r#"{"rating": "PARTIAL"}"#).unwrap();
        assert_eq!(judgment.summary, "");
    }
}
