//! Parsing of structured model output.
//!
//! Model responses are free text that should contain one JSON object. The
//! first balanced brace block is extracted as a pre-processing step, then
//! parsed strictly; anything that doesn't validate fails closed and the
//! caller takes its fallback path.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,

    #[error("response JSON is invalid: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Extract the first balanced `{...}` block from free text.
///
/// Brace counting is string-aware so braces inside JSON strings don't
/// unbalance the scan.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Raw shape of an estimation response before coercion.
#[derive(Debug, Deserialize)]
struct RawEstimateResponse {
    #[serde(default)]
    person_days: Option<serde_json::Value>,
    #[serde(default)]
    reasoning_breakdown: Option<String>,
    #[serde(default)]
    reasoning_notes: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Validated estimation response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEstimate {
    pub person_days: f64,
    pub reasoning: String,
    pub reasoning_breakdown: String,
    pub reasoning_notes: String,
}

/// Parse an estimation response from raw model text.
///
/// The JSON must parse; within it, a missing or malformed `person_days`
/// defaults to 5.0. Prose the model bundled into the breakdown field is
/// reclassified into notes afterwards.
pub fn parse_estimate_response(text: &str) -> Result<ParsedEstimate, ParseError> {
    let json = extract_json_object(text).ok_or(ParseError::NoJsonObject)?;
    let raw: RawEstimateResponse = serde_json::from_str(json)?;

    let person_days = coerce_person_days(raw.person_days.as_ref());
    let breakdown = raw.reasoning_breakdown.unwrap_or_default();
    let notes = raw.reasoning_notes.unwrap_or_default();
    let reasoning = raw
        .reasoning
        .unwrap_or_else(|| format!("{}\n\n{}", breakdown, notes).trim().to_string());

    let (breakdown, notes) = auto_separate_reasoning(breakdown, notes);

    Ok(ParsedEstimate {
        person_days,
        reasoning,
        reasoning_breakdown: breakdown,
        reasoning_notes: notes,
    })
}

/// Coerce `person_days` to a usable float, defaulting to 5.0.
///
/// Accepts numbers and numeric strings; rejects negatives and non-finite
/// values.
fn coerce_person_days(value: Option<&serde_json::Value>) -> f64 {
    const DEFAULT: f64 = 5.0;

    let parsed = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => DEFAULT,
    }
}

/// Split prose paragraphs out of a bundled breakdown field.
///
/// If `notes` is empty but `breakdown` mixes bulleted spans with plain
/// paragraphs, paragraph blocks move into notes. A block counts as breakdown
/// when it starts with a bullet marker or contains a bulleted line.
pub fn auto_separate_reasoning(breakdown: String, notes: String) -> (String, String) {
    if !notes.is_empty() || breakdown.is_empty() {
        return (breakdown, notes);
    }

    const BULLETS: [&str; 4] = ["-", "*", "•", "・"];

    let mut breakdown_parts: Vec<&str> = Vec::new();
    let mut notes_parts: Vec<&str> = Vec::new();

    for part in breakdown.split("\n\n") {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let starts_with_bullet = BULLETS.iter().any(|b| part.starts_with(b));
        let contains_bulleted_line = BULLETS
            .iter()
            .any(|b| part.contains(&format!("\n{}", b)));

        if starts_with_bullet || contains_bulleted_line {
            breakdown_parts.push(part);
        } else {
            notes_parts.push(part);
        }
    }

    if notes_parts.is_empty() {
        return (breakdown, notes);
    }

    (breakdown_parts.join("\n\n"), notes_parts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_surrounding_prose() {
        let text = "Here is the result:\n{\"person_days\": 4.5}\nHope that helps.";
        assert_eq!(extract_json_object(text), Some("{\"person_days\": 4.5}"));
    }

    #[test]
    fn test_extract_handles_nested_objects() {
        let text = r#"{"a": {"b": 1}, "c": 2} trailing"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 1}, "c": 2}"#));
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"{"note": "uses {braces} inside"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_none_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{unclosed"), None);
    }

    #[test]
    fn test_parse_full_response() {
        let text = r#"{"person_days": 4.5, "reasoning_breakdown": "- 設計: 1.5人日\n- 実装: 3.0人日", "reasoning_notes": "前提: 既存基盤を流用。"}"#;
        let parsed = parse_estimate_response(text).unwrap();
        assert_eq!(parsed.person_days, 4.5);
        assert!(parsed.reasoning_breakdown.contains("設計"));
        assert!(parsed.reasoning_notes.contains("前提"));
    }

    #[test]
    fn test_parse_defaults_missing_person_days() {
        let text = r#"{"reasoning_breakdown": "- work: lots"}"#;
        let parsed = parse_estimate_response(text).unwrap();
        assert_eq!(parsed.person_days, 5.0);
    }

    #[test]
    fn test_parse_rejects_negative_person_days() {
        let text = r#"{"person_days": -2.0}"#;
        let parsed = parse_estimate_response(text).unwrap();
        assert_eq!(parsed.person_days, 5.0);
    }

    #[test]
    fn test_parse_accepts_numeric_string() {
        let text = r#"{"person_days": "7.5"}"#;
        let parsed = parse_estimate_response(text).unwrap();
        assert_eq!(parsed.person_days, 7.5);
    }

    #[test]
    fn test_parse_fails_closed_without_json() {
        let result = parse_estimate_response("I estimate about five days.");
        assert!(matches!(result, Err(ParseError::NoJsonObject)));
    }

    #[test]
    fn test_parse_fails_closed_on_invalid_json() {
        let result = parse_estimate_response("{person_days: oops}");
        assert!(matches!(result, Err(ParseError::InvalidJson(_))));
    }

    #[test]
    fn test_separation_moves_paragraphs_to_notes() {
        let breakdown = "- 設計: 2.0人日\n- 実装: 3.0人日\n\nこの見積りは既存システムの流用を前提とします。".to_string();
        let (b, n) = auto_separate_reasoning(breakdown, String::new());
        assert!(b.starts_with("- 設計"));
        assert!(n.contains("前提"));
    }

    #[test]
    fn test_separation_keeps_existing_notes() {
        let (b, n) = auto_separate_reasoning("- a\n\nprose".to_string(), "existing".to_string());
        assert_eq!(b, "- a\n\nprose");
        assert_eq!(n, "existing");
    }

    #[test]
    fn test_separation_all_bullets_untouched() {
        let breakdown = "- a: 1人日\n\n- b: 2人日".to_string();
        let (b, n) = auto_separate_reasoning(breakdown.clone(), String::new());
        assert_eq!(b, breakdown);
        assert!(n.is_empty());
    }

    #[test]
    fn test_separation_multiline_list_block_stays() {
        let breakdown = "工程別内訳:\n- 設計: 2.0人日\n- 実装: 3.0人日".to_string();
        let (b, n) = auto_separate_reasoning(breakdown.clone(), String::new());
        assert_eq!(b, breakdown);
        assert!(n.is_empty());
    }
}
