//! Parsing of the model's semi-structured analysis responses.
//!
//! The model is asked for pure JSON but routinely wraps it in code fences
//! or leading prose. Parsing is total: whatever comes back, the caller
//! gets a usable [`AdAnalysisResult`].

use serde::Deserialize;

/// Raw-text insights are truncated to this many bytes in the degraded path.
const FALLBACK_INSIGHTS_BYTES: usize = 500;

/// Structured analysis of one ad creative.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdAnalysisResult {
    pub insights: String,
    pub themes: Vec<String>,
    pub sentiment: String,
    #[serde(rename = "callToAction")]
    pub call_to_action: String,
    #[serde(rename = "targetAudience")]
    pub target_audience: String,
}

/// Parse a model response into a structured result. Strips code fences,
/// falls back to the first balanced JSON object, and finally degrades to
/// raw-text insights with neutral fields. Never fails.
pub fn parse_analysis_response(response: &str) -> AdAnalysisResult {
    let stripped = strip_code_blocks(response);

    let candidate = if stripped.starts_with('{') {
        Some(stripped.to_string())
    } else {
        extract_first_json_object(stripped)
    };

    if let Some(json) = candidate {
        if let Ok(mut parsed) = serde_json::from_str::<AdAnalysisResult>(&json) {
            if parsed.sentiment.is_empty() {
                parsed.sentiment = "neutral".to_string();
            }
            return parsed;
        }
    }

    tracing::warn!(
        response_len = response.len(),
        "Analysis response was not parseable JSON, degrading to raw text"
    );
    AdAnalysisResult {
        insights: truncate_to_char_boundary(response, FALLBACK_INSIGHTS_BYTES).to_string(),
        sentiment: "neutral".to_string(),
        ..Default::default()
    }
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Locate the first balanced `{...}` object, honoring string literals
/// and escapes so braces inside values don't end the scan early.
fn extract_first_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_JSON: &str = r#"{
        "insights": "Strong urgency framing",
        "themes": ["bonus", "urgency"],
        "sentiment": "positive",
        "callToAction": "Sign up now",
        "targetAudience": "Sports bettors 21-45"
    }"#;

    #[test]
    fn parses_bare_json() {
        let result = parse_analysis_response(GOOD_JSON);
        assert_eq!(result.insights, "Strong urgency framing");
        assert_eq!(result.themes, vec!["bonus", "urgency"]);
        assert_eq!(result.sentiment, "positive");
        assert_eq!(result.call_to_action, "Sign up now");
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{GOOD_JSON}\n```");
        let result = parse_analysis_response(&fenced);
        assert_eq!(result.sentiment, "positive");
        assert_eq!(result.themes.len(), 2);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let wrapped = format!("Here is the analysis you asked for:\n{GOOD_JSON}\nHope it helps!");
        let result = parse_analysis_response(&wrapped);
        assert_eq!(result.call_to_action, "Sign up now");
    }

    #[test]
    fn braces_inside_strings_do_not_break_extraction() {
        let tricky = r#"Note: {"insights": "uses \"{count}\" placeholders", "sentiment": "neutral"} end"#;
        let result = parse_analysis_response(tricky);
        assert!(result.insights.contains("placeholders"));
    }

    #[test]
    fn missing_fields_default_to_neutral() {
        let result = parse_analysis_response(r#"{"insights": "minimal"}"#);
        assert_eq!(result.insights, "minimal");
        assert!(result.themes.is_empty());
        assert_eq!(result.sentiment, "neutral");
        assert!(result.call_to_action.is_empty());
    }

    #[test]
    fn degrades_to_raw_text_on_garbage() {
        let garbage = "The model refused to produce JSON and rambled instead.";
        let result = parse_analysis_response(garbage);
        assert_eq!(result.insights, garbage);
        assert_eq!(result.sentiment, "neutral");
        assert!(result.themes.is_empty());
    }

    #[test]
    fn degraded_insights_are_truncated() {
        let long = "x".repeat(2000);
        let result = parse_analysis_response(&long);
        assert_eq!(result.insights.len(), 500);
    }
}
