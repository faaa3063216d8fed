//! Prompt templates for creative analysis.

/// Prompt for full multimodal analysis: the media blob rides alongside
/// this text in the same request.
pub fn video_analysis_prompt(ad_copy: &str) -> String {
    format!(
        r#"You are an expert advertising analyst. Analyze this Facebook video ad comprehensively.

AD COPY:
{ad_copy}

Respond with a JSON object in exactly this shape:

{{
  "insights": "3-5 key insights about the ad's effectiveness and strategy",
  "themes": ["theme1", "theme2", "theme3"],
  "sentiment": "positive|neutral|negative",
  "callToAction": "primary CTA identified in the ad",
  "targetAudience": "description of the likely target audience"
}}

Analyze the VIDEO CONTENT (if provided) together with the AD COPY. Respond with VALID JSON only. Do not include markdown formatting or code blocks."#
    )
}

/// Text-only fallback prompt, used when media cannot be fetched or
/// multimodal analysis failed.
pub fn copy_analysis_prompt(ad_copy: &str) -> String {
    format!(
        r#"You are an expert advertising analyst. Analyze this Facebook ad copy.

AD COPY:
{ad_copy}

Respond with a JSON object with the fields: insights, themes, sentiment (positive|neutral|negative), callToAction, targetAudience. VALID JSON only, no markdown."#
    )
}
