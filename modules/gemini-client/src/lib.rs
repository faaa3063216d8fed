pub mod error;
pub mod parse;
pub mod prompt;
pub mod types;

pub use error::{GeminiError, Result};
pub use parse::{parse_analysis_response, AdAnalysisResult};

use base64::Engine as _;
use types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Inline media ceiling imposed by the API. Anything larger falls back to
/// text-only analysis immediately, without retries.
pub const MAX_MEDIA_BYTES: u64 = 20 * 1024 * 1024;

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Analyze a video creative: fetch the media, attach it inline, and ask
    /// for structured analysis. Fails if the media cannot be fetched or is
    /// over the size cap; callers fall back to [`Self::analyze_ad_copy`].
    pub async fn analyze_video_ad(
        &self,
        media_url: &str,
        ad_copy: &str,
    ) -> Result<AdAnalysisResult> {
        tracing::info!(media_url, "Analyzing video creative");

        let media = self.fetch_media_as_base64(media_url).await?;
        let parts = vec![
            Part::Text(prompt::video_analysis_prompt(ad_copy)),
            Part::InlineData(InlineData {
                mime_type: "video/mp4".to_string(),
                data: media,
            }),
        ];

        let text = self.generate(parts).await?;
        Ok(parse_analysis_response(&text))
    }

    /// Text-only analysis of the ad's copy.
    pub async fn analyze_ad_copy(&self, ad_copy: &str) -> Result<AdAnalysisResult> {
        let parts = vec![Part::Text(prompt::copy_analysis_prompt(ad_copy))];
        let text = self.generate(parts).await?;
        Ok(parse_analysis_response(&text))
    }

    async fn generate(&self, parts: Vec<Part>) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        tracing::debug!(model = %self.model, "Gemini generateContent request");

        let resp = self.http.post(&url).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        parsed.text().ok_or(GeminiError::EmptyResponse)
    }

    /// Fetch a media URL and base64-encode it for inline transport.
    /// Rejects anything over [`MAX_MEDIA_BYTES`].
    async fn fetch_media_as_base64(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .header(
                reqwest::header::USER_AGENT,
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )
            .send()
            .await
            .map_err(|e| GeminiError::MediaFetch(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GeminiError::MediaFetch(format!(
                "HTTP {} fetching {url}",
                resp.status()
            )));
        }

        // The CDN usually reports length up front; reject early when it does.
        if let Some(len) = resp.content_length() {
            if len > MAX_MEDIA_BYTES {
                return Err(GeminiError::MediaTooLarge {
                    size_mb: len as f64 / (1024.0 * 1024.0),
                    max_mb: MAX_MEDIA_BYTES / (1024 * 1024),
                });
            }
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GeminiError::MediaFetch(e.to_string()))?;
        if bytes.len() as u64 > MAX_MEDIA_BYTES {
            return Err(GeminiError::MediaTooLarge {
                size_mb: bytes.len() as f64 / (1024.0 * 1024.0),
                max_mb: MAX_MEDIA_BYTES / (1024 * 1024),
            });
        }

        Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
    }
}
