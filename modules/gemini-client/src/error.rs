use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeminiError>;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Media fetch failed: {0}")]
    MediaFetch(String),

    #[error("Media too large: {size_mb:.2}MB (max {max_mb}MB)")]
    MediaTooLarge { size_mb: f64, max_mb: u64 },
}

impl GeminiError {
    /// Oversized or unfetchable media is not transient; it triggers the
    /// text-only fallback instead of burning retry budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            GeminiError::Network(_) => true,
            GeminiError::Api { status, .. } => matches!(status, 429 | 503 | 504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        GeminiError::Network(err.to_string())
    }
}
