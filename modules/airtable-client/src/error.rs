use thiserror::Error;

pub type Result<T> = std::result::Result<T, AirtableError>;

#[derive(Debug, Error)]
pub enum AirtableError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Record {0} not found")]
    NotFound(String),

    #[error("Cannot delete job {0} while it is Running")]
    JobRunning(String),

    #[error("Invalid brand page URL: {0}")]
    InvalidPageUrl(String),
}

impl AirtableError {
    /// Airtable rate limits at 5 req/s; 429 and upstream unavailability
    /// are worth a short backoff, everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AirtableError::Network(_) => true,
            AirtableError::Api { status, .. } => matches!(status, 429 | 503 | 504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AirtableError {
    fn from(err: reqwest::Error) -> Self {
        AirtableError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AirtableError {
    fn from(err: serde_json::Error) -> Self {
        AirtableError::Parse(err.to_string())
    }
}
