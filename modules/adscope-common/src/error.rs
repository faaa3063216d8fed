use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdScopeError {
    #[error("Record store error: {0}")]
    Store(String),

    #[error("Scrape error: {0}")]
    Scrape(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Job {0} not found in record store")]
    JobNotFound(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
