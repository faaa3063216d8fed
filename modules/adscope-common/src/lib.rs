pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::Config;
pub use error::AdScopeError;
pub use retry::{retry_with_backoff, retry_with_backoff_if, RetryPolicy};
