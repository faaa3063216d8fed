use std::env;

/// Apify actor for the Facebook Ad Library scraper, in API path form.
pub const DEFAULT_AD_SCRAPER_ACTOR: &str = "jurooravec~facebook-ads-scraper";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Record store
    pub airtable_api_key: String,
    pub airtable_base_id: String,

    // Scrape provider
    pub apify_api_token: String,
    pub apify_actor_id: String,

    // Analysis provider
    pub gemini_api_key: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            airtable_api_key: required_env("AIRTABLE_API_KEY"),
            airtable_base_id: required_env("AIRTABLE_BASE_ID"),
            apify_api_token: required_env("APIFY_API_TOKEN"),
            apify_actor_id: env::var("APIFY_ACTOR_ID")
                .unwrap_or_else(|_| DEFAULT_AD_SCRAPER_ACTOR.to_string()),
            gemini_api_key: required_env("GEMINI_API_KEY"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
