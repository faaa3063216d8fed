pub mod error;
pub mod normalize;
pub mod types;

pub use error::{ApifyError, Result};
pub use normalize::{extract_page_id_from_url, AdFormat, NormalizedAd};
pub use types::{AdLibraryScraperInput, RawAd, RunData};

use serde::de::DeserializeOwned;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Hard ceiling on one actor run; the Ad Library scraper is slow on
/// pages with large archives.
const RUN_TIMEOUT_SECS: u32 = 600;

/// Actor memory allocation in megabytes.
const RUN_MEMORY_MB: u32 = 2048;

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    actor_id: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String, actor_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            actor_id,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Start an Ad Library scrape run. Returns immediately with run metadata.
    pub async fn start_run(&self, input: &AdLibraryScraperInput) -> Result<RunData> {
        let url = format!(
            "{}/acts/{}/runs?timeout={}&memory={}",
            self.base_url, self.actor_id, RUN_TIMEOUT_SECS, RUN_MEMORY_MB
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient
    /// long-polling. Any non-success terminal status is an error.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", self.base_url, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!(
            "{}/datasets/{}/items?format=json",
            self.base_url, dataset_id
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Scrape the Ad Library end-to-end: start run, poll, fetch and
    /// normalize results.
    pub async fn scrape_ad_library(
        &self,
        input: &AdLibraryScraperInput,
    ) -> Result<Vec<NormalizedAd>> {
        tracing::info!(
            pages = input.pages.len(),
            max_results = input.max_results_per_page,
            date_from = input.date_from.as_deref().unwrap_or("none"),
            "Starting Ad Library scrape"
        );

        let run = self.start_run(input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        let raw: Vec<RawAd> = self
            .get_dataset_items(&completed.default_dataset_id)
            .await?;
        tracing::info!(count = raw.len(), "Fetched raw ads");

        let today = chrono::Utc::now().date_naive();
        Ok(raw.iter().map(|ad| ad.normalize(today)).collect())
    }
}
