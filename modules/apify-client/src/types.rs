use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for the Facebook Ad Library scraper actor.
#[derive(Debug, Clone, Serialize)]
pub struct AdLibraryScraperInput {
    /// Facebook page URLs to scrape ads for.
    pub pages: Vec<String>,
    #[serde(rename = "maxResultsPerPage")]
    pub max_results_per_page: u32,
    #[serde(rename = "scrapeAdDetails")]
    pub scrape_ad_details: bool,
    #[serde(rename = "scrapeAdCreative")]
    pub scrape_ad_creative: bool,
    #[serde(rename = "includeInactive")]
    pub include_inactive: bool,
    /// ISO 8601 cutoff; ads that started before this are excluded.
    #[serde(rename = "dateFrom", skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
}

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// A raw ad object from the Ad Library scraper dataset.
///
/// Field names vary across actor versions (snake_case vs camelCase, `id` vs
/// `ad_id`), so both spellings are kept and resolved through accessors.
/// Nothing outside this crate should ever see these duck-typed shapes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAd {
    pub id: Option<String>,
    pub ad_id: Option<String>,
    pub ad_archive_id: Option<String>,
    #[serde(rename = "archiveId")]
    pub archive_id_camel: Option<String>,

    pub page_id: Option<String>,
    #[serde(rename = "pageId")]
    pub page_id_camel: Option<String>,
    pub page_name: Option<String>,
    #[serde(rename = "pageName")]
    pub page_name_camel: Option<String>,

    pub start_date: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date_camel: Option<String>,
    pub end_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date_camel: Option<String>,
    pub is_active: Option<bool>,

    /// Single platform string or a list, depending on actor version.
    pub publisher_platforms: Option<Platforms>,

    pub ad_creative_body: Option<String>,
    pub body: Option<String>,
    pub text: Option<String>,

    pub video_url: Option<String>,
    pub video_hd_url: Option<String>,
    pub video_sd_url: Option<String>,
    pub video_preview_image_url: Option<String>,
    pub images: Option<Vec<String>>,
    pub carousel_images: Option<Vec<String>>,
    pub image_url: Option<String>,

    pub permalink_url: Option<String>,
    pub url: Option<String>,

    /// Plain integer or a textual range like "1,000-5,000".
    pub impressions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Platforms {
    One(String),
    Many(Vec<String>),
}

impl RawAd {
    pub fn ad_id(&self) -> &str {
        first_of(&[&self.id, &self.ad_id])
    }

    /// The deduplication key. Empty when the provider omitted it entirely.
    pub fn archive_id(&self) -> &str {
        first_of(&[&self.ad_archive_id, &self.archive_id_camel])
    }

    pub fn page_id(&self) -> &str {
        first_of(&[&self.page_id, &self.page_id_camel])
    }

    pub fn page_name(&self) -> &str {
        first_of(&[&self.page_name, &self.page_name_camel])
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref().or(self.start_date_camel.as_deref())
    }

    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref().or(self.end_date_camel.as_deref())
    }

    /// Returns whichever creative-copy field is populated.
    pub fn ad_copy(&self) -> &str {
        first_of(&[&self.ad_creative_body, &self.body, &self.text])
    }

    pub fn permalink(&self) -> &str {
        first_of(&[&self.permalink_url, &self.url])
    }
}

fn first_of<'a>(candidates: &[&'a Option<String>]) -> &'a str {
    candidates
        .iter()
        .find_map(|c| c.as_deref())
        .unwrap_or_default()
}
