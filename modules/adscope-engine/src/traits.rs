// Trait abstractions for the workflow dependencies.
//
// RecordStore — typed record-store operations the orchestrators need.
// ScrapeProvider — one call: page URLs in, normalized ads out.
// AdAnalyzer — multimodal analysis with a text-only fallback path.
//
// These enable deterministic testing with the mocks in `testing`:
// no network, no live base, `cargo test` in seconds.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use adscope_common::types::{
    AdAnalysis, AdRecord, AdSighting, BrandRecord, DisplayFormat, JobRecord, JobStatus, JobUpdate,
    NewAd, TimeRange,
};
use apify_client::{AdFormat, AdLibraryScraperInput, NormalizedAd};
use gemini_client::AdAnalysisResult;

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_job(&self, record_id: &str) -> Result<Option<JobRecord>>;

    async fn update_job_status(
        &self,
        record_id: &str,
        status: JobStatus,
        update: &JobUpdate,
    ) -> Result<()>;

    /// Batch-resolve brands in a single filtered query, never N+1.
    async fn get_brands(&self, record_ids: &[String]) -> Result<Vec<BrandRecord>>;

    /// Exact lookup on the dedup key; at most one row expected.
    async fn find_ad_by_archive_id(&self, archive_id: &str) -> Result<Option<AdRecord>>;

    /// Create a new ad row linked to `job_id`. Returns the record id.
    async fn create_ad(&self, ad: &NewAd, job_id: &str) -> Result<String>;

    /// Refresh mutable fields and replace the job link set on a re-sighting.
    async fn update_ad_sighting(&self, record_id: &str, sighting: &AdSighting) -> Result<()>;

    /// Unanalyzed active video ads, newest first, capped at `limit`.
    async fn ads_for_analysis(
        &self,
        limit: u32,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<AdRecord>>;

    async fn get_ads(&self, record_ids: &[String]) -> Result<Vec<AdRecord>>;

    async fn update_ad_analysis(&self, record_id: &str, analysis: &AdAnalysis) -> Result<()>;
}

#[async_trait]
impl RecordStore for airtable_client::AirtableClient {
    async fn get_job(&self, record_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.get_job(record_id).await?)
    }

    async fn update_job_status(
        &self,
        record_id: &str,
        status: JobStatus,
        update: &JobUpdate,
    ) -> Result<()> {
        Ok(self.update_job_status(record_id, status, update).await?)
    }

    async fn get_brands(&self, record_ids: &[String]) -> Result<Vec<BrandRecord>> {
        Ok(self.get_brands(record_ids).await?)
    }

    async fn find_ad_by_archive_id(&self, archive_id: &str) -> Result<Option<AdRecord>> {
        Ok(self.find_ad_by_archive_id(archive_id).await?)
    }

    async fn create_ad(&self, ad: &NewAd, job_id: &str) -> Result<String> {
        Ok(self.create_ad(ad, job_id).await?)
    }

    async fn update_ad_sighting(&self, record_id: &str, sighting: &AdSighting) -> Result<()> {
        Ok(self.update_ad_sighting(record_id, sighting).await?)
    }

    async fn ads_for_analysis(
        &self,
        limit: u32,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<AdRecord>> {
        Ok(self.ads_for_analysis(limit, start_date).await?)
    }

    async fn get_ads(&self, record_ids: &[String]) -> Result<Vec<AdRecord>> {
        Ok(self.get_ads(record_ids).await?)
    }

    async fn update_ad_analysis(&self, record_id: &str, analysis: &AdAnalysis) -> Result<()> {
        Ok(self.update_ad_analysis(record_id, analysis).await?)
    }
}

// ---------------------------------------------------------------------------
// ScrapeProvider
// ---------------------------------------------------------------------------

/// Scrape configuration derived from explicit job attributes.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub page_urls: Vec<String>,
    pub max_results: u32,
    pub time_range: TimeRange,
}

#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<NormalizedAd>>;
}

#[async_trait]
impl ScrapeProvider for apify_client::ApifyClient {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<NormalizedAd>> {
        let input = AdLibraryScraperInput {
            pages: request.page_urls.clone(),
            max_results_per_page: request.max_results,
            scrape_ad_details: true,
            scrape_ad_creative: true,
            include_inactive: false,
            date_from: request
                .time_range
                .date_from(Utc::now())
                .map(|cutoff| cutoff.to_rfc3339()),
        };
        Ok(self.scrape_ad_library(&input).await?)
    }
}

// ---------------------------------------------------------------------------
// AdAnalyzer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AdAnalyzer: Send + Sync {
    /// Media-inclusive analysis. Fails on unfetchable or oversized media;
    /// callers fall back to `analyze_copy`.
    async fn analyze_video(&self, media_url: &str, ad_copy: &str) -> Result<AdAnalysisResult>;

    /// Text-only analysis of the ad's copy.
    async fn analyze_copy(&self, ad_copy: &str) -> Result<AdAnalysisResult>;
}

#[async_trait]
impl AdAnalyzer for gemini_client::GeminiClient {
    async fn analyze_video(&self, media_url: &str, ad_copy: &str) -> Result<AdAnalysisResult> {
        Ok(self.analyze_video_ad(media_url, ad_copy).await?)
    }

    async fn analyze_copy(&self, ad_copy: &str) -> Result<AdAnalysisResult> {
        Ok(self.analyze_ad_copy(ad_copy).await?)
    }
}

/// Map the scrape client's format onto the store's display format.
pub fn display_format_from(format: AdFormat) -> DisplayFormat {
    match format {
        AdFormat::Video => DisplayFormat::Video,
        AdFormat::Image => DisplayFormat::Image,
        AdFormat::Carousel => DisplayFormat::Carousel,
        AdFormat::Text => DisplayFormat::Text,
    }
}
