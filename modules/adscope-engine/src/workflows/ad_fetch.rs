//! The ad-fetch workflow: drives one job record through its lifecycle.
//!
//! load → mark Running → resolve brands → collect source URLs → scrape
//! (with backoff) → partition per brand → transform → upsert → mark
//! Completed/Failed. Any step failure marks the job Failed (best-effort)
//! and re-raises; the triggering handler never sees the error.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, warn};

use adscope_common::retry::{retry_with_backoff, RetryPolicy};
use adscope_common::types::{
    AdStatus, BrandRecord, JobRecord, JobStatus, JobUpdate, NewAd,
};
use adscope_common::AdScopeError;
use apify_client::{extract_page_id_from_url, NormalizedAd};

use crate::traits::{display_format_from, RecordStore, ScrapeProvider, ScrapeRequest};
use crate::upsert::{upsert_ads, UpsertStats, INTER_BATCH_DELAY};

pub struct AdFetchWorkflow<S: RecordStore, P: ScrapeProvider> {
    store: S,
    scraper: P,
    scrape_retry: RetryPolicy,
    upsert_delay: Duration,
}

impl<S: RecordStore, P: ScrapeProvider> AdFetchWorkflow<S, P> {
    pub fn new(store: S, scraper: P) -> Self {
        Self {
            store,
            scraper,
            scrape_retry: RetryPolicy::new(3, Duration::from_secs(2)),
            upsert_delay: INTER_BATCH_DELAY,
        }
    }

    pub fn with_scrape_retry(mut self, policy: RetryPolicy) -> Self {
        self.scrape_retry = policy;
        self
    }

    pub fn with_upsert_delay(mut self, delay: Duration) -> Self {
        self.upsert_delay = delay;
        self
    }

    /// Run the job to completion. On failure the job record is marked
    /// Failed with the error message (best-effort) and the error is
    /// re-raised for the caller's log.
    ///
    /// Completed is terminal: re-triggering a Completed job (or one already
    /// Running) is refused before any status write, so no state is ever
    /// reachable from Completed.
    pub async fn run(&self, job_id: &str) -> Result<UpsertStats> {
        info!(job_id, "Starting ad-fetch workflow");

        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| AdScopeError::JobNotFound(job_id.to_string()))?;
        info!(job_id, name = %job.name, status = %job.status, "Job loaded");

        if !job.status.is_triggerable() {
            return Err(AdScopeError::Validation(format!(
                "Job is {} and cannot be triggered",
                job.status
            ))
            .into());
        }

        match self.run_inner(&job).await {
            Ok(stats) => {
                info!(job_id, %stats, "Ad-fetch workflow complete");
                Ok(stats)
            }
            Err(e) => {
                error!(job_id, error = %e, "Ad-fetch workflow failed");
                let update = JobUpdate {
                    completed_at: Some(Utc::now()),
                    error_message: Some(e.to_string()),
                    ..Default::default()
                };
                if let Err(write_err) = self
                    .store
                    .update_job_status(job_id, JobStatus::Failed, &update)
                    .await
                {
                    // Best-effort: the job stays visibly stale rather than
                    // masking the original failure.
                    warn!(job_id, error = %write_err, "Failed to record Failed status");
                }
                Err(e)
            }
        }
    }

    async fn run_inner(&self, job: &JobRecord) -> Result<UpsertStats> {
        let job_id = job.record_id.as_str();

        self.store
            .update_job_status(
                job_id,
                JobStatus::Running,
                &JobUpdate {
                    started_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        if job.brand_ids.is_empty() {
            return Err(AdScopeError::Validation("No brands linked to this job".into()).into());
        }

        let brands = self.store.get_brands(&job.brand_ids).await?;
        if brands.is_empty() {
            return Err(AdScopeError::Validation("No valid brand records found".into()).into());
        }
        info!(job_id, brands = brands.len(), "Brands resolved");

        let page_urls: Vec<String> = brands
            .iter()
            .map(|b| b.facebook_page_url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if page_urls.is_empty() {
            return Err(AdScopeError::Validation(
                "No valid Facebook page URLs found for brands".into(),
            )
            .into());
        }

        let request = ScrapeRequest {
            page_urls,
            max_results: job.max_results,
            time_range: job.time_range,
        };
        info!(
            job_id,
            pages = request.page_urls.len(),
            max_results = request.max_results,
            time_range = ?request.time_range,
            "Invoking scrape provider"
        );
        let results =
            retry_with_backoff(&self.scrape_retry, || self.scraper.scrape(&request)).await?;
        info!(job_id, count = results.len(), "Scrape provider returned ads");

        let ads = partition_to_brands(&results, &brands);
        info!(job_id, count = ads.len(), "Transformed ads for upsert");

        if ads.is_empty() {
            // An empty scrape is a completed job, not a failed one.
            self.store
                .update_job_status(
                    job_id,
                    JobStatus::Completed,
                    &JobUpdate {
                        completed_at: Some(Utc::now()),
                        ads_count: Some(0),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(UpsertStats::default());
        }

        let stats = upsert_ads(&self.store, &ads, job_id, self.upsert_delay).await;

        self.store
            .update_job_status(
                job_id,
                JobStatus::Completed,
                &JobUpdate {
                    completed_at: Some(Utc::now()),
                    ads_count: Some((stats.created + stats.updated) as u32),
                    ..Default::default()
                },
            )
            .await?;

        Ok(stats)
    }
}

/// Hand each scraped ad back to its owning brand by provider page id, or by
/// case-insensitive page name when the id is unavailable.
fn partition_to_brands(results: &[NormalizedAd], brands: &[BrandRecord]) -> Vec<NewAd> {
    let mut ads = Vec::new();

    for brand in brands {
        let page_id = extract_page_id_from_url(&brand.facebook_page_url);
        let matched = results.iter().filter(|ad| {
            (!page_id.is_empty() && ad.page_id == page_id)
                || ad.page_name.eq_ignore_ascii_case(&brand.name)
        });

        for ad in matched {
            ads.push(new_ad_from(ad, &brand.record_id));
        }
    }

    ads
}

fn new_ad_from(ad: &NormalizedAd, brand_id: &str) -> NewAd {
    NewAd {
        ad_id: ad.ad_id.clone(),
        archive_id: ad.archive_id.clone(),
        page_id: ad.page_id.clone(),
        page_name: ad.page_name.clone(),
        start_date: ad.start_date,
        end_date: ad.end_date,
        platform: ad.platform.clone(),
        display_format: display_format_from(ad.format),
        permalink_url: ad.permalink_url.clone(),
        media_url: ad.media_url.clone(),
        thumbnail_url: ad.thumbnail_url.clone(),
        ad_copy: ad.ad_copy.clone(),
        impressions: ad.impressions,
        status: if ad.active {
            AdStatus::Active
        } else {
            AdStatus::Inactive
        },
        brand_id: brand_id.to_string(),
    }
}
