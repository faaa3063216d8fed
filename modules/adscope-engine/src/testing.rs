//! In-memory fakes for workflow tests.
//!
//! All state lives behind an `Arc<Mutex<_>>` so a clone handed to a workflow
//! shares state with the handle the test keeps for assertions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use adscope_common::types::{
    AdAnalysis, AdRecord, AdSighting, AdStatus, BrandRecord, DisplayFormat, JobRecord, JobStatus,
    JobUpdate, NewAd, TimeRange,
};
use apify_client::{AdFormat, NormalizedAd};
use gemini_client::{AdAnalysisResult, GeminiError};

use crate::traits::{AdAnalyzer, RecordStore, ScrapeProvider, ScrapeRequest};

// ---------------------------------------------------------------------------
// Record store

#[derive(Default)]
struct StoreState {
    jobs: HashMap<String, JobRecord>,
    brands: HashMap<String, BrandRecord>,
    ads: Vec<AdRecord>,
    analyses: HashMap<String, AdAnalysis>,
    status_log: Vec<(String, JobStatus)>,
    fail_archive_ids: HashSet<String>,
    fail_analysis_ids: HashSet<String>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct MockRecordStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_job(&self, job: JobRecord) {
        self.state.lock().unwrap().jobs.insert(job.record_id.clone(), job);
    }

    pub fn insert_brand(&self, brand: BrandRecord) {
        self.state
            .lock()
            .unwrap()
            .brands
            .insert(brand.record_id.clone(), brand);
    }

    pub fn insert_ad(&self, ad: AdRecord) {
        self.state.lock().unwrap().ads.push(ad);
    }

    /// Make lookups for this archive id error, for partial-failure tests.
    pub fn fail_archive_id(&self, archive_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_archive_ids
            .insert(archive_id.to_string());
    }

    /// Make analysis writes for this record id error.
    pub fn fail_analysis_write(&self, record_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_analysis_ids
            .insert(record_id.to_string());
    }

    pub fn job(&self, record_id: &str) -> Option<JobRecord> {
        self.state.lock().unwrap().jobs.get(record_id).cloned()
    }

    pub fn ads(&self) -> Vec<AdRecord> {
        self.state.lock().unwrap().ads.clone()
    }

    pub fn ad_by_archive_id(&self, archive_id: &str) -> Option<AdRecord> {
        self.state
            .lock()
            .unwrap()
            .ads
            .iter()
            .find(|ad| ad.archive_id == archive_id)
            .cloned()
    }

    pub fn analysis(&self, record_id: &str) -> Option<AdAnalysis> {
        self.state.lock().unwrap().analyses.get(record_id).cloned()
    }

    /// Status transitions observed for a job, in order.
    pub fn status_log(&self, record_id: &str) -> Vec<JobStatus> {
        self.state
            .lock()
            .unwrap()
            .status_log
            .iter()
            .filter(|(id, _)| id == record_id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn get_job(&self, record_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.state.lock().unwrap().jobs.get(record_id).cloned())
    }

    async fn update_job_status(
        &self,
        record_id: &str,
        status: JobStatus,
        update: &JobUpdate,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.status_log.push((record_id.to_string(), status));
        let job = state
            .jobs
            .get_mut(record_id)
            .ok_or_else(|| anyhow!("no job {record_id}"))?;
        job.status = status;
        if let Some(at) = update.started_at {
            job.started_at = Some(at);
        }
        if let Some(at) = update.completed_at {
            job.completed_at = Some(at);
        }
        if let Some(count) = update.ads_count {
            job.ads_count = Some(count);
        }
        match (&update.error_message, status) {
            (Some(msg), _) => job.error_message = Some(msg.clone()),
            // Completing clears any note left by an earlier failed pass.
            (None, JobStatus::Completed) => job.error_message = None,
            (None, _) => {}
        }
        Ok(())
    }

    async fn get_brands(&self, record_ids: &[String]) -> Result<Vec<BrandRecord>> {
        let state = self.state.lock().unwrap();
        Ok(record_ids
            .iter()
            .filter_map(|id| state.brands.get(id).cloned())
            .collect())
    }

    async fn find_ad_by_archive_id(&self, archive_id: &str) -> Result<Option<AdRecord>> {
        let state = self.state.lock().unwrap();
        if state.fail_archive_ids.contains(archive_id) {
            bail!("injected store failure for {archive_id}");
        }
        Ok(state
            .ads
            .iter()
            .find(|ad| ad.archive_id == archive_id)
            .cloned())
    }

    async fn create_ad(&self, ad: &NewAd, job_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record_id = format!("recAd{:03}", state.next_id);
        state.ads.push(AdRecord {
            record_id: record_id.clone(),
            ad_id: ad.ad_id.clone(),
            archive_id: ad.archive_id.clone(),
            page_id: ad.page_id.clone(),
            page_name: ad.page_name.clone(),
            start_date: Some(ad.start_date),
            end_date: Some(ad.end_date),
            platform: ad.platform.clone(),
            display_format: Some(ad.display_format),
            permalink_url: ad.permalink_url.clone(),
            media_url: ad.media_url.clone(),
            thumbnail_url: ad.thumbnail_url.clone(),
            ad_copy: ad.ad_copy.clone(),
            impressions: ad.impressions,
            status: Some(ad.status),
            brand_ids: vec![ad.brand_id.clone()],
            job_ids: vec![job_id.to_string()],
            created_at: Some(Utc::now()),
            analysis_completed: false,
        });
        Ok(record_id)
    }

    async fn update_ad_sighting(&self, record_id: &str, sighting: &AdSighting) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let ad = state
            .ads
            .iter_mut()
            .find(|ad| ad.record_id == record_id)
            .ok_or_else(|| anyhow!("no ad {record_id}"))?;
        ad.end_date = Some(sighting.end_date);
        ad.status = Some(sighting.status);
        ad.impressions = sighting.impressions;
        ad.media_url = sighting.media_url.clone();
        ad.thumbnail_url = sighting.thumbnail_url.clone();
        ad.job_ids = sighting.job_ids.clone();
        Ok(())
    }

    async fn ads_for_analysis(
        &self,
        limit: u32,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<AdRecord>> {
        let state = self.state.lock().unwrap();
        let mut eligible: Vec<AdRecord> = state
            .ads
            .iter()
            .filter(|ad| {
                !ad.analysis_completed
                    && ad.status == Some(AdStatus::Active)
                    && ad.display_format == Some(DisplayFormat::Video)
            })
            .filter(|ad| match (start_date, ad.created_at) {
                (Some(cutoff), Some(created)) => created.date_naive() >= cutoff,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();
        eligible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        eligible.truncate(limit as usize);
        Ok(eligible)
    }

    async fn get_ads(&self, record_ids: &[String]) -> Result<Vec<AdRecord>> {
        let state = self.state.lock().unwrap();
        Ok(record_ids
            .iter()
            .filter_map(|id| state.ads.iter().find(|ad| &ad.record_id == id).cloned())
            .collect())
    }

    async fn update_ad_analysis(&self, record_id: &str, analysis: &AdAnalysis) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_analysis_ids.contains(record_id) {
            bail!("injected analysis write failure for {record_id}");
        }
        let ad = state
            .ads
            .iter_mut()
            .find(|ad| ad.record_id == record_id)
            .ok_or_else(|| anyhow!("no ad {record_id}"))?;
        ad.analysis_completed = true;
        state.analyses.insert(record_id.to_string(), analysis.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scrape provider

#[derive(Default)]
struct ScraperState {
    results: Vec<NormalizedAd>,
    fail_remaining: u32,
    calls: u32,
    last_request: Option<ScrapeRequest>,
}

#[derive(Clone, Default)]
pub struct MockScraper {
    state: Arc<Mutex<ScraperState>>,
}

impl MockScraper {
    pub fn new(results: Vec<NormalizedAd>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScraperState {
                results,
                ..Default::default()
            })),
        }
    }

    /// Fail the first `n` calls, then succeed.
    pub fn failing_times(self, n: u32) -> Self {
        self.state.lock().unwrap().fail_remaining = n;
        self
    }

    pub fn calls(&self) -> u32 {
        self.state.lock().unwrap().calls
    }

    pub fn last_request(&self) -> Option<ScrapeRequest> {
        self.state.lock().unwrap().last_request.clone()
    }
}

#[async_trait]
impl ScrapeProvider for MockScraper {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<Vec<NormalizedAd>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.last_request = Some(request.clone());
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            bail!("injected scrape failure");
        }
        Ok(state.results.clone())
    }
}

// ---------------------------------------------------------------------------
// Analyzer

/// How the mock handles video calls.
#[derive(Clone, Copy, Default)]
pub enum VideoBehavior {
    #[default]
    Succeed,
    /// Every call fails with a retryable network error.
    FailRetryable,
    /// Every call fails with a non-retryable oversized-media error.
    FailOversized,
}

#[derive(Default)]
struct AnalyzerState {
    video: VideoBehavior,
    copy_fails: bool,
    video_calls: u32,
    copy_calls: u32,
}

#[derive(Clone, Default)]
pub struct MockAnalyzer {
    state: Arc<Mutex<AnalyzerState>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_behavior(self, behavior: VideoBehavior) -> Self {
        self.state.lock().unwrap().video = behavior;
        self
    }

    pub fn copy_fails(self) -> Self {
        self.state.lock().unwrap().copy_fails = true;
        self
    }

    pub fn video_calls(&self) -> u32 {
        self.state.lock().unwrap().video_calls
    }

    pub fn copy_calls(&self) -> u32 {
        self.state.lock().unwrap().copy_calls
    }
}

#[async_trait]
impl AdAnalyzer for MockAnalyzer {
    async fn analyze_video(&self, _media_url: &str, _ad_copy: &str) -> Result<AdAnalysisResult> {
        let mut state = self.state.lock().unwrap();
        state.video_calls += 1;
        match state.video {
            VideoBehavior::Succeed => Ok(analysis_result("video")),
            VideoBehavior::FailRetryable => {
                Err(GeminiError::Network("injected timeout".into()).into())
            }
            VideoBehavior::FailOversized => Err(GeminiError::MediaTooLarge {
                size_mb: 48.5,
                max_mb: 20,
            }
            .into()),
        }
    }

    async fn analyze_copy(&self, _ad_copy: &str) -> Result<AdAnalysisResult> {
        let mut state = self.state.lock().unwrap();
        state.copy_calls += 1;
        if state.copy_fails {
            bail!("injected copy analysis failure");
        }
        Ok(analysis_result("copy"))
    }
}

// ---------------------------------------------------------------------------
// Fixtures

pub fn analysis_result(source: &str) -> AdAnalysisResult {
    AdAnalysisResult {
        insights: format!("insights from {source}"),
        themes: vec!["discount".into(), "urgency".into()],
        sentiment: "positive".into(),
        call_to_action: "Shop Now".into(),
        target_audience: "bargain hunters".into(),
    }
}

pub fn job_record(record_id: &str, brand_ids: &[&str]) -> JobRecord {
    JobRecord {
        record_id: record_id.to_string(),
        name: format!("Job {record_id}"),
        status: JobStatus::Pending,
        brand_ids: brand_ids.iter().map(|s| s.to_string()).collect(),
        time_range: TimeRange::Last7d,
        max_results: 5,
        created_at: Some(Utc::now()),
        started_at: None,
        completed_at: None,
        ad_ids: Vec::new(),
        ads_count: None,
        error_message: None,
    }
}

pub fn brand_record(record_id: &str, name: &str, page_url: &str) -> BrandRecord {
    BrandRecord {
        record_id: record_id.to_string(),
        name: name.to_string(),
        facebook_page_url: page_url.to_string(),
        created_at: Some(Utc::now()),
    }
}

pub fn normalized_ad(archive_id: &str, page_id: &str, page_name: &str) -> NormalizedAd {
    NormalizedAd {
        ad_id: format!("ad-{archive_id}"),
        archive_id: archive_id.to_string(),
        page_id: page_id.to_string(),
        page_name: page_name.to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
        platform: "Facebook".to_string(),
        format: AdFormat::Video,
        permalink_url: format!("https://www.facebook.com/ads/library/?id={archive_id}"),
        media_url: format!("https://cdn.example.com/{archive_id}.mp4"),
        thumbnail_url: format!("https://cdn.example.com/{archive_id}.jpg"),
        ad_copy: "Save 20% this week only".to_string(),
        impressions: 1_000,
        active: true,
    }
}

pub fn ad_record(record_id: &str, archive_id: &str) -> AdRecord {
    AdRecord {
        record_id: record_id.to_string(),
        ad_id: format!("ad-{archive_id}"),
        archive_id: archive_id.to_string(),
        page_id: "1234567890".to_string(),
        page_name: "Acme".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 5, 20),
        platform: "Facebook".to_string(),
        display_format: Some(DisplayFormat::Video),
        permalink_url: format!("https://www.facebook.com/ads/library/?id={archive_id}"),
        media_url: format!("https://cdn.example.com/{archive_id}.mp4"),
        thumbnail_url: format!("https://cdn.example.com/{archive_id}.jpg"),
        ad_copy: "Save 20% this week only".to_string(),
        impressions: 1_000,
        status: Some(AdStatus::Active),
        brand_ids: vec!["recBrand001".to_string()],
        job_ids: vec!["recJob001".to_string()],
        created_at: Some(Utc::now()),
        analysis_completed: false,
    }
}
