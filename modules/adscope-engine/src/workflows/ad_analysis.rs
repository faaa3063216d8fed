//! The ad-analysis workflow: AI analysis over stored ad creatives.
//!
//! Candidates are either an explicit record-id list or the store's queue of
//! unanalyzed active video ads. Each ad is analyzed sequentially; a failed
//! video pass falls back to copy-only before the ad is counted as failed.
//! One bad ad never aborts the batch.

use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use adscope_common::retry::{retry_with_backoff_if, RetryPolicy};
use adscope_common::types::{AdAnalysis, AdRecord, DisplayFormat, Sentiment};
use gemini_client::{AdAnalysisResult, GeminiError};

use crate::traits::{AdAnalyzer, RecordStore};

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Batch size cap when pulling from the queue. Clamped to 100.
    pub limit: Option<u32>,
    /// Only consider ads first seen on or after this date.
    pub start_date: Option<NaiveDate>,
    /// Analyze exactly these records instead of the queue.
    pub ad_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub total: u64,
    pub analyzed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl std::fmt::Display for AnalysisStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} candidates: {} analyzed, {} failed, {} skipped",
            self.total, self.analyzed, self.failed, self.skipped
        )
    }
}

pub struct AdAnalysisWorkflow<S: RecordStore, A: AdAnalyzer> {
    store: S,
    analyzer: A,
    item_retry: RetryPolicy,
    inter_item_delay: Duration,
}

impl<S: RecordStore, A: AdAnalyzer> AdAnalysisWorkflow<S, A> {
    pub fn new(store: S, analyzer: A) -> Self {
        Self {
            store,
            analyzer,
            item_retry: RetryPolicy::new(2, Duration::from_secs(3)),
            inter_item_delay: Duration::from_secs(2),
        }
    }

    pub fn with_item_retry(mut self, policy: RetryPolicy) -> Self {
        self.item_retry = policy;
        self
    }

    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisStats> {
        let candidates = self.load_candidates(request).await?;
        info!(count = candidates.len(), "Loaded ads for analysis");

        let mut stats = AnalysisStats {
            total: candidates.len() as u64,
            ..Default::default()
        };

        let mut ads = candidates.iter().peekable();
        while let Some(ad) = ads.next() {
            if ad.analysis_completed {
                stats.skipped += 1;
                continue;
            }
            if ad.media_url.is_empty() && ad.ad_copy.is_empty() {
                warn!(record_id = %ad.record_id, "Ad has no media and no copy, skipping");
                stats.skipped += 1;
                continue;
            }

            match self.analyze_one(ad).await {
                Ok(result) => {
                    let analysis = to_analysis(result);
                    match self.store.update_ad_analysis(&ad.record_id, &analysis).await {
                        Ok(()) => {
                            info!(record_id = %ad.record_id, "Ad analysis stored");
                            stats.analyzed += 1;
                        }
                        Err(e) => {
                            warn!(record_id = %ad.record_id, error = %e, "Failed to store analysis");
                            stats.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(record_id = %ad.record_id, error = %e, "Ad analysis failed");
                    stats.failed += 1;
                }
            }

            // Pace the model API between items, not after the last one.
            if ads.peek().is_some() {
                tokio::time::sleep(self.inter_item_delay).await;
            }
        }

        info!(%stats, "Ad-analysis workflow complete");
        Ok(stats)
    }

    async fn load_candidates(&self, request: &AnalysisRequest) -> Result<Vec<AdRecord>> {
        if let Some(ids) = request.ad_ids.as_deref().filter(|ids| !ids.is_empty()) {
            return self.store.get_ads(ids).await;
        }
        let limit = request.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        self.store.ads_for_analysis(limit, request.start_date).await
    }

    /// Video ads go through the media path first, falling back to copy-only
    /// when the media path fails (oversized file, dead URL). Everything else
    /// is copy-only from the start.
    async fn analyze_one(&self, ad: &AdRecord) -> Result<AdAnalysisResult> {
        let is_video = ad.display_format == Some(DisplayFormat::Video) && !ad.media_url.is_empty();

        if is_video {
            match retry_with_backoff_if(&self.item_retry, media_error_is_retryable, || {
                self.analyzer.analyze_video(&ad.media_url, &ad.ad_copy)
            })
            .await
            {
                Ok(result) => return Ok(result),
                Err(e) if !ad.ad_copy.is_empty() => {
                    warn!(record_id = %ad.record_id, error = %e, "Video analysis failed, falling back to copy");
                }
                Err(e) => return Err(e),
            }
        }

        retry_with_backoff_if(&self.item_retry, media_error_is_retryable, || {
            self.analyzer.analyze_copy(&ad.ad_copy)
        })
        .await
    }
}

/// Unknown error types default to retryable; a known model-API error decides
/// for itself (an oversized media file will never shrink on retry).
fn media_error_is_retryable(e: &anyhow::Error) -> bool {
    e.downcast_ref::<GeminiError>()
        .map(GeminiError::is_retryable)
        .unwrap_or(true)
}

fn to_analysis(result: AdAnalysisResult) -> AdAnalysis {
    AdAnalysis {
        insights: result.insights,
        themes: result.themes,
        sentiment: sentiment_from(&result.sentiment),
        call_to_action: result.call_to_action,
        target_audience: result.target_audience,
        analyzed_at: Utc::now(),
    }
}

fn sentiment_from(raw: &str) -> Sentiment {
    match raw.trim().to_ascii_lowercase().as_str() {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_mapping_is_case_insensitive() {
        assert_eq!(sentiment_from("Positive"), Sentiment::Positive);
        assert_eq!(sentiment_from("NEGATIVE"), Sentiment::Negative);
        assert_eq!(sentiment_from("neutral"), Sentiment::Neutral);
        assert_eq!(sentiment_from("enthusiastic"), Sentiment::Neutral);
        assert_eq!(sentiment_from(""), Sentiment::Neutral);
    }
}
