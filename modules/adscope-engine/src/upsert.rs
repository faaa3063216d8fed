//! Batched upsert-with-dedup for scraped ads.
//!
//! Archive id is the dedup key: a re-sighted creative updates its mutable
//! fields and grows its job link set instead of creating a second row.
//! One bad record never aborts the batch.

use std::time::Duration;

use tracing::{info, warn};

use adscope_common::types::{AdSighting, NewAd};

use crate::traits::RecordStore;

/// Records per batch; the store rate-limits at 5 requests per second.
pub const UPSERT_BATCH_SIZE: usize = 10;

/// Pause between batches.
pub const INTER_BATCH_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl std::fmt::Display for UpsertStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created={} updated={} skipped={}",
            self.created, self.updated, self.skipped
        )
    }
}

/// Upsert `ads` under `job_id` in rate-limited batches. Per-record failures
/// are logged and counted as skipped; the routine itself never fails.
pub async fn upsert_ads<S: RecordStore + ?Sized>(
    store: &S,
    ads: &[NewAd],
    job_id: &str,
    inter_batch_delay: Duration,
) -> UpsertStats {
    let mut stats = UpsertStats::default();

    let mut batches = ads.chunks(UPSERT_BATCH_SIZE).peekable();
    while let Some(batch) = batches.next() {
        for ad in batch {
            match upsert_one(store, ad, job_id).await {
                Ok(Upserted::Created) => stats.created += 1,
                Ok(Upserted::Updated) => stats.updated += 1,
                Err(e) => {
                    warn!(archive_id = %ad.archive_id, error = %e, "Failed to upsert ad, skipping");
                    stats.skipped += 1;
                }
            }
        }
        if batches.peek().is_some() {
            tokio::time::sleep(inter_batch_delay).await;
        }
    }

    info!(job_id, %stats, "Upsert complete");
    stats
}

enum Upserted {
    Created,
    Updated,
}

async fn upsert_one<S: RecordStore + ?Sized>(
    store: &S,
    ad: &NewAd,
    job_id: &str,
) -> anyhow::Result<Upserted> {
    match store.find_ad_by_archive_id(&ad.archive_id).await? {
        Some(existing) => {
            // Union, preserving existing link order.
            let mut job_ids = existing.job_ids.clone();
            if !job_ids.iter().any(|id| id == job_id) {
                job_ids.push(job_id.to_string());
            }
            let sighting = AdSighting {
                end_date: ad.end_date,
                status: ad.status,
                impressions: ad.impressions,
                media_url: ad.media_url.clone(),
                thumbnail_url: ad.thumbnail_url.clone(),
                job_ids,
            };
            store.update_ad_sighting(&existing.record_id, &sighting).await?;
            Ok(Upserted::Updated)
        }
        None => {
            store.create_ad(ad, job_id).await?;
            Ok(Upserted::Created)
        }
    }
}
