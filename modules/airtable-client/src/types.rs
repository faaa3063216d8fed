//! Wire types for the Airtable REST API and conversions to domain records.
//!
//! Airtable omits empty fields from responses entirely, so every field is
//! optional (or defaulted) here and resolved during conversion.

use adscope_common::types::{
    AdAnalysis, AdRecord, AdSighting, AdStatus, BrandRecord, DisplayFormat, JobRecord, JobStatus,
    JobUpdate, NewAd, TimeRange,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Table names in the base.
pub mod tables {
    pub const BRANDS: &str = "Brands";
    pub const JOBS: &str = "Ad Fetch Jobs";
    pub const ADS: &str = "Ads (Ad Intelligence)";
}

/// One record as Airtable returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Record<F> {
    pub id: String,
    #[serde(rename = "createdTime")]
    pub created_time: Option<DateTime<Utc>>,
    pub fields: F,
}

/// Envelope for list queries.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordList<F> {
    pub records: Vec<Record<F>>,
}

// ---------------------------------------------------------------------------
// Brands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandFields {
    pub brand_name: Option<String>,
    pub facebook_page_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Record<BrandFields>> for BrandRecord {
    fn from(record: Record<BrandFields>) -> Self {
        BrandRecord {
            record_id: record.id,
            name: record.fields.brand_name.unwrap_or_default(),
            facebook_page_url: record.fields.facebook_page_url.unwrap_or_default(),
            created_at: record.fields.created_at.or(record.created_time),
        }
    }
}

pub fn brand_create_fields(name: &str, page_url: &str, now: DateTime<Utc>) -> Value {
    json!({
        "brand_name": name,
        "facebook_page_url": page_url,
        "created_at": now.to_rfc3339(),
    })
}

pub fn brand_update_fields(name: Option<&str>, page_url: Option<&str>) -> Value {
    let mut fields = serde_json::Map::new();
    if let Some(name) = name {
        fields.insert("brand_name".to_string(), json!(name));
    }
    if let Some(page_url) = page_url {
        fields.insert("facebook_page_url".to_string(), json!(page_url));
    }
    Value::Object(fields)
}

// ---------------------------------------------------------------------------
// Ad Fetch Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobFields {
    pub name: Option<String>,
    pub status: Option<JobStatus>,
    /// Linked Brand record ids. The column is named after the brand link.
    pub brand_name: Vec<String>,
    pub time_range: Option<TimeRange>,
    pub max_results: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "Ads (Ad Intelligence)")]
    pub ads: Vec<String>,
    pub ads_count: Option<u32>,
    pub error_message: Option<String>,
}

impl From<Record<JobFields>> for JobRecord {
    fn from(record: Record<JobFields>) -> Self {
        JobRecord {
            record_id: record.id,
            name: record.fields.name.unwrap_or_default(),
            status: record.fields.status.unwrap_or(JobStatus::Pending),
            brand_ids: record.fields.brand_name,
            time_range: record.fields.time_range.unwrap_or_default(),
            max_results: record.fields.max_results.unwrap_or(5),
            created_at: record.fields.created_at.or(record.created_time),
            started_at: record.fields.started_at,
            completed_at: record.fields.completed_at,
            ad_ids: record.fields.ads,
            ads_count: record.fields.ads_count,
            error_message: record.fields.error_message,
        }
    }
}

pub fn job_create_fields(
    name: &str,
    brand_ids: &[String],
    time_range: TimeRange,
    max_results: u32,
    now: DateTime<Utc>,
) -> Value {
    json!({
        "name": name,
        "brand_name": brand_ids,
        "status": JobStatus::Pending,
        "time_range": time_range,
        "max_results": max_results,
        "created_at": now.to_rfc3339(),
    })
}

/// Only fields present in the update make it into the PATCH body.
pub fn job_update_fields(status: JobStatus, update: &JobUpdate) -> Value {
    let mut fields = Map::new();
    fields.insert("status".to_string(), json!(status));
    if let Some(ts) = update.started_at {
        fields.insert("started_at".to_string(), json!(ts.to_rfc3339()));
    }
    if let Some(ts) = update.completed_at {
        fields.insert("completed_at".to_string(), json!(ts.to_rfc3339()));
    }
    if let Some(count) = update.ads_count {
        fields.insert("ads_count".to_string(), json!(count));
    }
    match (&update.error_message, status) {
        (Some(msg), _) => {
            fields.insert("error_message".to_string(), json!(msg));
        }
        // Completing a run clears any note left by an earlier failed pass.
        (None, JobStatus::Completed) => {
            fields.insert("error_message".to_string(), Value::Null);
        }
        (None, _) => {}
    }
    Value::Object(fields)
}

// ---------------------------------------------------------------------------
// Ads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdFields {
    pub ad_id: Option<String>,
    pub ad_archive_id: Option<String>,
    pub page_id: Option<String>,
    pub page_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub platform: Option<String>,
    pub display_format: Option<DisplayFormat>,
    pub permalink_url: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub ad_copy: Option<String>,
    pub impressions: Option<u64>,
    pub status: Option<AdStatus>,
    pub brand: Vec<String>,
    pub job: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub analysis_completed: Option<bool>,
}

impl From<Record<AdFields>> for AdRecord {
    fn from(record: Record<AdFields>) -> Self {
        AdRecord {
            record_id: record.id,
            ad_id: record.fields.ad_id.unwrap_or_default(),
            archive_id: record.fields.ad_archive_id.unwrap_or_default(),
            page_id: record.fields.page_id.unwrap_or_default(),
            page_name: record.fields.page_name.unwrap_or_default(),
            start_date: record.fields.start_date,
            end_date: record.fields.end_date,
            platform: record.fields.platform.unwrap_or_default(),
            display_format: record.fields.display_format,
            permalink_url: record.fields.permalink_url.unwrap_or_default(),
            media_url: record.fields.media_url.unwrap_or_default(),
            thumbnail_url: record.fields.thumbnail_url.unwrap_or_default(),
            ad_copy: record.fields.ad_copy.unwrap_or_default(),
            impressions: record.fields.impressions.unwrap_or(0),
            status: record.fields.status,
            brand_ids: record.fields.brand,
            job_ids: record.fields.job,
            created_at: record.fields.created_at.or(record.created_time),
            analysis_completed: record.fields.analysis_completed.unwrap_or(false),
        }
    }
}

pub fn ad_create_fields(ad: &NewAd, job_id: &str, now: DateTime<Utc>) -> Value {
    json!({
        "ad_id": ad.ad_id,
        "ad_archive_id": ad.archive_id,
        "page_id": ad.page_id,
        "page_name": ad.page_name,
        "start_date": ad.start_date,
        "end_date": ad.end_date,
        "platform": ad.platform,
        "display_format": ad.display_format,
        "permalink_url": ad.permalink_url,
        "media_url": ad.media_url,
        "thumbnail_url": ad.thumbnail_url,
        "ad_copy": ad.ad_copy,
        "impressions": ad.impressions,
        "status": ad.status,
        "brand": [ad.brand_id],
        "job": [job_id],
        "created_at": now.to_rfc3339(),
    })
}

/// Mutable-field refresh for a re-sighted archive id. `job` carries the
/// full link set after union.
pub fn ad_sighting_fields(sighting: &AdSighting) -> Value {
    json!({
        "end_date": sighting.end_date,
        "status": sighting.status,
        "impressions": sighting.impressions,
        "media_url": sighting.media_url,
        "thumbnail_url": sighting.thumbnail_url,
        "job": sighting.job_ids,
    })
}

pub fn ad_analysis_fields(analysis: &AdAnalysis) -> Value {
    json!({
        "analysis_insights": analysis.insights,
        "analysis_themes": analysis.themes.join(", "),
        "analysis_sentiment": analysis.sentiment,
        "analysis_cta": analysis.call_to_action,
        "analysis_target_audience": analysis.target_audience,
        "analysis_completed": true,
        "analysis_date": analysis.analyzed_at.to_rfc3339(),
    })
}
