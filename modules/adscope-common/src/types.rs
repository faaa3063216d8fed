use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Job lifecycle
// ---------------------------------------------------------------------------

/// Status of an ad-fetch job. Transitions are monotonic per lifecycle pass:
/// Pending → Running → {Completed, Failed}. Failed and Pending may be
/// re-triggered back into Running; nothing is reachable from Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether a trigger may (re-)enter Running from this status.
    pub fn is_triggerable(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

/// Recency window for a scrape, carried as an explicit job attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Last24h,
    Last7d,
    Last30d,
    All,
}

impl TimeRange {
    /// Absolute cutoff for this window, or `None` for an unbounded scrape.
    pub fn date_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Last24h => Some(now - Duration::hours(24)),
            TimeRange::Last7d => Some(now - Duration::days(7)),
            TimeRange::Last30d => Some(now - Duration::days(30)),
            TimeRange::All => None,
        }
    }
}

/// One scrape run against a set of brands, as stored in the record store.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub record_id: String,
    pub name: String,
    pub status: JobStatus,
    /// Linked brand record ids. At least one is required to run.
    pub brand_ids: Vec<String>,
    pub time_range: TimeRange,
    pub max_results: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ad_ids: Vec<String>,
    pub ads_count: Option<u32>,
    pub error_message: Option<String>,
}

/// Partial update applied to a job record on a status transition.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ads_count: Option<u32>,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Brands
// ---------------------------------------------------------------------------

/// A monitored competitor. Owned by user-facing CRUD; read-only here.
#[derive(Debug, Clone)]
pub struct BrandRecord {
    pub record_id: String,
    pub name: String,
    pub facebook_page_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Validate that a brand source URL points at the scrape provider's domain.
pub fn validate_page_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;
    match parsed.host_str() {
        Some(host) if host == "facebook.com" || host.ends_with(".facebook.com") => Ok(()),
        Some(host) => Err(format!("expected a facebook.com URL, got host '{host}'")),
        None => Err("URL has no host".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Ads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdStatus {
    Active,
    Inactive,
}

impl std::fmt::Display for AdStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdStatus::Active => write!(f, "Active"),
            AdStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

/// Creative format, inferred from the media fields the provider returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayFormat {
    #[serde(alias = "video")]
    Video,
    #[serde(alias = "image")]
    Image,
    #[serde(alias = "carousel")]
    Carousel,
    #[serde(alias = "text")]
    Text,
}

impl std::fmt::Display for DisplayFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisplayFormat::Video => "Video",
            DisplayFormat::Image => "Image",
            DisplayFormat::Carousel => "Carousel",
            DisplayFormat::Text => "Text",
        };
        write!(f, "{s}")
    }
}

/// A canonical ad ready for upsert, before the store assigns a record id.
/// Produced by the ad-fetch workflow from normalized scrape output.
#[derive(Debug, Clone)]
pub struct NewAd {
    pub ad_id: String,
    /// Provider-assigned archive id, the deduplication key.
    pub archive_id: String,
    pub page_id: String,
    pub page_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub platform: String,
    pub display_format: DisplayFormat,
    pub permalink_url: String,
    pub media_url: String,
    pub thumbnail_url: String,
    pub ad_copy: String,
    pub impressions: u64,
    pub status: AdStatus,
    /// Owning brand record id.
    pub brand_id: String,
}

/// A stored ad creative. `job_ids` grows (set union) on every re-sighting.
#[derive(Debug, Clone)]
pub struct AdRecord {
    pub record_id: String,
    pub ad_id: String,
    pub archive_id: String,
    pub page_id: String,
    pub page_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub platform: String,
    pub display_format: Option<DisplayFormat>,
    pub permalink_url: String,
    pub media_url: String,
    pub thumbnail_url: String,
    pub ad_copy: String,
    pub impressions: u64,
    pub status: Option<AdStatus>,
    pub brand_ids: Vec<String>,
    pub job_ids: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub analysis_completed: bool,
}

/// Mutable fields refreshed when an already-known archive id is seen again.
#[derive(Debug, Clone)]
pub struct AdSighting {
    pub end_date: NaiveDate,
    pub status: AdStatus,
    pub impressions: u64,
    pub media_url: String,
    pub thumbnail_url: String,
    /// Full job link set after union with the sighting job.
    pub job_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        };
        write!(f, "{s}")
    }
}

/// Structured analysis written back onto an ad record, exactly once.
#[derive(Debug, Clone)]
pub struct AdAnalysis {
    pub insights: String,
    pub themes: Vec<String>,
    pub sentiment: Sentiment,
    pub call_to_action: String,
    pub target_audience: String,
    pub analyzed_at: DateTime<Utc>,
}
