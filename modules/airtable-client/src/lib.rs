pub mod error;
pub mod types;

pub use error::{AirtableError, Result};
pub use types::{tables, AdFields, BrandFields, JobFields, Record, RecordList};

use std::time::Duration;

use adscope_common::retry::{retry_with_backoff_if, RetryPolicy};
use adscope_common::types::{
    validate_page_url, AdAnalysis, AdRecord, AdSighting, BrandRecord, JobRecord, JobStatus,
    JobUpdate, NewAd, TimeRange,
};
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

const BASE_URL: &str = "https://api.airtable.com/v0";

/// Typed façade over the Airtable base holding Brands, Ad Fetch Jobs,
/// and Ads. Every request funnels through one helper that retries
/// transient failures (429, 503/504, network) with short backoff.
pub struct AirtableClient {
    http: reqwest::Client,
    api_key: String,
    base_id: String,
    base_url: String,
    retry: RetryPolicy,
}

impl AirtableClient {
    pub fn new(api_key: String, base_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_id,
            base_url: BASE_URL.to_string(),
            retry: RetryPolicy::new(2, Duration::from_millis(500)),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    // -----------------------------------------------------------------------
    // Ad Fetch Jobs
    // -----------------------------------------------------------------------

    pub async fn get_job(&self, record_id: &str) -> Result<Option<JobRecord>> {
        match self
            .request::<Record<JobFields>>(Method::GET, self.record_url(tables::JOBS, record_id)?, None)
            .await
        {
            Ok(record) => Ok(Some(record.into())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn create_job(
        &self,
        name: &str,
        brand_ids: &[String],
        time_range: TimeRange,
        max_results: u32,
    ) -> Result<JobRecord> {
        let fields =
            types::job_create_fields(name, brand_ids, time_range, max_results, Utc::now());
        let record: Record<JobFields> = self
            .request(
                Method::POST,
                self.table_url(tables::JOBS)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(record.into())
    }

    /// Apply a status transition plus whichever stamps accompany it.
    pub async fn update_job_status(
        &self,
        record_id: &str,
        status: JobStatus,
        update: &JobUpdate,
    ) -> Result<()> {
        let fields = types::job_update_fields(status, update);
        let _: Record<JobFields> = self
            .request(
                Method::PATCH,
                self.record_url(tables::JOBS, record_id)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(())
    }

    /// All jobs, optionally narrowed to one status, newest first.
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobRecord>> {
        let mut url = self.table_url(tables::JOBS)?;
        if let Some(status) = status {
            url.query_pairs_mut()
                .append_pair("filterByFormula", &format!("{{status}} = '{status}'"));
        }
        url.query_pairs_mut()
            .append_pair("sort[0][field]", "created_at")
            .append_pair("sort[0][direction]", "desc");
        let list: RecordList<JobFields> = self.request(Method::GET, url, None).await?;
        Ok(list.records.into_iter().map(Into::into).collect())
    }

    /// Delete a job. Refused while the job is Running; the orchestrator
    /// owns in-flight jobs exclusively.
    pub async fn delete_job(&self, record_id: &str) -> Result<()> {
        if let Some(job) = self.get_job(record_id).await? {
            if job.status == JobStatus::Running {
                return Err(AirtableError::JobRunning(record_id.to_string()));
            }
        }
        let _: Value = self
            .request(Method::DELETE, self.record_url(tables::JOBS, record_id)?, None)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Brands
    // -----------------------------------------------------------------------

    pub async fn get_brand(&self, record_id: &str) -> Result<Option<BrandRecord>> {
        match self
            .request::<Record<BrandFields>>(
                Method::GET,
                self.record_url(tables::BRANDS, record_id)?,
                None,
            )
            .await
        {
            Ok(record) => Ok(Some(record.into())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Batch-resolve brands by record id in a single filtered query.
    pub async fn get_brands(&self, record_ids: &[String]) -> Result<Vec<BrandRecord>> {
        if record_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.table_url(tables::BRANDS)?;
        url.query_pairs_mut()
            .append_pair("filterByFormula", &record_id_filter(record_ids));
        let list: RecordList<BrandFields> = self.request(Method::GET, url, None).await?;
        Ok(list.records.into_iter().map(Into::into).collect())
    }

    pub async fn list_brands(&self) -> Result<Vec<BrandRecord>> {
        let mut url = self.table_url(tables::BRANDS)?;
        url.query_pairs_mut()
            .append_pair("sort[0][field]", "created_at")
            .append_pair("sort[0][direction]", "desc");
        let list: RecordList<BrandFields> = self.request(Method::GET, url, None).await?;
        Ok(list.records.into_iter().map(Into::into).collect())
    }

    pub async fn create_brand(&self, name: &str, page_url: &str) -> Result<BrandRecord> {
        validate_page_url(page_url).map_err(AirtableError::InvalidPageUrl)?;
        let fields = types::brand_create_fields(name, page_url, Utc::now());
        let record: Record<BrandFields> = self
            .request(
                Method::POST,
                self.table_url(tables::BRANDS)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(record.into())
    }

    /// Rename a brand or repoint its page URL. Unset arguments are left
    /// untouched.
    pub async fn update_brand(
        &self,
        record_id: &str,
        name: Option<&str>,
        page_url: Option<&str>,
    ) -> Result<BrandRecord> {
        if let Some(page_url) = page_url {
            validate_page_url(page_url).map_err(AirtableError::InvalidPageUrl)?;
        }
        let fields = types::brand_update_fields(name, page_url);
        let record: Record<BrandFields> = self
            .request(
                Method::PATCH,
                self.record_url(tables::BRANDS, record_id)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(record.into())
    }

    pub async fn delete_brand(&self, record_id: &str) -> Result<()> {
        let _: Value = self
            .request(Method::DELETE, self.record_url(tables::BRANDS, record_id)?, None)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ads
    // -----------------------------------------------------------------------

    /// Exact-match lookup on the dedup key. At most one row is expected;
    /// the store does not enforce uniqueness, this client does.
    pub async fn find_ad_by_archive_id(&self, archive_id: &str) -> Result<Option<AdRecord>> {
        let mut url = self.table_url(tables::ADS)?;
        url.query_pairs_mut()
            .append_pair(
                "filterByFormula",
                &format!("{{ad_archive_id}} = '{}'", escape_formula_value(archive_id)),
            )
            .append_pair("maxRecords", "1");
        let list: RecordList<AdFields> = self.request(Method::GET, url, None).await?;
        Ok(list.records.into_iter().next().map(Into::into))
    }

    pub async fn create_ad(&self, ad: &NewAd, job_id: &str) -> Result<String> {
        let fields = types::ad_create_fields(ad, job_id, Utc::now());
        let record: Record<AdFields> = self
            .request(
                Method::POST,
                self.table_url(tables::ADS)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(record.id)
    }

    /// Refresh mutable fields on a re-sighted ad and replace its job link
    /// set with the pre-computed union.
    pub async fn update_ad_sighting(&self, record_id: &str, sighting: &AdSighting) -> Result<()> {
        let fields = types::ad_sighting_fields(sighting);
        let _: Record<AdFields> = self
            .request(
                Method::PATCH,
                self.record_url(tables::ADS, record_id)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(())
    }

    /// Unanalyzed active video ads, newest first, optionally bounded to
    /// those that started after `start_date`.
    pub async fn ads_for_analysis(
        &self,
        limit: u32,
        start_date: Option<NaiveDate>,
    ) -> Result<Vec<AdRecord>> {
        let mut url = self.table_url(tables::ADS)?;
        url.query_pairs_mut()
            .append_pair("filterByFormula", &analysis_filter(start_date))
            .append_pair("maxRecords", &limit.to_string())
            .append_pair("sort[0][field]", "created_at")
            .append_pair("sort[0][direction]", "desc");
        let list: RecordList<AdFields> = self.request(Method::GET, url, None).await?;
        Ok(list.records.into_iter().map(Into::into).collect())
    }

    pub async fn get_ad(&self, record_id: &str) -> Result<Option<AdRecord>> {
        match self
            .request::<Record<AdFields>>(Method::GET, self.record_url(tables::ADS, record_id)?, None)
            .await
        {
            Ok(record) => Ok(Some(record.into())),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Batch fetch ads by record id (explicit-id analysis triggers).
    pub async fn get_ads(&self, record_ids: &[String]) -> Result<Vec<AdRecord>> {
        if record_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.table_url(tables::ADS)?;
        url.query_pairs_mut()
            .append_pair("filterByFormula", &record_id_filter(record_ids));
        let list: RecordList<AdFields> = self.request(Method::GET, url, None).await?;
        Ok(list.records.into_iter().map(Into::into).collect())
    }

    /// Write analysis results back. Sets `analysis_completed`, which gates
    /// the row out of future analysis batches.
    pub async fn update_ad_analysis(&self, record_id: &str, analysis: &AdAnalysis) -> Result<()> {
        let fields = types::ad_analysis_fields(analysis);
        let _: Record<AdFields> = self
            .request(
                Method::PATCH,
                self.record_url(tables::ADS, record_id)?,
                Some(json!({ "fields": fields })),
            )
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn table_url(&self, table: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| AirtableError::Parse(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AirtableError::Parse("base URL cannot be a base".to_string()))?
            .push(&self.base_id)
            .push(table);
        Ok(url)
    }

    fn record_url(&self, table: &str, record_id: &str) -> Result<url::Url> {
        let mut url = self.table_url(table)?;
        url.path_segments_mut()
            .map_err(|_| AirtableError::Parse("base URL cannot be a base".to_string()))?
            .push(record_id);
        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: url::Url,
        body: Option<Value>,
    ) -> Result<T> {
        retry_with_backoff_if(&self.retry, AirtableError::is_retryable, || {
            let method = method.clone();
            let url = url.clone();
            let body = body.clone();
            async move {
                let mut req = self
                    .http
                    .request(method, url)
                    .bearer_auth(&self.api_key);
                if let Some(body) = &body {
                    req = req.json(body);
                }
                let resp = req.send().await?;

                let status = resp.status();
                if !status.is_success() {
                    let message = resp.text().await.unwrap_or_default();
                    return Err(AirtableError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }

                Ok(resp.json::<T>().await?)
            }
        })
        .await
    }
}

fn is_not_found(err: &AirtableError) -> bool {
    matches!(err, AirtableError::Api { status: 404, .. })
}

/// Single-quote formula literals cannot carry quotes; record ids and
/// archive ids are provider-assigned and never contain them, but strip
/// anyway so a hostile value cannot splice the formula.
fn escape_formula_value(value: &str) -> String {
    value.replace(['\'', '"'], "")
}

/// `OR(RECORD_ID()='rec1',RECORD_ID()='rec2',...)` — Airtable has no bulk
/// get-by-id, so batch resolution goes through one filtered query.
fn record_id_filter(record_ids: &[String]) -> String {
    let clauses: Vec<String> = record_ids
        .iter()
        .map(|id| format!("RECORD_ID()='{}'", escape_formula_value(id)))
        .collect();
    format!("OR({})", clauses.join(","))
}

fn analysis_filter(start_date: Option<NaiveDate>) -> String {
    let mut formula = String::from(
        "AND({status} = 'Active', \
         OR({display_format} = 'Video', {display_format} = 'video'), \
         {analysis_completed} = FALSE()",
    );
    if let Some(date) = start_date {
        formula.push_str(&format!(", IS_AFTER({{start_date}}, '{date}')"));
    }
    formula.push(')');
    formula
}
