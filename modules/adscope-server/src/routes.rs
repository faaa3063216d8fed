use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use adscope_engine::{AdAnalysisWorkflow, AdFetchWorkflow, AnalysisRequest};
use airtable_client::AirtableClient;
use apify_client::ApifyClient;
use gemini_client::GeminiClient;

#[derive(Clone)]
pub struct AppState {
    fetch: Arc<AdFetchWorkflow<AirtableClient, ApifyClient>>,
    analysis: Arc<AdAnalysisWorkflow<AirtableClient, GeminiClient>>,
}

pub fn build_router(
    fetch_store: AirtableClient,
    scraper: ApifyClient,
    analysis_store: AirtableClient,
    analyzer: GeminiClient,
) -> Router {
    let state = AppState {
        fetch: Arc::new(AdFetchWorkflow::new(fetch_store, scraper)),
        analysis: Arc::new(AdAnalysisWorkflow::new(analysis_store, analyzer)),
    };

    Router::new()
        .route(
            "/webhooks/ad-fetch-jobs",
            post(trigger_ad_fetch).get(ad_fetch_info),
        )
        .route(
            "/webhooks/ad-analysis",
            post(trigger_ad_analysis).get(ad_analysis_info),
        )
        .route("/health", get(health))
        .with_state(state)
}

/// Fired by the record store's automation when a job row is created.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdFetchTrigger {
    record_id: String,
    #[allow(dead_code)]
    triggered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdAnalysisTrigger {
    limit: Option<u32>,
    start_date: Option<NaiveDate>,
    ad_ids: Option<Vec<String>>,
}

/// Accepts immediately and runs the workflow detached; the webhook caller
/// cannot wait minutes for a scrape run.
async fn trigger_ad_fetch(
    State(state): State<AppState>,
    Json(payload): Json<AdFetchTrigger>,
) -> impl IntoResponse {
    let record_id = payload.record_id.trim().to_string();
    if record_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "recordId is required" })),
        );
    }

    info!(record_id, "Ad-fetch webhook received");

    let workflow = state.fetch.clone();
    let job_id = record_id.clone();
    tokio::spawn(async move {
        if let Err(e) = workflow.run(&job_id).await {
            error!(job_id, error = %e, "Detached ad-fetch run failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "recordId": record_id })),
    )
}

async fn trigger_ad_analysis(
    State(state): State<AppState>,
    Json(payload): Json<AdAnalysisTrigger>,
) -> impl IntoResponse {
    info!(
        limit = ?payload.limit,
        start_date = ?payload.start_date,
        ad_ids = payload.ad_ids.as_ref().map(Vec::len),
        "Ad-analysis webhook received"
    );

    let request = AnalysisRequest {
        limit: payload.limit,
        start_date: payload.start_date,
        ad_ids: payload.ad_ids,
    };

    let workflow = state.analysis.clone();
    tokio::spawn(async move {
        match workflow.run(&request).await {
            Ok(stats) => info!(%stats, "Detached ad-analysis run finished"),
            Err(e) => error!(error = %e, "Detached ad-analysis run failed"),
        }
    });

    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}

// GET on a webhook path answers the store automation's connectivity check.
async fn ad_fetch_info() -> impl IntoResponse {
    Json(json!({ "status": "ok", "endpoint": "ad-fetch-jobs", "method": "POST" }))
}

async fn ad_analysis_info() -> impl IntoResponse {
    Json(json!({ "status": "ok", "endpoint": "ad-analysis", "method": "POST" }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
