use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use adscope_common::Config;
use airtable_client::AirtableClient;
use apify_client::ApifyClient;
use gemini_client::GeminiClient;

mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting adscope-server");

    let config = Config::from_env();

    let scraper = ApifyClient::new(config.apify_api_token.clone(), config.apify_actor_id.clone());
    let analyzer = GeminiClient::new(config.gemini_api_key.clone());
    // Each workflow owns its own store handle; the client is a thin wrapper
    // around a shared-pool reqwest::Client.
    let fetch_store = AirtableClient::new(
        config.airtable_api_key.clone(),
        config.airtable_base_id.clone(),
    );
    let analysis_store = AirtableClient::new(
        config.airtable_api_key.clone(),
        config.airtable_base_id.clone(),
    );

    let app = routes::build_router(fetch_store, scraper, analysis_store, analyzer).layer(
        tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            },
        ),
    );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("AdScope webhook server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
