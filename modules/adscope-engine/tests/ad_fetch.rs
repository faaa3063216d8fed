use std::time::Duration;

use adscope_common::retry::RetryPolicy;
use adscope_common::types::{JobStatus, TimeRange};
use adscope_engine::testing::{
    ad_record, brand_record, job_record, normalized_ad, MockRecordStore, MockScraper,
};
use adscope_engine::AdFetchWorkflow;
use chrono::NaiveDate;

fn fast_workflow(
    store: MockRecordStore,
    scraper: MockScraper,
) -> AdFetchWorkflow<MockRecordStore, MockScraper> {
    AdFetchWorkflow::new(store, scraper)
        .with_scrape_retry(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_upsert_delay(Duration::ZERO)
}

#[tokio::test]
async fn happy_path_creates_and_updates_then_completes() {
    let store = MockRecordStore::new();
    store.insert_job(job_record("recJob001", &["recBrand001"]));
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    // Archive id 111 is already known from an earlier job.
    let mut existing = ad_record("recAdSeed", "111");
    existing.job_ids = vec!["recJobOld".to_string()];
    existing.end_date = NaiveDate::from_ymd_opt(2024, 5, 10);
    store.insert_ad(existing);

    let mut resighted = normalized_ad("111", "1234567890", "Acme");
    resighted.end_date = NaiveDate::from_ymd_opt(2024, 5, 28).unwrap();
    let fresh = normalized_ad("222", "1234567890", "Acme");
    let scraper = MockScraper::new(vec![resighted, fresh]);

    let stats = fast_workflow(store.clone(), scraper)
        .run("recJob001")
        .await
        .unwrap();

    assert_eq!(stats.created, 1);
    assert_eq!(stats.updated, 1);

    let job = store.job("recJob001").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.ads_count, Some(2));
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());
    assert_eq!(
        store.status_log("recJob001"),
        vec![JobStatus::Running, JobStatus::Completed]
    );

    let row = store.ad_by_archive_id("111").unwrap();
    assert_eq!(row.end_date, NaiveDate::from_ymd_opt(2024, 5, 28));
    assert_eq!(
        row.job_ids,
        vec!["recJobOld".to_string(), "recJob001".to_string()]
    );
}

#[tokio::test]
async fn scrape_request_carries_job_attributes() {
    let store = MockRecordStore::new();
    let mut job = job_record("recJob001", &["recBrand001"]);
    job.time_range = TimeRange::Last30d;
    job.max_results = 25;
    store.insert_job(job);
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    let scraper = MockScraper::new(Vec::new());

    fast_workflow(store, scraper.clone())
        .run("recJob001")
        .await
        .unwrap();

    let request = scraper.last_request().unwrap();
    assert_eq!(request.page_urls, vec!["https://www.facebook.com/1234567890"]);
    assert_eq!(request.max_results, 25);
    assert_eq!(request.time_range, TimeRange::Last30d);
}

#[tokio::test]
async fn transient_scrape_failures_are_retried() {
    let store = MockRecordStore::new();
    store.insert_job(job_record("recJob001", &["recBrand001"]));
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    let scraper =
        MockScraper::new(vec![normalized_ad("111", "1234567890", "Acme")]).failing_times(2);

    let stats = fast_workflow(store.clone(), scraper.clone())
        .run("recJob001")
        .await
        .unwrap();

    assert_eq!(scraper.calls(), 3);
    assert_eq!(stats.created, 1);
    assert_eq!(store.job("recJob001").unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn exhausted_scrape_retries_mark_the_job_failed() {
    let store = MockRecordStore::new();
    store.insert_job(job_record("recJob001", &["recBrand001"]));
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    let scraper = MockScraper::new(Vec::new()).failing_times(10);

    let result = fast_workflow(store.clone(), scraper.clone())
        .run("recJob001")
        .await;

    assert!(result.is_err());
    // 1 initial attempt + 3 retries.
    assert_eq!(scraper.calls(), 4);
    let job = store.job("recJob001").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.completed_at.is_some());
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("injected scrape failure"));
}

#[tokio::test]
async fn job_without_brands_fails_with_validation_error() {
    let store = MockRecordStore::new();
    store.insert_job(job_record("recJob001", &[]));
    let scraper = MockScraper::new(Vec::new());

    let result = fast_workflow(store.clone(), scraper.clone())
        .run("recJob001")
        .await;

    assert!(result.is_err());
    assert_eq!(scraper.calls(), 0);
    let job = store.job("recJob001").unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.as_deref().unwrap().contains("No brands"));
}

#[tokio::test]
async fn completed_job_cannot_be_retriggered() {
    let store = MockRecordStore::new();
    let mut job = job_record("recJob001", &["recBrand001"]);
    job.status = JobStatus::Completed;
    store.insert_job(job);
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    let scraper = MockScraper::new(vec![normalized_ad("111", "1234567890", "Acme")]);

    let result = fast_workflow(store.clone(), scraper.clone())
        .run("recJob001")
        .await;

    // Refused before any status write: Completed is terminal.
    assert!(result.is_err());
    assert_eq!(scraper.calls(), 0);
    assert!(store.status_log("recJob001").is_empty());
    assert_eq!(store.job("recJob001").unwrap().status, JobStatus::Completed);
    assert!(store.job("recJob001").unwrap().error_message.is_none());
}

#[tokio::test]
async fn running_job_cannot_be_triggered_concurrently() {
    let store = MockRecordStore::new();
    let mut job = job_record("recJob001", &["recBrand001"]);
    job.status = JobStatus::Running;
    store.insert_job(job);
    let scraper = MockScraper::new(Vec::new());

    let result = fast_workflow(store.clone(), scraper.clone())
        .run("recJob001")
        .await;

    assert!(result.is_err());
    assert_eq!(scraper.calls(), 0);
    assert_eq!(store.job("recJob001").unwrap().status, JobStatus::Running);
}

#[tokio::test]
async fn retriggered_failed_job_completes_and_clears_its_error() {
    let store = MockRecordStore::new();
    let mut job = job_record("recJob001", &["recBrand001"]);
    job.status = JobStatus::Failed;
    job.error_message = Some("injected scrape failure".to_string());
    store.insert_job(job);
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    let scraper = MockScraper::new(vec![normalized_ad("111", "1234567890", "Acme")]);

    let stats = fast_workflow(store.clone(), scraper)
        .run("recJob001")
        .await
        .unwrap();

    assert_eq!(stats.created, 1);
    let job = store.job("recJob001").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn unknown_job_id_errors_without_status_writes() {
    let store = MockRecordStore::new();
    let scraper = MockScraper::new(Vec::new());

    let result = fast_workflow(store.clone(), scraper).run("recMissing").await;

    assert!(result.is_err());
    assert!(store.status_log("recMissing").is_empty());
}

#[tokio::test]
async fn empty_scrape_completes_with_zero_ads() {
    let store = MockRecordStore::new();
    store.insert_job(job_record("recJob001", &["recBrand001"]));
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    let scraper = MockScraper::new(Vec::new());

    let stats = fast_workflow(store.clone(), scraper)
        .run("recJob001")
        .await
        .unwrap();

    assert_eq!(stats, Default::default());
    let job = store.job("recJob001").unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.ads_count, Some(0));
}

#[tokio::test]
async fn ads_are_partitioned_to_their_own_brand() {
    let store = MockRecordStore::new();
    store.insert_job(job_record("recJob001", &["recBrand001", "recBrand002"]));
    store.insert_brand(brand_record(
        "recBrand001",
        "Acme",
        "https://www.facebook.com/1234567890",
    ));
    // Vanity URL carries no numeric id; matching falls back to page name.
    store.insert_brand(brand_record(
        "recBrand002",
        "Globex",
        "https://www.facebook.com/globexcorp",
    ));
    let scraper = MockScraper::new(vec![
        normalized_ad("111", "1234567890", "Acme"),
        normalized_ad("222", "9999999999", "GLOBEX"),
        normalized_ad("333", "5555555555", "Unrelated Page"),
    ]);

    let stats = fast_workflow(store.clone(), scraper)
        .run("recJob001")
        .await
        .unwrap();

    // The unrelated page's ad is dropped.
    assert_eq!(stats.created, 2);
    assert_eq!(
        store.ad_by_archive_id("111").unwrap().brand_ids,
        vec!["recBrand001".to_string()]
    );
    assert_eq!(
        store.ad_by_archive_id("222").unwrap().brand_ids,
        vec!["recBrand002".to_string()]
    );
    assert!(store.ad_by_archive_id("333").is_none());
}
