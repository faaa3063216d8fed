use std::time::Duration;

use adscope_common::retry::RetryPolicy;
use adscope_common::types::{AdStatus, DisplayFormat, Sentiment};
use adscope_engine::testing::{ad_record, MockAnalyzer, MockRecordStore, VideoBehavior};
use adscope_engine::{AdAnalysisWorkflow, AnalysisRequest};
use chrono::{Duration as ChronoDuration, Utc};

fn fast_workflow(
    store: MockRecordStore,
    analyzer: MockAnalyzer,
) -> AdAnalysisWorkflow<MockRecordStore, MockAnalyzer> {
    AdAnalysisWorkflow::new(store, analyzer)
        .with_item_retry(RetryPolicy::new(2, Duration::from_millis(1)))
        .with_inter_item_delay(Duration::ZERO)
}

#[tokio::test]
async fn analyzes_queue_and_stores_results() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    store.insert_ad(ad_record("recAd002", "222"));
    let analyzer = MockAnalyzer::new();

    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.analyzed, 2);
    assert_eq!(stats.failed, 0);
    assert_eq!(analyzer.video_calls(), 2);
    assert_eq!(analyzer.copy_calls(), 0);

    let analysis = store.analysis("recAd001").unwrap();
    assert_eq!(analysis.sentiment, Sentiment::Positive);
    assert_eq!(analysis.themes, vec!["discount", "urgency"]);
    assert!(store.ad_by_archive_id("111").unwrap().analysis_completed);
}

#[tokio::test]
async fn queue_excludes_ineligible_ads() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    let mut analyzed = ad_record("recAd002", "222");
    analyzed.analysis_completed = true;
    store.insert_ad(analyzed);
    let mut inactive = ad_record("recAd003", "333");
    inactive.status = Some(AdStatus::Inactive);
    store.insert_ad(inactive);
    let mut image = ad_record("recAd004", "444");
    image.display_format = Some(DisplayFormat::Image);
    store.insert_ad(image);
    let analyzer = MockAnalyzer::new();

    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 1);
    assert_eq!(stats.analyzed, 1);
    assert!(store.analysis("recAd001").is_some());
    assert!(store.analysis("recAd003").is_none());
}

#[tokio::test]
async fn start_date_filters_older_ads() {
    let store = MockRecordStore::new();
    let mut old = ad_record("recAd001", "111");
    old.created_at = Some(Utc::now() - ChronoDuration::days(30));
    store.insert_ad(old);
    store.insert_ad(ad_record("recAd002", "222"));
    let analyzer = MockAnalyzer::new();

    let request = AnalysisRequest {
        start_date: Some(Utc::now().date_naive() - ChronoDuration::days(7)),
        ..Default::default()
    };
    let stats = fast_workflow(store.clone(), analyzer)
        .run(&request)
        .await
        .unwrap();

    assert_eq!(stats.total, 1);
    assert!(store.analysis("recAd002").is_some());
    assert!(store.analysis("recAd001").is_none());
}

#[tokio::test]
async fn oversized_media_falls_back_to_copy_without_retry() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    let analyzer = MockAnalyzer::new().video_behavior(VideoBehavior::FailOversized);

    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    // Non-retryable: exactly one video attempt, then the copy path.
    assert_eq!(analyzer.video_calls(), 1);
    assert_eq!(analyzer.copy_calls(), 1);
    assert_eq!(stats.analyzed, 1);
    let analysis = store.analysis("recAd001").unwrap();
    assert!(analysis.insights.contains("copy"));
}

#[tokio::test]
async fn transient_video_failures_burn_retries_before_fallback() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    let analyzer = MockAnalyzer::new().video_behavior(VideoBehavior::FailRetryable);

    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    // 1 attempt + 2 retries on the video path, then one copy call.
    assert_eq!(analyzer.video_calls(), 3);
    assert_eq!(analyzer.copy_calls(), 1);
    assert_eq!(stats.analyzed, 1);
}

#[tokio::test]
async fn both_paths_failing_counts_the_ad_as_failed() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    store.insert_ad(ad_record("recAd002", "222"));
    let analyzer = MockAnalyzer::new()
        .video_behavior(VideoBehavior::FailOversized)
        .copy_fails();

    let stats = fast_workflow(store.clone(), analyzer)
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.analyzed, 0);
    assert!(!store.ad_by_archive_id("111").unwrap().analysis_completed);
}

#[tokio::test]
async fn video_without_copy_does_not_fall_back() {
    let store = MockRecordStore::new();
    let mut ad = ad_record("recAd001", "111");
    ad.ad_copy = String::new();
    store.insert_ad(ad);
    let analyzer = MockAnalyzer::new().video_behavior(VideoBehavior::FailOversized);

    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    assert_eq!(analyzer.copy_calls(), 0);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn explicit_ad_ids_bypass_the_queue_but_skip_analyzed() {
    let store = MockRecordStore::new();
    // Inactive image ad: ineligible for the queue, honored when named.
    let mut named = ad_record("recAd001", "111");
    named.status = Some(AdStatus::Inactive);
    named.display_format = Some(DisplayFormat::Image);
    store.insert_ad(named);
    let mut done = ad_record("recAd002", "222");
    done.analysis_completed = true;
    store.insert_ad(done);
    store.insert_ad(ad_record("recAd003", "333"));
    let analyzer = MockAnalyzer::new();

    let request = AnalysisRequest {
        ad_ids: Some(vec!["recAd001".to_string(), "recAd002".to_string()]),
        ..Default::default()
    };
    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&request)
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.analyzed, 1);
    assert_eq!(stats.skipped, 1);
    // Image format goes straight to the copy path.
    assert_eq!(analyzer.video_calls(), 0);
    assert_eq!(analyzer.copy_calls(), 1);
    assert!(store.analysis("recAd001").is_some());
    // The queued ad recAd003 was not touched.
    assert!(store.analysis("recAd003").is_none());
}

#[tokio::test]
async fn ad_with_no_media_and_no_copy_is_skipped() {
    let store = MockRecordStore::new();
    let mut bare = ad_record("recAd001", "111");
    bare.media_url = String::new();
    bare.ad_copy = String::new();
    store.insert_ad(bare);
    let analyzer = MockAnalyzer::new();

    let request = AnalysisRequest {
        ad_ids: Some(vec!["recAd001".to_string()]),
        ..Default::default()
    };
    let stats = fast_workflow(store.clone(), analyzer.clone())
        .run(&request)
        .await
        .unwrap();

    assert_eq!(stats.skipped, 1);
    assert_eq!(analyzer.video_calls(), 0);
    assert_eq!(analyzer.copy_calls(), 0);
}

#[tokio::test]
async fn failed_store_write_counts_as_failed() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    store.fail_analysis_write("recAd001");
    let analyzer = MockAnalyzer::new();

    let stats = fast_workflow(store.clone(), analyzer)
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert!(!store.ad_by_archive_id("111").unwrap().analysis_completed);
}

#[tokio::test]
async fn limit_caps_the_queue() {
    let store = MockRecordStore::new();
    for i in 0..5i64 {
        let mut ad = ad_record(&format!("recAd{i:03}"), &format!("{i}"));
        ad.created_at = Some(Utc::now() - ChronoDuration::minutes(i));
        store.insert_ad(ad);
    }
    let analyzer = MockAnalyzer::new();

    let request = AnalysisRequest {
        limit: Some(2),
        ..Default::default()
    };
    let stats = fast_workflow(store.clone(), analyzer)
        .run(&request)
        .await
        .unwrap();

    assert_eq!(stats.total, 2);
    // Newest first.
    assert!(store.analysis("recAd000").is_some());
    assert!(store.analysis("recAd001").is_some());
    assert!(store.analysis("recAd004").is_none());
}

#[tokio::test]
async fn analysis_timestamp_is_recent() {
    let store = MockRecordStore::new();
    store.insert_ad(ad_record("recAd001", "111"));
    let before = Utc::now();

    fast_workflow(store.clone(), MockAnalyzer::new())
        .run(&AnalysisRequest::default())
        .await
        .unwrap();

    let analysis = store.analysis("recAd001").unwrap();
    assert!(analysis.analyzed_at >= before);
    assert!(analysis.analyzed_at <= Utc::now());
}
