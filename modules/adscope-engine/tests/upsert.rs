use std::time::Duration;

use adscope_common::types::AdStatus;
use adscope_engine::testing::{ad_record, normalized_ad, MockRecordStore};
use adscope_engine::{upsert_ads, RecordStore};
use chrono::NaiveDate;

mod support;
use support::new_ad;

#[tokio::test]
async fn creates_rows_for_unseen_archive_ids() {
    let store = MockRecordStore::new();
    let ads = vec![
        new_ad(&normalized_ad("111", "100", "Acme"), "recBrand001"),
        new_ad(&normalized_ad("222", "100", "Acme"), "recBrand001"),
    ];

    let stats = upsert_ads(&store, &ads, "recJob001", Duration::ZERO).await;

    assert_eq!(stats.created, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.skipped, 0);
    assert_eq!(store.ads().len(), 2);
    let row = store.ad_by_archive_id("111").unwrap();
    assert_eq!(row.job_ids, vec!["recJob001".to_string()]);
    assert_eq!(row.brand_ids, vec!["recBrand001".to_string()]);
}

#[tokio::test]
async fn resighting_updates_fields_and_unions_job_links() {
    let store = MockRecordStore::new();
    let mut existing = ad_record("recAdSeed", "111");
    existing.job_ids = vec!["recJobOld".to_string()];
    existing.end_date = NaiveDate::from_ymd_opt(2024, 5, 10);
    existing.impressions = 500;
    store.insert_ad(existing);

    let mut seen = normalized_ad("111", "100", "Acme");
    seen.end_date = NaiveDate::from_ymd_opt(2024, 5, 25).unwrap();
    seen.impressions = 2_500;
    seen.active = false;
    let ads = vec![new_ad(&seen, "recBrand001")];

    let stats = upsert_ads(&store, &ads, "recJobNew", Duration::ZERO).await;

    assert_eq!(stats.created, 0);
    assert_eq!(stats.updated, 1);
    assert_eq!(store.ads().len(), 1);

    let row = store.ad_by_archive_id("111").unwrap();
    assert_eq!(row.end_date, NaiveDate::from_ymd_opt(2024, 5, 25));
    assert_eq!(row.impressions, 2_500);
    assert_eq!(row.status, Some(AdStatus::Inactive));
    assert_eq!(
        row.job_ids,
        vec!["recJobOld".to_string(), "recJobNew".to_string()]
    );
}

#[tokio::test]
async fn resighting_from_same_job_does_not_duplicate_link() {
    let store = MockRecordStore::new();
    let mut existing = ad_record("recAdSeed", "111");
    existing.job_ids = vec!["recJob001".to_string()];
    store.insert_ad(existing);

    let ads = vec![new_ad(&normalized_ad("111", "100", "Acme"), "recBrand001")];
    upsert_ads(&store, &ads, "recJob001", Duration::ZERO).await;

    let row = store.ad_by_archive_id("111").unwrap();
    assert_eq!(row.job_ids, vec!["recJob001".to_string()]);
}

#[tokio::test]
async fn one_bad_record_is_skipped_and_the_rest_land() {
    let store = MockRecordStore::new();
    store.fail_archive_id("222");
    let ads = vec![
        new_ad(&normalized_ad("111", "100", "Acme"), "recBrand001"),
        new_ad(&normalized_ad("222", "100", "Acme"), "recBrand001"),
        new_ad(&normalized_ad("333", "100", "Acme"), "recBrand001"),
    ];

    let stats = upsert_ads(&store, &ads, "recJob001", Duration::ZERO).await;

    assert_eq!(stats.created, 2);
    assert_eq!(stats.skipped, 1);
    assert!(store.ad_by_archive_id("222").is_none());
    assert!(store.ad_by_archive_id("333").is_some());
}

#[tokio::test]
async fn duplicate_archive_id_within_one_run_collapses_to_one_row() {
    let store = MockRecordStore::new();
    let first = normalized_ad("111", "100", "Acme");
    let mut second = normalized_ad("111", "100", "Acme");
    second.end_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let ads = vec![
        new_ad(&first, "recBrand001"),
        new_ad(&second, "recBrand001"),
    ];

    let stats = upsert_ads(&store, &ads, "recJob001", Duration::ZERO).await;

    assert_eq!(stats.created, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(store.ads().len(), 1);
    let row = store.ad_by_archive_id("111").unwrap();
    assert_eq!(row.end_date, NaiveDate::from_ymd_opt(2024, 6, 1));
}

#[tokio::test]
async fn store_trait_object_is_usable() {
    let store = MockRecordStore::new();
    let boxed: &dyn RecordStore = &store;
    let ads = vec![new_ad(&normalized_ad("111", "100", "Acme"), "recBrand001")];

    let stats = upsert_ads(boxed, &ads, "recJob001", Duration::ZERO).await;

    assert_eq!(stats.created, 1);
}
