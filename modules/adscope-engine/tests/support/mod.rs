use adscope_common::types::{AdStatus, NewAd};
use adscope_engine::traits::display_format_from;
use apify_client::NormalizedAd;

pub fn new_ad(ad: &NormalizedAd, brand_id: &str) -> NewAd {
    NewAd {
        ad_id: ad.ad_id.clone(),
        archive_id: ad.archive_id.clone(),
        page_id: ad.page_id.clone(),
        page_name: ad.page_name.clone(),
        start_date: ad.start_date,
        end_date: ad.end_date,
        platform: ad.platform.clone(),
        display_format: display_format_from(ad.format),
        permalink_url: ad.permalink_url.clone(),
        media_url: ad.media_url.clone(),
        thumbnail_url: ad.thumbnail_url.clone(),
        ad_copy: ad.ad_copy.clone(),
        impressions: ad.impressions,
        status: if ad.active {
            AdStatus::Active
        } else {
            AdStatus::Inactive
        },
        brand_id: brand_id.to_string(),
    }
}
