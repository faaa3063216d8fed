//! Normalization of duck-typed Ad Library records into one canonical shape.
//!
//! Raw provider objects use inconsistent key names and field types across
//! actor versions. Everything downstream works with [`NormalizedAd`] only.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;

use crate::types::{Platforms, RawAd};

/// Creative format inferred from which media fields are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdFormat {
    Video,
    Image,
    Carousel,
    Text,
}

/// A canonical ad creative, platform-agnostic field names, one spelling each.
#[derive(Debug, Clone)]
pub struct NormalizedAd {
    pub ad_id: String,
    /// Stable provider identifier for this creative; the dedup key.
    pub archive_id: String,
    pub page_id: String,
    pub page_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub platform: String,
    pub format: AdFormat,
    pub permalink_url: String,
    pub media_url: String,
    pub thumbnail_url: String,
    pub ad_copy: String,
    /// Lower bound of whatever range the provider reported.
    pub impressions: u64,
    pub active: bool,
}

impl RawAd {
    /// Collapse this raw record into the canonical shape. `today` is the
    /// fallback for missing or unparseable dates.
    pub fn normalize(&self, today: NaiveDate) -> NormalizedAd {
        NormalizedAd {
            ad_id: self.ad_id().to_string(),
            archive_id: self.archive_id().to_string(),
            page_id: self.page_id().to_string(),
            page_name: self.page_name().to_string(),
            start_date: parse_date(self.start_date(), today),
            end_date: parse_date(self.end_date(), today),
            platform: self.platform(),
            format: self.infer_format(),
            permalink_url: self.permalink().to_string(),
            media_url: self.media_url().to_string(),
            thumbnail_url: self.thumbnail_url().to_string(),
            ad_copy: self.ad_copy().to_string(),
            impressions: parse_impressions(self.impressions.as_ref()),
            active: self.is_active.unwrap_or(true),
        }
    }

    fn platform(&self) -> String {
        match &self.publisher_platforms {
            Some(Platforms::One(p)) if !p.is_empty() => p.clone(),
            Some(Platforms::Many(list)) => list
                .first()
                .cloned()
                .unwrap_or_else(|| "Facebook".to_string()),
            _ => "Facebook".to_string(),
        }
    }

    /// Video beats everything; more than one still image means carousel;
    /// exactly one means image; no media at all means a text-only ad.
    fn infer_format(&self) -> AdFormat {
        if self.video_url.is_some() || self.video_hd_url.is_some() || self.video_sd_url.is_some() {
            return AdFormat::Video;
        }

        let images = match (&self.carousel_images, &self.images) {
            (Some(carousel), _) if !carousel.is_empty() => carousel,
            (_, Some(images)) => images,
            _ => {
                return if self.image_url.is_some() {
                    AdFormat::Image
                } else {
                    AdFormat::Text
                }
            }
        };

        match images.len() {
            0 => {
                if self.image_url.is_some() {
                    AdFormat::Image
                } else {
                    AdFormat::Text
                }
            }
            1 => AdFormat::Image,
            _ => AdFormat::Carousel,
        }
    }

    /// Primary media URL precedence: HD video > video > SD video > first
    /// image > single image URL > none.
    fn media_url(&self) -> &str {
        if let Some(url) = self.video_hd_url.as_deref() {
            return url;
        }
        if let Some(url) = self.video_url.as_deref() {
            return url;
        }
        if let Some(url) = self.video_sd_url.as_deref() {
            return url;
        }
        if let Some(first) = self.images.as_ref().and_then(|i| i.first()) {
            return first;
        }
        self.image_url.as_deref().unwrap_or_default()
    }

    fn thumbnail_url(&self) -> &str {
        if let Some(url) = self.video_preview_image_url.as_deref() {
            return url;
        }
        if let Some(first) = self.images.as_ref().and_then(|i| i.first()) {
            return first;
        }
        self.image_url.as_deref().unwrap_or_default()
    }
}

/// Parse an impressions value that may be a plain integer or a textual
/// range like "1,000-5,000". Ranges resolve to their lower bound;
/// anything unparseable resolves to 0.
pub fn parse_impressions(value: Option<&serde_json::Value>) -> u64 {
    let Some(value) = value else { return 0 };

    if let Some(n) = value.as_u64() {
        return n;
    }
    if let Some(f) = value.as_f64() {
        return if f > 0.0 { f as u64 } else { 0 };
    }

    let Some(text) = value.as_str() else { return 0 };
    let leading: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();
    leading.parse().unwrap_or(0)
}

fn parse_date(raw: Option<&str>, fallback: NaiveDate) -> NaiveDate {
    let Some(raw) = raw else { return fallback };
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive();
    }
    fallback
}

static PAGE_ID_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"facebook\.com/pages/(\d+)").expect("valid regex"),
        Regex::new(r"facebook\.com/profile\.php\?id=(\d+)").expect("valid regex"),
        Regex::new(r"facebook\.com/(\d+)").expect("valid regex"),
    ]
});

/// Extract the numeric page id from the Facebook page URL patterns the
/// Ad Library links use. Returns an empty string when none match.
pub fn extract_page_id_from_url(url: &str) -> String {
    for re in PAGE_ID_RES.iter() {
        if let Some(caps) = re.captures(url) {
            return caps[1].to_string();
        }
    }

    String::new()
}
