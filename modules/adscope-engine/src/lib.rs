pub mod traits;
pub mod upsert;
pub mod workflows;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use traits::{AdAnalyzer, RecordStore, ScrapeProvider, ScrapeRequest};
pub use upsert::{upsert_ads, UpsertStats};
pub use workflows::ad_analysis::{AdAnalysisWorkflow, AnalysisRequest, AnalysisStats};
pub use workflows::ad_fetch::AdFetchWorkflow;
