pub mod ad_analysis;
pub mod ad_fetch;
