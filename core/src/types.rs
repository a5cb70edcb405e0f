//! Shared primitive types used across the entire simulator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Industry name as it appears in the benchmark tables (e.g. "보험").
pub type Industry = String;

/// Identifier of one advertising channel/placement, e.g. "네이버_SA".
pub type MediaKey = String;

/// Calendar month, 1..=12.
pub type Month = u32;

/// Unique identifier of one simulation report.
pub type ReportId = String;

/// The three demand/cost metrics every channel is described by.
///
/// `ctr` and `cvr` are ratios in [0, 1]; `cpc` is a currency amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub ctr: f64,
    pub cpc: f64,
    pub cvr: f64,
}

impl Metrics {
    pub fn new(ctr: f64, cpc: f64, cvr: f64) -> Self {
        Self { ctr, cpc, cvr }
    }
}

/// Channel family. Search and display carry different default
/// revenue assumptions and drive the channel-balance insights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaCategory {
    #[serde(rename = "SA")]
    Search,
    #[serde(rename = "DA")]
    Display,
    #[serde(rename = "OTHER")]
    Other,
}

impl MediaCategory {
    /// Infer the category from the `_SA` / `_DA` suffix convention of media keys.
    pub fn from_media_key(media_key: &str) -> Self {
        if media_key.ends_with("_SA") {
            MediaCategory::Search
        } else if media_key.ends_with("_DA") {
            MediaCategory::Display
        } else {
            MediaCategory::Other
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MediaCategory::Search  => "SA",
            MediaCategory::Display => "DA",
            MediaCategory::Other   => "OTHER",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
