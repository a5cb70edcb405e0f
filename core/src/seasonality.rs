//! Seasonality resolver.
//!
//! factor = common monthly coefficient
//!        × industry high-season multiplier (if the month is a high month)
//!        × industry low-season multiplier  (else, if it is a low month)
//!
//! The factor scales demand-side metrics (CTR, CVR) only. CPC is a cost
//! lookup and is never seasonally adjusted.

use crate::{config::ReferenceTables, types::Month};
use std::collections::HashMap;

/// Pure function of (month, industry) over immutable tables.
/// Months outside 1..=12 fall back to a common coefficient of 1.0;
/// callers validate the month before it gets here.
pub fn resolve(tables: &ReferenceTables, month: Month, industry: &str) -> f64 {
    let mut factor = tables.common_coefficient(month);

    if let Some(weight) = tables.season_weight(industry) {
        if weight.high_months.contains(&month) {
            factor *= weight.high_multiplier;
        } else if weight.low_months.contains(&month) {
            factor *= weight.low_multiplier;
        }
    }

    factor
}

/// Memoizing wrapper around [`resolve`]. Safe to keep for the whole
/// process lifetime because the tables never change after load.
#[derive(Debug, Default)]
pub struct SeasonalityCache {
    factors: HashMap<(Month, String), f64>,
}

impl SeasonalityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, tables: &ReferenceTables, month: Month, industry: &str) -> f64 {
        if let Some(factor) = self.factors.get(&(month, industry.to_string())) {
            return *factor;
        }
        let factor = resolve(tables, month, industry);
        log::debug!("seasonality: month={month} industry={industry} factor={factor:.4}");
        self.factors.insert((month, industry.to_string()), factor);
        factor
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}
