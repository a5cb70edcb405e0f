//! Conservative / base / aggressive projections of a computed batch.
//!
//! Only the forecast-adjusted conversion volume moves between scenarios;
//! spend, clicks and impressions are identical. CPA, revenue, ROAS and the
//! grade are recomputed from the scaled volume.

use crate::{
    grading::{Grade, GradeThresholds},
    performance::per_conversion,
    simulation::{MediaOutcome, Summary},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Conservative,
    Base,
    Aggressive,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Conservative,
        ScenarioKind::Base,
        ScenarioKind::Aggressive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioKind::Conservative => "conservative",
            ScenarioKind::Base         => "base",
            ScenarioKind::Aggressive   => "aggressive",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percent swing applied to conversions in the outer scenarios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioSpread {
    pub conservative_pct: f64,
    pub aggressive_pct: f64,
}

impl Default for ScenarioSpread {
    fn default() -> Self {
        Self { conservative_pct: 5.0, aggressive_pct: 10.0 }
    }
}

impl ScenarioSpread {
    pub fn multiplier(&self, kind: ScenarioKind) -> f64 {
        match kind {
            ScenarioKind::Conservative => 1.0 - self.conservative_pct / 100.0,
            ScenarioKind::Base         => 1.0,
            ScenarioKind::Aggressive   => 1.0 + self.aggressive_pct / 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioSummary {
    pub kind: ScenarioKind,
    pub total_conversions: f64,
    pub total_clicks: f64,
    pub avg_cpa: Option<f64>,
    pub total_revenue: f64,
    /// Percent.
    pub avg_roas: f64,
    pub grade: Grade,
}

pub fn project(
    rows: &[MediaOutcome],
    kind: ScenarioKind,
    spread: &ScenarioSpread,
    thresholds: &GradeThresholds,
) -> Vec<MediaOutcome> {
    let multiplier = spread.multiplier(kind).max(0.0);
    rows.iter()
        .map(|row| match row {
            MediaOutcome::Computed(r) if kind != ScenarioKind::Base => {
                let mut r = r.clone();
                r.adjusted_conversions *= multiplier;
                r.adjusted_cpa = per_conversion(r.budget, r.adjusted_conversions);
                r.revenue = r.adjusted_conversions * r.revenue_per_conversion;
                r.roas = if r.budget > 0.0 { r.revenue / r.budget * 100.0 } else { 0.0 };
                r.grade = thresholds.grade_optional(r.adjusted_cpa, r.roas, r.adjusted_conversions);
                MediaOutcome::Computed(r)
            }
            other => other.clone(),
        })
        .collect()
}

pub fn summarize(
    rows: &[MediaOutcome],
    kind: ScenarioKind,
    spread: &ScenarioSpread,
    thresholds: &GradeThresholds,
) -> ScenarioSummary {
    let projected = project(rows, kind, spread, thresholds);
    let summary = Summary::from_outcomes(&projected, thresholds);
    ScenarioSummary {
        kind,
        total_conversions: summary.total_conversions,
        total_clicks: summary.total_clicks,
        avg_cpa: summary.blended_cpa,
        total_revenue: summary.total_revenue,
        avg_roas: summary.blended_roas,
        grade: summary.grade,
    }
}
