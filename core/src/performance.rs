//! Media performance calculator.
//!
//! Resolution order for the unadjusted base of one (industry, media):
//!   1. benchmark override for the pair, if present;
//!   2. otherwise industry base metrics × media multiplier.
//!
//! Then the seasonality factor scales CTR and CVR, the budget competition
//! factor scales CPC, and volumes are derived from the media budget.
//! A failure here is scoped to one media key; the batch runner turns it
//! into an uncomputable row.

use crate::{
    config::ReferenceTables,
    error::{MixError, MixResult},
    grading::Grade,
    seasonality,
    types::{MediaCategory, MediaKey, Metrics, Month},
};
use serde::{Deserialize, Serialize};

/// Where the unadjusted base metrics of a row came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricSource {
    Override,
    Derived,
}

/// Per-media business assumptions layered on top of the volume model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct OutcomeInputs {
    /// Falls back to the category default from the settings.
    #[serde(default)]
    pub revenue_per_conversion: Option<f64>,
    /// Forecast bias in percent, applied to conversions.
    #[serde(default)]
    pub forecast_adjustment: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioResult {
    pub media_key: MediaKey,
    pub display_name: String,
    pub category: MediaCategory,
    /// Share of the total budget, in percent.
    pub share: f64,
    pub budget: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub cvr: f64,
    pub season_factor: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    /// Conversions after the forecast adjustment.
    pub adjusted_conversions: f64,
    pub spend: f64,
    pub cpm: f64,
    /// Budget per raw conversion; undefined without conversions.
    pub cpa: Option<f64>,
    pub adjusted_cpa: Option<f64>,
    pub revenue_per_conversion: f64,
    pub revenue: f64,
    /// Percent.
    pub roas: f64,
    pub grade: Grade,
    pub source: MetricSource,
}

impl ScenarioResult {
    pub fn with_share(mut self, share: f64) -> Self {
        self.share = share;
        self
    }
}

pub struct Calculator<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> Calculator<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    /// Unadjusted base metrics and their source.
    pub fn base_metrics(&self, industry: &str, media_key: &str) -> MixResult<(Metrics, MetricSource)> {
        if let Some(benchmark) = self.tables.benchmark_override(industry, media_key) {
            return Ok((benchmark.metrics(), MetricSource::Override));
        }
        let base = self.tables.base_metrics(industry).ok_or_else(|| {
            MixError::computation(media_key, format!("no base metrics for industry '{industry}'"))
        })?;
        let multiplier = self.tables.media_multiplier(media_key);
        Ok((multiplier.apply(base), MetricSource::Derived))
    }

    /// Base metrics with seasonality (CTR, CVR) and competition (CPC) applied,
    /// ratios clamped into [0, 1].
    pub fn effective_metrics(
        &self,
        industry: &str,
        media_key: &str,
        budget: f64,
        season_factor: f64,
    ) -> MixResult<(Metrics, MetricSource)> {
        let (base, source) = self.base_metrics(industry, media_key)?;
        let competition = self.tables.settings().competition_factor(budget);

        let effective = Metrics {
            ctr: clamp_ratio(media_key, "CTR", base.ctr * season_factor),
            cpc: base.cpc * competition,
            cvr: clamp_ratio(media_key, "CVR", base.cvr * season_factor),
        };
        Ok((effective, source))
    }

    pub fn compute(
        &self,
        industry: &str,
        media_key: &str,
        budget: f64,
        month: Month,
    ) -> MixResult<ScenarioResult> {
        self.compute_with(industry, media_key, budget, month, &OutcomeInputs::default())
    }

    pub fn compute_with(
        &self,
        industry: &str,
        media_key: &str,
        budget: f64,
        month: Month,
        inputs: &OutcomeInputs,
    ) -> MixResult<ScenarioResult> {
        let season_factor = seasonality::resolve(self.tables, month, industry);
        self.compute_at(industry, media_key, budget, season_factor, inputs)
    }

    /// Core computation with an already-resolved seasonality factor.
    pub fn compute_at(
        &self,
        industry: &str,
        media_key: &str,
        budget: f64,
        season_factor: f64,
        inputs: &OutcomeInputs,
    ) -> MixResult<ScenarioResult> {
        if !(budget.is_finite() && budget >= 0.0) {
            return Err(MixError::computation(
                media_key,
                format!("budget must be a non-negative number, got {budget}"),
            ));
        }
        if !inputs.forecast_adjustment.is_finite() {
            return Err(MixError::computation(media_key, "forecast adjustment is not a number"));
        }

        let (metrics, source) = self.effective_metrics(industry, media_key, budget, season_factor)?;

        if !(metrics.cpc.is_finite() && metrics.cpc > 0.0) {
            return Err(MixError::computation(
                media_key,
                format!("CPC must be greater than 0, got {}", metrics.cpc),
            ));
        }
        if metrics.ctr <= 0.0 {
            return Err(MixError::computation(
                media_key,
                format!("CTR must be greater than 0, got {}", metrics.ctr),
            ));
        }

        let category = self.tables.catalog().category_of(media_key);
        let revenue_per_conversion = inputs.revenue_per_conversion.unwrap_or_else(|| {
            self.tables.settings().revenue_per_conversion.for_category(category)
        });
        if !(revenue_per_conversion.is_finite() && revenue_per_conversion >= 0.0) {
            return Err(MixError::computation(
                media_key,
                format!("revenue per conversion must be non-negative, got {revenue_per_conversion}"),
            ));
        }

        let clicks = budget / metrics.cpc;
        let impressions = clicks / metrics.ctr;
        let conversions = clicks * metrics.cvr;
        let adjusted_conversions = (conversions * (1.0 + inputs.forecast_adjustment / 100.0)).max(0.0);

        let cpa = per_conversion(budget, conversions);
        let adjusted_cpa = per_conversion(budget, adjusted_conversions);
        let cpm = if impressions > 0.0 { budget / impressions * 1000.0 } else { 0.0 };
        let revenue = adjusted_conversions * revenue_per_conversion;
        let roas = if budget > 0.0 { revenue / budget * 100.0 } else { 0.0 };

        let grade = self
            .tables
            .settings()
            .grade_thresholds
            .grade_optional(adjusted_cpa, roas, adjusted_conversions);

        log::debug!(
            "performance: {media_key} budget={budget:.0} ctr={:.5} cpc={:.1} cvr={:.5} conversions={conversions:.2} grade={grade}",
            metrics.ctr, metrics.cpc, metrics.cvr,
        );

        Ok(ScenarioResult {
            media_key: media_key.to_string(),
            display_name: self.tables.catalog().display_name(media_key).to_string(),
            category,
            share: 100.0,
            budget,
            ctr: metrics.ctr,
            cpc: metrics.cpc,
            cvr: metrics.cvr,
            season_factor,
            impressions,
            clicks,
            conversions,
            adjusted_conversions,
            spend: budget,
            cpm,
            cpa,
            adjusted_cpa,
            revenue_per_conversion,
            revenue,
            roas,
            grade,
            source,
        })
    }
}

pub(crate) fn per_conversion(budget: f64, conversions: f64) -> Option<f64> {
    if conversions > 0.0 {
        Some(budget / conversions)
    } else {
        None
    }
}

fn clamp_ratio(media_key: &str, metric: &str, value: f64) -> f64 {
    if value.is_nan() {
        log::warn!("performance: {media_key} {metric} is NaN, treating as 0");
        return 0.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        log::warn!("performance: {media_key} {metric} {value} clamped to {clamped}");
    }
    clamped
}
