//! The calculation entry point: one request in, one report out.
//!
//! EXECUTION ORDER (fixed):
//!   1. Request gate: budget, month, share sum. Blocking here rejects the request.
//!      Planner runs derive their budget and skip the user-input budget range.
//!   2. Seasonality factor for (month, industry), memoized.
//!   3. Per media line, in input order: line gate, then calculator.
//!      A failure marks that line uncomputable and the batch moves on.
//!   4. Aggregate summary, scenario summaries, advisories.
//!
//! RULES:
//!   - Reference tables are borrowed, never mutated.
//!   - Rows keep the order of the input allocation.
//!   - The aggregate is always produced, even when no line computed.

use crate::{
    config::ReferenceTables,
    error::{MixError, MixResult},
    grading::{Grade, GradeThresholds},
    performance::{Calculator, OutcomeInputs, ScenarioResult},
    planner::CampaignGoal,
    scenario::{self, ScenarioKind, ScenarioSpread, ScenarioSummary},
    seasonality::SeasonalityCache,
    types::{Industry, MediaCategory, MediaKey, Month, ReportId},
    validation::{self, Field, Verdict},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationLine {
    pub media_key: MediaKey,
    /// Percent of the total budget.
    pub share: f64,
    #[serde(flatten)]
    pub inputs: OutcomeInputs,
}

impl AllocationLine {
    pub fn new(media_key: impl Into<MediaKey>, share: f64) -> Self {
        Self {
            media_key: media_key.into(),
            share,
            inputs: OutcomeInputs::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationRequest {
    pub industry: Industry,
    pub month: Month,
    pub total_budget: f64,
    pub allocation: Vec<AllocationLine>,
    #[serde(default)]
    pub goal: Option<CampaignGoal>,
}

/// One row of a report: either a computed result or the reason it is missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MediaOutcome {
    Computed(ScenarioResult),
    Uncomputable {
        media_key: MediaKey,
        display_name: String,
        category: MediaCategory,
        share: f64,
        budget: f64,
        reason: String,
    },
}

impl MediaOutcome {
    pub fn media_key(&self) -> &str {
        match self {
            MediaOutcome::Computed(r) => &r.media_key,
            MediaOutcome::Uncomputable { media_key, .. } => media_key,
        }
    }

    pub fn share(&self) -> f64 {
        match self {
            MediaOutcome::Computed(r) => r.share,
            MediaOutcome::Uncomputable { share, .. } => *share,
        }
    }

    pub fn category(&self) -> MediaCategory {
        match self {
            MediaOutcome::Computed(r) => r.category,
            MediaOutcome::Uncomputable { category, .. } => *category,
        }
    }

    pub fn result(&self) -> Option<&ScenarioResult> {
        match self {
            MediaOutcome::Computed(r) => Some(r),
            MediaOutcome::Uncomputable { .. } => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        self.result().is_some()
    }
}

/// Non-blocking message raised while gating the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Advisory {
    pub field: Field,
    pub media_key: Option<MediaKey>,
    pub message: String,
}

/// Totals over the computed rows. Uncomputable rows contribute nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub computed_media: usize,
    pub uncomputable_media: usize,
    pub total_spend: f64,
    pub total_impressions: f64,
    pub total_clicks: f64,
    /// Forecast-adjusted conversions.
    pub total_conversions: f64,
    pub total_revenue: f64,
    pub blended_ctr: f64,
    pub blended_cvr: f64,
    pub blended_cpa: Option<f64>,
    /// Percent.
    pub blended_roas: f64,
    pub grade: Grade,
}

impl Summary {
    pub fn from_outcomes(rows: &[MediaOutcome], thresholds: &GradeThresholds) -> Self {
        let computed: Vec<&ScenarioResult> = rows.iter().filter_map(MediaOutcome::result).collect();

        let total_spend: f64 = computed.iter().map(|r| r.spend).sum();
        let total_impressions: f64 = computed.iter().map(|r| r.impressions).sum();
        let total_clicks: f64 = computed.iter().map(|r| r.clicks).sum();
        let total_conversions: f64 = computed.iter().map(|r| r.adjusted_conversions).sum();
        let total_revenue: f64 = computed.iter().map(|r| r.revenue).sum();

        let blended_ctr = if total_impressions > 0.0 { total_clicks / total_impressions } else { 0.0 };
        let blended_cvr = if total_clicks > 0.0 { total_conversions / total_clicks } else { 0.0 };
        let blended_cpa = if total_conversions > 0.0 { Some(total_spend / total_conversions) } else { None };
        let blended_roas = if total_spend > 0.0 { total_revenue / total_spend * 100.0 } else { 0.0 };

        Self {
            computed_media: computed.len(),
            uncomputable_media: rows.len() - computed.len(),
            total_spend,
            total_impressions,
            total_clicks,
            total_conversions,
            total_revenue,
            blended_ctr,
            blended_cvr,
            blended_cpa,
            blended_roas,
            grade: thresholds.grade_optional(blended_cpa, blended_roas, total_conversions),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub report_id: ReportId,
    pub generated_at: DateTime<Utc>,
    pub request: SimulationRequest,
    pub season_factor: f64,
    pub rows: Vec<MediaOutcome>,
    pub summary: Summary,
    pub scenarios: Vec<ScenarioSummary>,
    pub advisories: Vec<Advisory>,
    pub spread: ScenarioSpread,
    pub thresholds: GradeThresholds,
}

impl SimulationReport {
    /// Rows of one scenario, projected from the base rows.
    pub fn scenario_rows(&self, kind: ScenarioKind) -> Vec<MediaOutcome> {
        scenario::project(&self.rows, kind, &self.spread, &self.thresholds)
    }

    pub fn scenario(&self, kind: ScenarioKind) -> Option<&ScenarioSummary> {
        self.scenarios.iter().find(|s| s.kind == kind)
    }
}

pub struct Simulator<'a> {
    tables:      &'a ReferenceTables,
    seasonality: SeasonalityCache,
}

impl<'a> Simulator<'a> {
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self {
            tables,
            seasonality: SeasonalityCache::new(),
        }
    }

    pub fn tables(&self) -> &'a ReferenceTables {
        self.tables
    }

    /// Run one request. Errors only for request-level blocking verdicts.
    pub fn run(&mut self, request: &SimulationRequest) -> MixResult<SimulationReport> {
        let industry = Some(request.industry.as_str());
        validation::validate(self.tables, Field::Budget, request.total_budget, industry)
            .into_result(Field::Budget)?;
        self.execute(request)
    }

    /// Run a request whose budget was derived rather than typed in. Only a
    /// positive finite budget is required; month and share gates still apply.
    pub fn run_derived(&mut self, request: &SimulationRequest) -> MixResult<SimulationReport> {
        if !(request.total_budget.is_finite() && request.total_budget > 0.0) {
            return Err(MixError::Validation {
                field: Field::Budget.name().into(),
                reason: format!("derived budget must be greater than 0, got {}", request.total_budget),
            });
        }
        self.execute(request)
    }

    fn execute(&mut self, request: &SimulationRequest) -> MixResult<SimulationReport> {
        self.gate_request(request)?;

        let industry = request.industry.as_str();
        if !self.tables.available_industries().contains(&industry) {
            log::warn!("simulate: industry '{industry}' has no reference data");
        }

        let season_factor = self.seasonality.resolve(self.tables, request.month, industry);
        let calculator = Calculator::new(self.tables);
        let mut advisories = Vec::new();

        let rows: Vec<MediaOutcome> = request
            .allocation
            .iter()
            .map(|line| {
                self.compute_line(&calculator, request, line, season_factor, &mut advisories)
            })
            .collect();

        let settings = self.tables.settings();
        let summary = Summary::from_outcomes(&rows, &settings.grade_thresholds);
        let scenarios = ScenarioKind::ALL
            .iter()
            .map(|kind| {
                scenario::summarize(&rows, *kind, &settings.scenario_spread, &settings.grade_thresholds)
            })
            .collect();

        log::info!(
            "simulate: industry={industry} month={} budget={:.0} media={} failed={} conversions={:.1} grade={}",
            request.month,
            request.total_budget,
            summary.computed_media,
            summary.uncomputable_media,
            summary.total_conversions,
            summary.grade,
        );

        Ok(SimulationReport {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            request: request.clone(),
            season_factor,
            rows,
            summary,
            scenarios,
            advisories,
            spread: settings.scenario_spread,
            thresholds: settings.grade_thresholds,
        })
    }

    fn gate_request(&self, request: &SimulationRequest) -> MixResult<()> {
        let industry = Some(request.industry.as_str());
        validation::validate(self.tables, Field::Month, f64::from(request.month), industry)
            .into_result(Field::Month)?;

        if request.allocation.is_empty() {
            return Err(MixError::Validation {
                field: "allocation".into(),
                reason: "at least one media line is required".into(),
            });
        }

        let total_share: f64 = request.allocation.iter().map(|l| l.share).sum();
        let tolerance = self.tables.settings().allocation_tolerance;
        if !total_share.is_finite() || (total_share - 100.0).abs() > tolerance {
            return Err(MixError::Validation {
                field: "allocation".into(),
                reason: format!("budget shares must sum to 100 (±{tolerance}), got {total_share:.2}"),
            });
        }
        Ok(())
    }

    fn compute_line(
        &self,
        calculator: &Calculator<'_>,
        request: &SimulationRequest,
        line: &AllocationLine,
        season_factor: f64,
        advisories: &mut Vec<Advisory>,
    ) -> MediaOutcome {
        let industry = request.industry.as_str();
        let budget = request.total_budget * line.share / 100.0;

        let uncomputable = |reason: String| {
            log::warn!("simulate: {} uncomputable: {reason}", line.media_key);
            MediaOutcome::Uncomputable {
                media_key: line.media_key.clone(),
                display_name: self.tables.catalog().display_name(&line.media_key).to_string(),
                category: self.tables.catalog().category_of(&line.media_key),
                share: line.share,
                budget,
                reason,
            }
        };

        let mut checks = vec![(Field::Ratio, line.share), (Field::Adjustment, line.inputs.forecast_adjustment)];
        if let Some(revenue) = line.inputs.revenue_per_conversion {
            checks.push((Field::Revenue, revenue));
        }
        for (field, value) in checks {
            if let Verdict::Blocking(reason) = validation::validate(self.tables, field, value, Some(industry)) {
                return uncomputable(format!("invalid {field}: {reason}"));
            }
        }

        let result = match calculator.compute_at(industry, &line.media_key, budget, season_factor, &line.inputs) {
            Ok(r) => r.with_share(line.share),
            Err(e) => return uncomputable(e.to_string()),
        };

        // Effective ratios are checked against the industry's typical ranges
        // in the percent units users see.
        for (field, value) in [(Field::Ctr, result.ctr * 100.0), (Field::Cvr, result.cvr * 100.0)] {
            if let Verdict::Advisory(message) = validation::validate(self.tables, field, value, Some(industry)) {
                advisories.push(Advisory {
                    field,
                    media_key: Some(line.media_key.clone()),
                    message,
                });
            }
        }

        MediaOutcome::Computed(result)
    }
}
