//! Rule-based recommendations over a finished report.
//!
//! RULE: Every rule implements InsightRule. The engine evaluates rules in
//! registration order and concatenates their output, so the insight list of
//! a report is stable across runs.
//!
//! REGISTRATION ORDER (fixed):
//!   1. budget_shift         worst-to-best CPA reallocation
//!   2. underweight_winner   efficient media below 20% share
//!   3. concentration        single media above the risk threshold
//!   4. low_roas             media ROAS under 150%
//!   5. low_volume           fewer than 200 conversions in total
//!   6. conversion_volume    volume level of the whole mix
//!   7. industry_cpa         blended CPA against the industry average
//!   8. channel_balance      search vs display imbalance
//!   9. seasonal_timing      peak / off-season month
//!  10. goal_alignment       conversion goal with a thin search share
//!  11. profitability        blended ROAS level

use crate::{
    config::ReferenceTables,
    performance::ScenarioResult,
    planner::CampaignGoal,
    simulation::{MediaOutcome, SimulationReport},
    types::MediaCategory,
};
use serde::{Deserialize, Serialize};

const SHIFT_TRIGGER_RATIO: f64 = 1.5;
const SHIFT_FRACTION: f64 = 0.1;
const UNDERWEIGHT_SHARE: f64 = 20.0;
const UNDERWEIGHT_INCREASE_PCT: f64 = 10.0;
const LOW_ROAS: f64 = 150.0;
const LOW_VOLUME: f64 = 200.0;
const VOLUME_INCREASE: f64 = 1.3;
const HIGH_VOLUME: f64 = 1000.0;
const MIN_SIGNIFICANT_VOLUME: f64 = 100.0;
const CPA_GOOD_RATIO: f64 = 0.8;
const CPA_POOR_RATIO: f64 = 1.3;
const PEAK_COEFFICIENT: f64 = 1.15;
const OFF_SEASON_COEFFICIENT: f64 = 0.85;
const CONVERSION_GOAL_MIN_SEARCH: f64 = 60.0;
const HIGH_ROAS: f64 = 200.0;
const BREAK_EVEN_ROAS: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub rule: String,
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
}

/// Read-only view handed to every rule.
pub struct InsightContext<'a> {
    pub report: &'a SimulationReport,
    pub tables: &'a ReferenceTables,
}

impl<'a> InsightContext<'a> {
    pub fn total_budget(&self) -> f64 {
        self.report.request.total_budget
    }

    pub fn computed(&self) -> impl Iterator<Item = &'a ScenarioResult> {
        self.report.rows.iter().filter_map(MediaOutcome::result)
    }

    /// Computed rows with a defined CPA, cheapest first.
    pub fn by_cpa(&self) -> Vec<(&'a ScenarioResult, f64)> {
        let mut ranked: Vec<_> = self
            .computed()
            .filter_map(|r| r.adjusted_cpa.filter(|cpa| *cpa > 0.0).map(|cpa| (r, cpa)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }

    /// Sum of allocation shares for one category.
    pub fn category_share(&self, category: MediaCategory) -> f64 {
        self.report
            .rows
            .iter()
            .filter(|row| row.category() == category)
            .map(MediaOutcome::share)
            .sum()
    }

    fn insight(&self, rule: &dyn InsightRule, kind: InsightKind, title: &str, message: String) -> Insight {
        Insight {
            rule: rule.name().to_string(),
            kind,
            title: title.to_string(),
            message,
        }
    }
}

/// The contract every recommendation rule fulfills.
pub trait InsightRule: Send {
    /// Unique stable name for this rule.
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight>;
}

pub struct InsightEngine {
    rules: Vec<Box<dyn InsightRule>>,
}

impl InsightEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Engine with every built-in rule registered in the documented order.
    pub fn build() -> Self {
        let mut engine = InsightEngine::new();
        engine.register(Box::new(BudgetShift));
        engine.register(Box::new(UnderweightWinner));
        engine.register(Box::new(Concentration));
        engine.register(Box::new(LowRoas));
        engine.register(Box::new(LowVolume));
        engine.register(Box::new(ConversionVolume));
        engine.register(Box::new(IndustryCpa));
        engine.register(Box::new(ChannelBalance));
        engine.register(Box::new(SeasonalTiming));
        engine.register(Box::new(GoalAlignment));
        engine.register(Box::new(Profitability));
        engine
    }

    pub fn register(&mut self, rule: Box<dyn InsightRule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn evaluate(&self, report: &SimulationReport, tables: &ReferenceTables) -> Vec<Insight> {
        let ctx = InsightContext { report, tables };
        let insights: Vec<Insight> = self.rules.iter().flat_map(|rule| rule.evaluate(&ctx)).collect();
        log::debug!("insights: report={} produced {}", report.report_id, insights.len());
        insights
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::build()
    }
}

// ── Media-level recommendations ────────────────────────────────────

pub struct BudgetShift;

impl InsightRule for BudgetShift {
    fn name(&self) -> &'static str { "budget_shift" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let ranked = ctx.by_cpa();
        let (Some((best, best_cpa)), Some((worst, worst_cpa))) = (ranked.first(), ranked.last()) else {
            return vec![];
        };
        if ranked.len() < 2 || *worst_cpa <= best_cpa * SHIFT_TRIGGER_RATIO {
            return vec![];
        }
        if !(best.cpc > 0.0 && best.cvr > 0.0) {
            return vec![];
        }

        let budget = ctx.total_budget();
        let shift_share = worst.share * SHIFT_FRACTION;
        let shift_budget = budget * shift_share / 100.0;
        let extra_conversions = shift_budget / best.cpc * best.cvr;

        let current = ctx.report.summary.total_conversions;
        let current_cpa = if current > 0.0 { budget / current } else { 0.0 };
        let shifted = current + extra_conversions;
        let shifted_cpa = if shifted > 0.0 { budget / shifted } else { 0.0 };

        vec![ctx.insight(
            self,
            InsightKind::Info,
            "Budget shift",
            format!(
                "Moving {worst_name} from {ws:.1}% to {wn:.1}% and {best_name} from {bs:.1}% to {bn:.1}% \
                 adds about {extra_conversions:.0} conversions and lowers average CPA by {gain}.",
                worst_name = worst.display_name,
                ws = worst.share,
                wn = worst.share - shift_share,
                best_name = best.display_name,
                bs = best.share,
                bn = best.share + shift_share,
                gain = format_amount(current_cpa - shifted_cpa),
            ),
        )]
    }
}

pub struct UnderweightWinner;

impl InsightRule for UnderweightWinner {
    fn name(&self) -> &'static str { "underweight_winner" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let extra_budget = ctx.total_budget() * UNDERWEIGHT_INCREASE_PCT / 100.0;
        ctx.by_cpa()
            .into_iter()
            .take(2)
            .filter(|(r, _)| r.share < UNDERWEIGHT_SHARE && r.cpc > 0.0 && r.cvr > 0.0)
            .map(|(r, cpa)| {
                let extra_conversions = extra_budget / r.cpc * r.cvr;
                let marginal_cpa = if extra_conversions > 0.0 { extra_budget / extra_conversions } else { 0.0 };
                ctx.insight(
                    self,
                    InsightKind::Info,
                    "Scale an efficient channel",
                    format!(
                        "{} (CPA {}) at {:.1}% share: raising it to {:.1}% adds about {extra_conversions:.0} \
                         conversions at a CPA near {}.",
                        r.display_name,
                        format_amount(cpa),
                        r.share,
                        r.share + UNDERWEIGHT_INCREASE_PCT,
                        format_amount(marginal_cpa),
                    ),
                )
            })
            .collect()
    }
}

pub struct Concentration;

impl InsightRule for Concentration {
    fn name(&self) -> &'static str { "concentration" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let threshold = ctx.tables.settings().risk_ratio_threshold;
        ctx.report
            .rows
            .iter()
            .filter(|row| row.share() > threshold)
            .map(|row| {
                let name = ctx.tables.catalog().display_name(row.media_key());
                ctx.insight(
                    self,
                    InsightKind::Warning,
                    "Concentration risk",
                    format!(
                        "{name} holds {:.1}% of the budget. A policy or algorithm change on that channel \
                         would hit the whole plan; spread spend across other media.",
                        row.share(),
                    ),
                )
            })
            .collect()
    }
}

pub struct LowRoas;

impl InsightRule for LowRoas {
    fn name(&self) -> &'static str { "low_roas" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        ctx.computed()
            .filter(|r| r.roas > 0.0 && r.roas < LOW_ROAS)
            .map(|r| {
                let cpa = r.adjusted_cpa.unwrap_or(0.0);
                let needed = cpa * LOW_ROAS / 100.0;
                ctx.insight(
                    self,
                    InsightKind::Warning,
                    "Low ROAS",
                    format!(
                        "{} returns {:.1}% ROAS. Raising revenue per conversion from {} to {} (+{}) reaches 150%.",
                        r.display_name,
                        r.roas,
                        format_amount(r.revenue_per_conversion),
                        format_amount(needed),
                        format_amount(needed - r.revenue_per_conversion),
                    ),
                )
            })
            .collect()
    }
}

pub struct LowVolume;

impl InsightRule for LowVolume {
    fn name(&self) -> &'static str { "low_volume" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let total = ctx.report.summary.total_conversions;
        if !(total > 0.0 && total < LOW_VOLUME) {
            return vec![];
        }
        let budget = ctx.total_budget();
        let raised = budget * VOLUME_INCREASE;
        vec![ctx.insight(
            self,
            InsightKind::Info,
            "Increase budget",
            format!(
                "Expected conversions ({total:.0}) are thin. A 30% budget increase from {} to {} (+{}) \
                 lifts them to about {:.0}.",
                format_amount(budget),
                format_amount(raised),
                format_amount(raised - budget),
                total * VOLUME_INCREASE,
            ),
        )]
    }
}

// ── Mix-level insights ─────────────────────────────────────────────

pub struct ConversionVolume;

impl InsightRule for ConversionVolume {
    fn name(&self) -> &'static str { "conversion_volume" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let total = ctx.report.summary.total_conversions;
        if total >= HIGH_VOLUME {
            vec![ctx.insight(
                self,
                InsightKind::Success,
                "Strong conversion volume",
                format!("Expected conversions ({}) are high enough for stable optimization.", format_amount(total)),
            )]
        } else if total < MIN_SIGNIFICANT_VOLUME {
            vec![ctx.insight(
                self,
                InsightKind::Warning,
                "Low conversion volume",
                format!(
                    "Expected conversions ({}) may be too few for statistically meaningful results. \
                     Consider a larger budget or a lower target.",
                    format_amount(total),
                ),
            )]
        } else {
            vec![]
        }
    }
}

pub struct IndustryCpa;

impl InsightRule for IndustryCpa {
    fn name(&self) -> &'static str { "industry_cpa" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let Some(cpa) = ctx.report.summary.blended_cpa else { return vec![] };
        let industry = ctx.report.request.industry.as_str();
        let average = ctx
            .tables
            .industry_average_cpa(industry)
            .unwrap_or(ctx.tables.settings().fallback_industry_cpa);

        if cpa < average * CPA_GOOD_RATIO {
            vec![ctx.insight(
                self,
                InsightKind::Success,
                "Efficient CPA",
                format!(
                    "Average CPA ({}) is {:.0}% below the {industry} average ({}).",
                    format_amount(cpa),
                    (average - cpa) / average * 100.0,
                    format_amount(average),
                ),
            )]
        } else if cpa > average * CPA_POOR_RATIO {
            vec![ctx.insight(
                self,
                InsightKind::Error,
                "High CPA",
                format!(
                    "Average CPA ({}) is above the {industry} average ({}). Revisit targeting or creatives.",
                    format_amount(cpa),
                    format_amount(average),
                ),
            )]
        } else {
            vec![]
        }
    }
}

pub struct ChannelBalance;

impl InsightRule for ChannelBalance {
    fn name(&self) -> &'static str { "channel_balance" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let search = ctx.category_share(MediaCategory::Search);
        let display = ctx.category_share(MediaCategory::Display);
        if (search - display).abs() <= ctx.tables.settings().risk_ratio_threshold {
            return vec![];
        }
        let dominant = if search > display { "Search" } else { "Display" };
        vec![ctx.insight(
            self,
            InsightKind::Info,
            "Channel imbalance",
            format!("{dominant} ads dominate the mix ({search:.1}% SA / {display:.1}% DA). Consider widening the other side."),
        )]
    }
}

pub struct SeasonalTiming;

impl InsightRule for SeasonalTiming {
    fn name(&self) -> &'static str { "seasonal_timing" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let month = ctx.report.request.month;
        let industry = &ctx.report.request.industry;
        let coefficient = ctx.tables.common_coefficient(month);
        if coefficient >= PEAK_COEFFICIENT {
            vec![ctx.insight(
                self,
                InsightKind::Success,
                "Peak season",
                format!("Month {month} is a peak period for {industry}. Aggressive spend is well timed."),
            )]
        } else if coefficient <= OFF_SEASON_COEFFICIENT {
            vec![ctx.insight(
                self,
                InsightKind::Warning,
                "Off season",
                format!("Month {month} is a low-efficiency period. Favor branding or trim the budget."),
            )]
        } else {
            vec![]
        }
    }
}

pub struct GoalAlignment;

impl InsightRule for GoalAlignment {
    fn name(&self) -> &'static str { "goal_alignment" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        if ctx.report.request.goal != Some(CampaignGoal::Conversion) {
            return vec![];
        }
        let search = ctx.category_share(MediaCategory::Search);
        if search >= CONVERSION_GOAL_MIN_SEARCH {
            return vec![];
        }
        vec![ctx.insight(
            self,
            InsightKind::Info,
            "Goal and mix mismatch",
            format!("The goal is conversions but search holds only {search:.1}%. Raising SA to 60% or more should perform better."),
        )]
    }
}

pub struct Profitability;

impl InsightRule for Profitability {
    fn name(&self) -> &'static str { "profitability" }

    fn evaluate(&self, ctx: &InsightContext<'_>) -> Vec<Insight> {
        let roas = ctx.report.summary.blended_roas;
        if roas >= HIGH_ROAS {
            vec![ctx.insight(
                self,
                InsightKind::Success,
                "High profitability",
                format!("Average ROAS ({roas:.1}%) is strong. A budget increase is worth considering."),
            )]
        } else if roas > 0.0 && roas < BREAK_EVEN_ROAS {
            vec![ctx.insight(
                self,
                InsightKind::Error,
                "Unprofitable mix",
                format!("Average ROAS ({roas:.1}%) is below 100%. Raise revenue per conversion or cut CPA."),
            )]
        } else {
            vec![]
        }
    }
}

/// Whole units with thousands separators.
pub fn format_amount(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}
