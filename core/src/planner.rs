//! Goal-driven planning on top of the simulator.
//!
//! - `auto_allocation`: split the budget between search and display by
//!   campaign goal, then evenly across the catalog media of each category.
//! - `TargetPlan::plan`: back-calculate the budget needed for a conversion target
//!   and check how far the automatic mix gets.

use crate::{
    config::ReferenceTables,
    error::{MixError, MixResult},
    simulation::{AllocationLine, SimulationReport, SimulationRequest, Simulator},
    types::{Industry, MediaCategory, MediaKey, Month},
    validation::{self, Verdict},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 1.5;
pub const MIN_TARGET_CONVERSIONS: f64 = 1.0;
pub const MIN_TARGET_CPA: f64 = 1_000.0;
/// Achievement (%) at or above which the target is likely.
pub const LIKELY_ACHIEVEMENT: f64 = 100.0;
/// Achievement (%) at or above which the target needs efficiency work.
pub const REACHABLE_ACHIEVEMENT: f64 = 80.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CampaignGoal {
    Awareness,
    Conversion,
    Balanced,
}

impl CampaignGoal {
    /// (category, percent of budget). Search first.
    pub fn category_split(&self) -> [(MediaCategory, f64); 2] {
        match self {
            CampaignGoal::Awareness  => [(MediaCategory::Search, 40.0), (MediaCategory::Display, 60.0)],
            CampaignGoal::Conversion => [(MediaCategory::Search, 70.0), (MediaCategory::Display, 30.0)],
            CampaignGoal::Balanced   => [(MediaCategory::Search, 50.0), (MediaCategory::Display, 50.0)],
        }
    }
}

impl FromStr for CampaignGoal {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awareness"  => Ok(CampaignGoal::Awareness),
            "conversion" => Ok(CampaignGoal::Conversion),
            "balanced"   => Ok(CampaignGoal::Balanced),
            other => Err(MixError::Validation {
                field: "goal".into(),
                reason: format!("unknown campaign goal '{other}'"),
            }),
        }
    }
}

/// Shares sum to 100. A category with no eligible media hands its share
/// to the other category.
pub fn auto_allocation(
    tables: &ReferenceTables,
    goal: CampaignGoal,
    excluded: &[MediaKey],
) -> MixResult<Vec<AllocationLine>> {
    let groups: Vec<(f64, Vec<&str>)> = goal
        .category_split()
        .iter()
        .map(|(category, pct)| {
            let keys = tables
                .catalog()
                .by_category(*category)
                .into_iter()
                .map(|c| c.media_key.as_str())
                .filter(|key| !excluded.iter().any(|e| e == key))
                .collect::<Vec<_>>();
            (*pct, keys)
        })
        .filter(|(_, keys)| !keys.is_empty())
        .collect();

    let covered: f64 = groups.iter().map(|(pct, _)| pct).sum();
    if groups.is_empty() || covered <= 0.0 {
        return Err(MixError::Validation {
            field: "allocation".into(),
            reason: "no eligible media left after exclusions".into(),
        });
    }

    let mut lines = Vec::new();
    for (pct, keys) in groups {
        let per_media = pct / covered * 100.0 / keys.len() as f64;
        lines.extend(keys.into_iter().map(|key| AllocationLine::new(key, per_media)));
    }
    Ok(lines)
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetRequest {
    pub industry: Industry,
    pub month: Month,
    pub target_conversions: f64,
    pub target_cpa: f64,
    pub goal: CampaignGoal,
    #[serde(default)]
    pub excluded: Vec<MediaKey>,
    /// 1.0 neutral, below is conservative, above is aggressive.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementOutlook {
    Likely,
    NeedsImprovement,
    Hard,
}

impl AchievementOutlook {
    pub fn from_rate(achievement_rate: f64) -> Self {
        if achievement_rate >= LIKELY_ACHIEVEMENT {
            AchievementOutlook::Likely
        } else if achievement_rate >= REACHABLE_ACHIEVEMENT {
            AchievementOutlook::NeedsImprovement
        } else {
            AchievementOutlook::Hard
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AchievementOutlook::Likely => "The target is likely to be reached.",
            AchievementOutlook::NeedsImprovement => "Reaching the target needs better efficiency.",
            AchievementOutlook::Hard => {
                "The target is hard to reach as planned. Raise the budget or adjust the target."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPlan {
    pub required_budget: f64,
    pub target_conversions: f64,
    pub target_cpa: f64,
    pub predicted_conversions: f64,
    pub predicted_cpa: Option<f64>,
    /// Predicted conversions as a percentage of the target.
    pub achievement_rate: f64,
    pub outlook: AchievementOutlook,
    pub confidence: f64,
    pub report: SimulationReport,
}

impl TargetPlan {
    pub fn plan(simulator: &mut Simulator<'_>, request: &TargetRequest) -> MixResult<Self> {
        let minimums = [
            ("target_conversions", request.target_conversions, MIN_TARGET_CONVERSIONS),
            ("target_cpa", request.target_cpa, MIN_TARGET_CPA),
        ];
        for (field, value, min) in minimums {
            if !(value.is_finite() && value >= min) {
                return Err(MixError::Validation {
                    field: field.into(),
                    reason: format!("must be at least {min}, got {value}"),
                });
            }
        }
        if let Verdict::Blocking(reason) =
            validation::validate_range(request.confidence, MIN_CONFIDENCE, MAX_CONFIDENCE)
        {
            return Err(MixError::Validation { field: "confidence".into(), reason });
        }

        let required_budget = request.target_conversions * request.target_cpa;
        let allocation = auto_allocation(simulator.tables(), request.goal, &request.excluded)?;

        // The budget is derived, so the typed-in budget range does not apply.
        let report = simulator.run_derived(&SimulationRequest {
            industry: request.industry.clone(),
            month: request.month,
            total_budget: required_budget,
            allocation,
            goal: Some(request.goal),
        })?;

        let predicted_conversions = report.summary.total_conversions * request.confidence;
        let predicted_cpa = report.summary.blended_cpa.map(|cpa| cpa / request.confidence);
        let achievement_rate = predicted_conversions / request.target_conversions * 100.0;
        let outlook = AchievementOutlook::from_rate(achievement_rate);

        log::info!(
            "planner: target={:.0} budget={required_budget:.0} predicted={predicted_conversions:.1} achievement={achievement_rate:.1}%",
            request.target_conversions,
        );

        Ok(Self {
            required_budget,
            target_conversions: request.target_conversions,
            target_cpa: request.target_cpa,
            predicted_conversions,
            predicted_cpa,
            achievement_rate,
            outlook,
            confidence: request.confidence,
            report,
        })
    }
}
