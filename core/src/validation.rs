//! Validation gate. Range checks on raw user inputs before they reach the
//! calculator.
//!
//! Hard-bound violations are `Blocking`: the caller must not compute with
//! the value. Out-of-typical-range business inputs are `Advisory`: the
//! caller surfaces the message and proceeds.

use crate::{
    config::ReferenceTables,
    error::{MixError, MixResult},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const MIN_BUDGET: f64 = 1_000_000.0;
pub const MAX_BUDGET: f64 = 10_000_000_000.0;
pub const MIN_CPC: f64 = 10.0;
pub const MAX_CPC: f64 = 100_000.0;
pub const MIN_REVENUE: f64 = 1_000.0;
pub const MAX_REVENUE: f64 = 100_000_000.0;

/// Upper ratio over the industry average above which an input is flagged.
const EFFICIENCY_HIGH_RATIO: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Budget,
    /// Budget share of one media, in percent.
    Ratio,
    Cpc,
    /// Percent.
    Ctr,
    /// Percent.
    Cvr,
    /// Revenue per conversion.
    Revenue,
    Month,
    /// Forecast bias, in percent.
    Adjustment,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Budget     => "budget",
            Field::Ratio      => "ratio",
            Field::Cpc        => "cpc",
            Field::Ctr        => "ctr",
            Field::Cvr        => "cvr",
            Field::Revenue    => "revenue",
            Field::Month      => "month",
            Field::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "budget"     => Ok(Field::Budget),
            "ratio"      => Ok(Field::Ratio),
            "cpc"        => Ok(Field::Cpc),
            "ctr"        => Ok(Field::Ctr),
            "cvr"        => Ok(Field::Cvr),
            "revenue"    => Ok(Field::Revenue),
            "month"      => Ok(Field::Month),
            "adjustment" => Ok(Field::Adjustment),
            other => Err(MixError::Validation {
                field: other.to_string(),
                reason: "unknown validation field".into(),
            }),
        }
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "message", rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    Advisory(String),
    Blocking(String),
}

impl Verdict {
    pub fn is_blocking(&self) -> bool {
        matches!(self, Verdict::Blocking(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Ok => None,
            Verdict::Advisory(m) | Verdict::Blocking(m) => Some(m),
        }
    }

    /// Blocking becomes an error; an advisory is handed back to the caller.
    pub fn into_result(self, field: Field) -> MixResult<Option<String>> {
        match self {
            Verdict::Ok => Ok(None),
            Verdict::Advisory(m) => Ok(Some(m)),
            Verdict::Blocking(reason) => Err(MixError::Validation {
                field: field.name().to_string(),
                reason,
            }),
        }
    }
}

pub fn validate(
    tables: &ReferenceTables,
    field: Field,
    value: f64,
    industry: Option<&str>,
) -> Verdict {
    if !value.is_finite() {
        return Verdict::Blocking(format!("{field} must be a finite number."));
    }

    match field {
        Field::Budget => {
            if value <= 0.0 {
                Verdict::Blocking("Budget must be greater than 0.".into())
            } else if value < MIN_BUDGET {
                Verdict::Blocking("Budget must be at least 1,000,000.".into())
            } else if value > MAX_BUDGET {
                Verdict::Blocking("Budget is too large (maximum 10,000,000,000).".into())
            } else {
                Verdict::Ok
            }
        }
        Field::Ratio => {
            if !(0.0..=100.0).contains(&value) {
                Verdict::Blocking("Budget share must be between 0 and 100.".into())
            } else {
                Verdict::Ok
            }
        }
        Field::Cpc => {
            if value <= 0.0 {
                Verdict::Blocking("CPC must be greater than 0.".into())
            } else if !(MIN_CPC..=MAX_CPC).contains(&value) {
                Verdict::Blocking("CPC is abnormal (expected 10 to 100,000).".into())
            } else {
                Verdict::Ok
            }
        }
        Field::Ctr | Field::Cvr => {
            let metric = if field == Field::Ctr { "CTR" } else { "CVR" };
            if !(0.0..=100.0).contains(&value) {
                return Verdict::Blocking(format!("{metric} must be between 0 and 100."));
            }
            match industry.and_then(|i| efficiency_advisory(tables, metric, value, i)) {
                Some(warning) => Verdict::Advisory(warning),
                None => Verdict::Ok,
            }
        }
        Field::Revenue => {
            if value <= 0.0 {
                Verdict::Blocking("Revenue per conversion must be greater than 0.".into())
            } else if !(MIN_REVENUE..=MAX_REVENUE).contains(&value) {
                Verdict::Blocking(
                    "Revenue per conversion is abnormal (expected 1,000 to 100,000,000).".into(),
                )
            } else {
                Verdict::Ok
            }
        }
        Field::Month => {
            if value.fract() != 0.0 || !(1.0..=12.0).contains(&value) {
                Verdict::Blocking("Month must be an integer between 1 and 12.".into())
            } else {
                Verdict::Ok
            }
        }
        Field::Adjustment => {
            if !(-100.0..=100.0).contains(&value) {
                Verdict::Blocking("Forecast adjustment must be between -100 and 100.".into())
            } else {
                Verdict::Ok
            }
        }
    }
}

/// Compare a user-entered metric against the industry's typical range.
/// Returns `None` when the industry has no range for the metric.
pub fn efficiency_advisory(
    tables: &ReferenceTables,
    metric: &str,
    value: f64,
    industry: &str,
) -> Option<String> {
    let range = tables.efficiency_range(industry, metric)?;
    let threshold = tables.settings().efficiency_warning_threshold;
    let avg = range.avg;

    if avg > 0.0 && value < avg * threshold {
        let diff = (avg - value) / avg * 100.0;
        Some(format!("{metric} is {diff:.0}% below the {industry} industry average ({avg})."))
    } else if avg > 0.0 && value > avg * EFFICIENCY_HIGH_RATIO {
        let diff = (value - avg) / avg * 100.0;
        Some(format!("{metric} is {diff:.0}% above the {industry} industry average ({avg})."))
    } else if value < range.min || value > range.max {
        Some(format!(
            "{metric} is outside the typical range ({}~{}).",
            range.min, range.max
        ))
    } else {
        None
    }
}

/// Generic inclusive bound check.
pub fn validate_range(value: f64, min: f64, max: f64) -> Verdict {
    if value.is_finite() && value >= min && value <= max {
        Verdict::Ok
    } else {
        Verdict::Blocking(format!("Value must be between {min} and {max}."))
    }
}
