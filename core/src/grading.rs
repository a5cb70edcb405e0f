//! Efficiency grader: maps blended CPA / ROAS / volume to S, A, B or C.
//!
//! The ladder is evaluated top-down; the first matching grade wins.
//! Every input, including NaN and zero volume, maps to exactly one grade.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    S,
    A,
    B,
    C,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunable thresholds. ROAS values are percentages; CPA is currency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GradeThresholds {
    pub s_min_roas: f64,
    /// "Excellent" CPA: S requires a CPA strictly below this.
    pub s_max_cpa: f64,
    pub s_min_conversions: f64,
    pub a_min_roas: f64,
    /// Upper end of the typical CPA range required for A.
    pub a_max_cpa: f64,
    pub b_min_roas: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            s_min_roas:        300.0,
            s_max_cpa:         50_000.0,
            s_min_conversions: 100.0,
            a_min_roas:        150.0,
            a_max_cpa:         70_000.0,
            b_min_roas:        100.0,
        }
    }
}

impl GradeThresholds {
    pub fn grade(&self, avg_cpa: f64, avg_roas: f64, total_conversions: f64) -> Grade {
        if !(total_conversions.is_finite() && total_conversions > 0.0) {
            return Grade::C;
        }
        let cpa_known = avg_cpa.is_finite() && avg_cpa > 0.0;

        if avg_roas >= self.s_min_roas
            && cpa_known
            && avg_cpa < self.s_max_cpa
            && total_conversions >= self.s_min_conversions
        {
            Grade::S
        } else if avg_roas >= self.a_min_roas && cpa_known && avg_cpa <= self.a_max_cpa {
            Grade::A
        } else if avg_roas >= self.b_min_roas {
            Grade::B
        } else {
            Grade::C
        }
    }

    /// Convenience for rows whose CPA may be undefined.
    pub fn grade_optional(&self, cpa: Option<f64>, roas: f64, conversions: f64) -> Grade {
        self.grade(cpa.unwrap_or(0.0), roas, conversions)
    }
}
