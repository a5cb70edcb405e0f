//! Media-mix simulator core.
//!
//! DATA FLOW:
//!   config      → reference tables, loaded once and never mutated
//!   simulation  → request gate, seasonality, per-media calculator, aggregate
//!   scenario    → conservative / base / aggressive projections
//!   planner     → goal-driven allocation and target back-calculation
//!   insights    → recommendations over a finished report
//!   export      → CSV rendering of a report

pub mod config;
pub mod error;
pub mod export;
pub mod grading;
pub mod insights;
pub mod performance;
pub mod planner;
pub mod scenario;
pub mod seasonality;
pub mod simulation;
pub mod types;
pub mod validation;
