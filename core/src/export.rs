//! CSV export of a report.
//!
//! One file per scenario: a row per media in request order, then a total
//! row over the computed media. Percent columns are written as `12.3%`.

use crate::{
    error::MixResult,
    scenario::ScenarioKind,
    simulation::{MediaOutcome, SimulationReport, Summary},
};
use chrono::{DateTime, Utc};
use std::{io, path::Path};

pub const SCENARIO_HEADER: [&str; 15] = [
    "media", "category", "status", "budget", "share", "cpm", "impressions", "clicks",
    "ctr", "cpc", "conversions", "cvr", "cpa", "roas", "grade",
];

pub const SUMMARY_HEADER: [&str; 7] =
    ["scenario", "conversions", "clicks", "cpa", "revenue", "roas", "grade"];

pub const TOTAL_LABEL: &str = "Total";

pub fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn whole(value: f64) -> String {
    format!("{:.0}", value.trunc())
}

fn optional_whole(value: Option<f64>) -> String {
    value.map(whole).unwrap_or_default()
}

pub fn write_scenario_csv<W: io::Write>(
    report: &SimulationReport,
    kind: ScenarioKind,
    writer: W,
) -> MixResult<()> {
    let rows = report.scenario_rows(kind);
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(SCENARIO_HEADER)?;

    for row in &rows {
        match row {
            MediaOutcome::Computed(r) => out.write_record([
                r.display_name.clone(),
                r.category.code().to_string(),
                "computed".to_string(),
                whole(r.budget),
                percent(r.share),
                whole(r.cpm),
                whole(r.impressions),
                whole(r.clicks),
                percent(r.ctr * 100.0),
                format!("{:.0}", r.cpc),
                format!("{:.1}", r.adjusted_conversions),
                percent(r.cvr * 100.0),
                optional_whole(r.adjusted_cpa),
                percent(r.roas),
                r.grade.to_string(),
            ])?,
            MediaOutcome::Uncomputable { display_name, category, budget, share, .. } => {
                out.write_record([
                    display_name.clone(),
                    category.code().to_string(),
                    "uncomputable".to_string(),
                    whole(*budget),
                    percent(*share),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ])?
            }
        }
    }

    let total = Summary::from_outcomes(&rows, &report.thresholds);
    let total_share: f64 = rows.iter().filter(|r| r.is_computed()).map(MediaOutcome::share).sum();
    let cpm = if total.total_impressions > 0.0 {
        total.total_spend / total.total_impressions * 1000.0
    } else {
        0.0
    };
    let cpc = if total.total_clicks > 0.0 { total.total_spend / total.total_clicks } else { 0.0 };
    out.write_record([
        TOTAL_LABEL.to_string(),
        String::new(),
        String::new(),
        whole(total.total_spend),
        percent(total_share),
        whole(cpm),
        whole(total.total_impressions),
        whole(total.total_clicks),
        percent(total.blended_ctr * 100.0),
        format!("{cpc:.0}"),
        format!("{:.1}", total.total_conversions),
        percent(total.blended_cvr * 100.0),
        optional_whole(total.blended_cpa),
        percent(total.blended_roas),
        total.grade.to_string(),
    ])?;

    out.flush()?;
    log::debug!("export: report={} scenario={kind} rows={}", report.report_id, rows.len());
    Ok(())
}

pub fn write_summary_csv<W: io::Write>(report: &SimulationReport, writer: W) -> MixResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(SUMMARY_HEADER)?;
    for s in &report.scenarios {
        out.write_record([
            s.kind.to_string(),
            format!("{:.1}", s.total_conversions),
            whole(s.total_clicks),
            optional_whole(s.avg_cpa),
            whole(s.total_revenue),
            percent(s.avg_roas),
            s.grade.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_scenario_file(report: &SimulationReport, kind: ScenarioKind, path: &Path) -> MixResult<()> {
    let file = std::fs::File::create(path)?;
    write_scenario_csv(report, kind, file)?;
    log::info!("export: wrote {kind} scenario to {}", path.display());
    Ok(())
}

/// `<mode>_<YYYYmmdd_HHMMSS>.csv`
pub fn export_filename(mode: &str, at: DateTime<Utc>) -> String {
    format!("{mode}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}
