use chrono::{TimeZone, Utc};
use mediamix_core::{
    config::ReferenceTables,
    export,
    scenario::ScenarioKind,
    simulation::{AllocationLine, SimulationReport, SimulationRequest, Simulator},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn report(tables: &ReferenceTables) -> SimulationReport {
    let request = SimulationRequest {
        industry: "보험".into(),
        month: 1,
        total_budget: 30_000_000.0,
        allocation: vec![
            AllocationLine::new("네이버_SA", 50.0),
            AllocationLine::new("메타_DA", 30.0),
            AllocationLine::new("유튜브_DA", 20.0),
        ],
        goal: None,
    };
    Simulator::new(tables).run(&request).unwrap()
}

fn read_rows(bytes: &[u8]) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_reader(bytes);
    let header = reader.headers().unwrap().clone();
    let rows = reader.records().collect::<Result<Vec<_>, _>>().unwrap();
    (header, rows)
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// One row per media in request order, then a total row.
#[test]
fn scenario_csv_has_media_rows_plus_total() {
    let tables = ReferenceTables::default_test();
    let r = report(&tables);

    let mut buf = Vec::new();
    export::write_scenario_csv(&r, ScenarioKind::Base, &mut buf).unwrap();
    let (header, rows) = read_rows(&buf);

    assert_eq!(header.len(), export::SCENARIO_HEADER.len());
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][0], "네이버");
    assert_eq!(&rows[1][0], "메타");
    assert_eq!(&rows[2][0], "유튜브");
    assert_eq!(&rows[3][0], export::TOTAL_LABEL);
    assert_eq!(&rows[3][4], "100.0%");
}

/// Percent columns carry one decimal and a percent sign.
#[test]
fn percentages_are_formatted() {
    let tables = ReferenceTables::default_test();
    let r = report(&tables);

    let mut buf = Vec::new();
    export::write_scenario_csv(&r, ScenarioKind::Base, &mut buf).unwrap();
    let (_, rows) = read_rows(&buf);

    assert_eq!(&rows[0][4], "50.0%");
    assert_eq!(&rows[0][8], "0.9%", "CTR 0.0088 renders as 0.9%");
    assert_eq!(export::percent(12.345), "12.3%");
}

/// The aggressive file reports more conversions than the base file.
#[test]
fn scenario_csv_follows_the_scenario() {
    let tables = ReferenceTables::default_test();
    let r = report(&tables);

    let mut base = Vec::new();
    let mut aggressive = Vec::new();
    export::write_scenario_csv(&r, ScenarioKind::Base, &mut base).unwrap();
    export::write_scenario_csv(&r, ScenarioKind::Aggressive, &mut aggressive).unwrap();

    let total = |bytes: &[u8]| -> f64 {
        let (_, rows) = read_rows(bytes);
        rows.last().unwrap()[10].parse().unwrap()
    };
    assert!(total(&aggressive) > total(&base));
}

#[test]
fn summary_csv_lists_three_scenarios() {
    let tables = ReferenceTables::default_test();
    let r = report(&tables);

    let mut buf = Vec::new();
    export::write_summary_csv(&r, &mut buf).unwrap();
    let (header, rows) = read_rows(&buf);

    assert_eq!(header.iter().collect::<Vec<_>>(), export::SUMMARY_HEADER.to_vec());
    let kinds: Vec<&str> = rows.iter().map(|r| r.get(0).unwrap()).collect();
    assert_eq!(kinds, vec!["conservative", "base", "aggressive"]);
}

#[test]
fn scenario_file_is_written_to_disk() {
    let tables = ReferenceTables::default_test();
    let r = report(&tables);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.csv");

    export::write_scenario_file(&r, ScenarioKind::Conservative, &path).unwrap();

    let content = std::fs::read(&path).unwrap();
    let (_, rows) = read_rows(&content);
    assert_eq!(rows.len(), 4);
}

#[test]
fn export_filename_embeds_timestamp() {
    let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(export::export_filename("mediamix", at), "mediamix_20260309_140507.csv");
}

/// An uncomputable catalog media without a key suffix is exported under
/// its catalog category.
#[test]
fn uncomputable_row_exports_catalog_category() {
    let bench = serde_json::json!({
        "INDUSTRY_BASE_METRICS": { "보험": { "CTR": 0.008, "CPC": 2500, "CVR": 0.02 } },
        "SEASONALITY_COMMON": {
            "1": 1.0, "2": 1.0, "3": 1.0, "4": 1.0, "5": 1.0, "6": 1.0,
            "7": 1.0, "8": 1.0, "9": 1.0, "10": 1.0, "11": 1.0, "12": 1.0
        },
        "INDUSTRY_SEASON_WEIGHT": {},
        "MEDIA_MULTIPLIERS": {},
        "BENCHMARKS": {}
    });
    let media = serde_json::json!({ "MEDIA_CATEGORIES": { "SA": ["naver"] } });
    let tables = ReferenceTables::from_json(&bench.to_string(), &media.to_string()).unwrap();

    let mut line = AllocationLine::new("naver", 100.0);
    line.inputs.revenue_per_conversion = Some(10.0);
    let request = SimulationRequest {
        industry: "보험".into(),
        month: 1,
        total_budget: 10_000_000.0,
        allocation: vec![line],
        goal: None,
    };
    let r = Simulator::new(&tables).run(&request).unwrap();

    let mut buf = Vec::new();
    export::write_scenario_csv(&r, ScenarioKind::Base, &mut buf).unwrap();
    let (_, rows) = read_rows(&buf);

    assert_eq!(&rows[0][0], "naver");
    assert_eq!(&rows[0][1], "SA");
    assert_eq!(&rows[0][2], "uncomputable");
}
