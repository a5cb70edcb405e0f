use mediamix_core::{
    config::{ReferenceTables, BENCHMARKS_FILE, MEDIA_CATEGORIES_FILE},
    error::MixError,
    types::MediaCategory,
};
use serde_json::{json, Value};
use std::fs;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn benchmarks() -> Value {
    json!({
        "INDUSTRY_BASE_METRICS": {
            "보험": { "CTR": 0.008, "CPC": 2500, "CVR": 0.02 },
            "패션": { "CTR": 0.012, "CPC": 800, "CVR": 0.025 }
        },
        "SEASONALITY_COMMON": {
            "description": "annotation keys are ignored",
            "1": 1.10, "2": 0.95, "3": 1.0, "4": 1.0, "5": 1.05, "6": 0.95,
            "7": 0.9, "8": 0.9, "9": 1.0, "10": 1.05, "11": 1.15, "12": 1.2
        },
        "INDUSTRY_SEASON_WEIGHT": {
            "패션": { "high_months": [11, 12], "low_months": [7, 8], "high_multiplier": 1.2, "low_multiplier": 0.85 }
        },
        "MEDIA_MULTIPLIERS": { "구글_SA": { "CTR": 1.1, "CPC": 1.2 } },
        "BENCHMARKS": {
            "보험": { "카카오_SA": { "cpc": 1800, "ctr": 0.9, "cvr": 1.5, "CPA": 120000 } },
            "여행": { "구글_SA":   { "cpc": 1250, "ctr": 1.2, "cvr": 1.6 } }
        }
    })
}

fn media() -> Value {
    json!({
        "MEDIA_CATEGORIES": { "SA": ["네이버 검색", "구글_SA"], "DA": ["메타"] },
        "MEDIA_KEYS": { "네이버 검색": "네이버_SA", "메타": "메타_DA" }
    })
}

fn parse(bench: &Value, media: &Value) -> Result<ReferenceTables, MixError> {
    ReferenceTables::from_json(&bench.to_string(), &media.to_string())
}

fn schema_section(err: MixError) -> String {
    match err {
        MixError::Schema { section, .. } => section,
        other => panic!("expected a schema error, got {other:?}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Both documents load from a data directory.
#[test]
fn loads_from_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(BENCHMARKS_FILE), benchmarks().to_string()).unwrap();
    fs::write(dir.path().join(MEDIA_CATEGORIES_FILE), media().to_string()).unwrap();

    let tables = ReferenceTables::load(dir.path().to_str().unwrap()).unwrap();

    assert_eq!(tables.available_industries(), vec!["보험", "여행", "패션"]);
    assert!((tables.common_coefficient(1) - 1.10).abs() < 1e-12);
}

/// The shipped data directory parses.
#[test]
fn shipped_data_loads() {
    let data_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
    let tables = ReferenceTables::load(data_dir).unwrap();

    let base = tables.base_metrics("보험").unwrap();
    assert_eq!((base.ctr, base.cpc, base.cvr), (0.008, 2500.0, 0.02));
    assert!((tables.common_coefficient(1) - 1.10).abs() < 1e-12);
    assert!(tables.season_weight("보험").is_none());
}

#[test]
fn missing_file_is_a_data_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReferenceTables::load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, MixError::DataLoad { .. }), "unexpected error {err:?}");
}

#[test]
fn malformed_json_is_a_data_load_error() {
    let err = ReferenceTables::from_json("{ not json", &media().to_string()).unwrap_err();
    assert!(matches!(err, MixError::DataLoad { ref path, .. } if path == BENCHMARKS_FILE));
}

/// Every required section is checked at load.
#[test]
fn missing_required_section_is_a_schema_error() {
    for section in [
        "INDUSTRY_BASE_METRICS",
        "SEASONALITY_COMMON",
        "INDUSTRY_SEASON_WEIGHT",
        "MEDIA_MULTIPLIERS",
        "BENCHMARKS",
    ] {
        let mut bench = benchmarks();
        bench.as_object_mut().unwrap().remove(section);
        assert_eq!(schema_section(parse(&bench, &media()).unwrap_err()), section);
    }

    let err = parse(&benchmarks(), &json!({ "MEDIA_KEYS": {} })).unwrap_err();
    assert_eq!(schema_section(err), "MEDIA_CATEGORIES");
}

#[test]
fn seasonality_gap_is_rejected() {
    let mut bench = benchmarks();
    bench["SEASONALITY_COMMON"].as_object_mut().unwrap().remove("6");
    assert_eq!(schema_section(parse(&bench, &media()).unwrap_err()), "SEASONALITY_COMMON");
}

#[test]
fn non_positive_coefficient_is_rejected() {
    let mut bench = benchmarks();
    bench["SEASONALITY_COMMON"]["4"] = json!(0.0);
    assert!(parse(&bench, &media()).is_err());
}

#[test]
fn overlapping_season_months_are_rejected() {
    let mut bench = benchmarks();
    bench["INDUSTRY_SEASON_WEIGHT"]["패션"]["low_months"] = json!([7, 12]);
    assert_eq!(schema_section(parse(&bench, &media()).unwrap_err()), "INDUSTRY_SEASON_WEIGHT");
}

#[test]
fn season_month_out_of_range_is_rejected() {
    let mut bench = benchmarks();
    bench["INDUSTRY_SEASON_WEIGHT"]["패션"]["high_months"] = json!([13]);
    assert!(parse(&bench, &media()).is_err());
}

/// Benchmark CTR and CVR are stored in percent and converted to ratios.
#[test]
fn benchmark_percentages_become_ratios() {
    let tables = parse(&benchmarks(), &media()).unwrap();
    let b = tables.benchmark_override("보험", "카카오_SA").unwrap();

    assert!((b.ctr - 0.009).abs() < 1e-12);
    assert!((b.cvr - 0.015).abs() < 1e-12);
    assert_eq!(b.cpa, Some(120_000.0));
    assert_eq!(tables.industry_average_cpa("보험"), Some(120_000.0));
    assert_eq!(tables.industry_average_cpa("여행"), None);
}

/// Missing multiplier components default to 1.0.
#[test]
fn partial_multiplier_defaults_to_identity() {
    let tables = parse(&benchmarks(), &media()).unwrap();
    let m = tables.media_multiplier("구글_SA");
    assert_eq!((m.ctr, m.cpc, m.cvr), (1.1, 1.2, 1.0));
}

/// Display names map to media keys; unmapped names are their own key.
#[test]
fn catalog_maps_display_names() {
    let tables = parse(&benchmarks(), &media()).unwrap();
    let catalog = tables.catalog();

    assert_eq!(catalog.key_for_display("네이버 검색"), Some("네이버_SA"));
    assert_eq!(catalog.display_name("메타_DA"), "메타");
    assert_eq!(catalog.category_of("구글_SA"), MediaCategory::Search);
    assert_eq!(catalog.by_category(MediaCategory::Display).len(), 1);
}

#[test]
fn duplicate_media_key_is_rejected() {
    let dup = json!({
        "MEDIA_CATEGORIES": { "SA": ["네이버 검색"], "DA": ["네이버 검색"] },
        "MEDIA_KEYS": { "네이버 검색": "네이버_SA" }
    });
    assert_eq!(schema_section(parse(&benchmarks(), &dup).unwrap_err()), "MEDIA_CATEGORIES");
}

/// Optional settings override the defaults.
#[test]
fn simulation_settings_are_optional_overrides() {
    let defaults = parse(&benchmarks(), &media()).unwrap();
    assert_eq!(defaults.settings().risk_ratio_threshold, 50.0);

    let mut bench = benchmarks();
    bench["SIMULATION_SETTINGS"] = json!({ "risk_ratio_threshold": 40, "grade_thresholds": { "s_min_roas": 400 } });
    let tables = parse(&bench, &media()).unwrap();

    assert_eq!(tables.settings().risk_ratio_threshold, 40.0);
    assert_eq!(tables.settings().grade_thresholds.s_min_roas, 400.0);
    assert_eq!(tables.settings().grade_thresholds.a_min_roas, 150.0);
    assert_eq!(tables.settings().allocation_tolerance, 0.5);
}

#[test]
fn negative_competition_factor_is_rejected() {
    let mut bench = benchmarks();
    bench["SIMULATION_SETTINGS"] = json!({ "budget_competition": [{ "factor": -1.0 }] });
    assert_eq!(schema_section(parse(&bench, &media()).unwrap_err()), "SIMULATION_SETTINGS");
}

/// "1" and "01" name the same month; a second entry is rejected.
#[test]
fn repeated_season_month_is_rejected() {
    let mut bench = benchmarks();
    bench["SEASONALITY_COMMON"]["01"] = json!(1.3);
    assert_eq!(schema_section(parse(&bench, &media()).unwrap_err()), "SEASONALITY_COMMON");
}

/// Competition bounds must ascend and end in an open-ended tier.
#[test]
fn competition_tiers_must_be_ordered_and_open_ended() {
    let tiers = [
        json!([{ "below": 50000000, "factor": 1.0 }, { "below": 10000000, "factor": 0.9 }, { "factor": 1.2 }]),
        json!([{ "below": 10000000, "factor": 0.9 }, { "below": 50000000, "factor": 1.0 }]),
        json!([{ "factor": 1.0 }, { "below": 10000000, "factor": 0.9 }]),
        json!([]),
    ];
    for tier in tiers {
        let mut bench = benchmarks();
        bench["SIMULATION_SETTINGS"] = json!({ "budget_competition": tier.clone() });
        assert_eq!(
            schema_section(parse(&bench, &media()).unwrap_err()),
            "SIMULATION_SETTINGS",
            "{tier} should be rejected"
        );
    }

    let mut bench = benchmarks();
    bench["SIMULATION_SETTINGS"] =
        json!({ "budget_competition": [{ "below": 20000000, "factor": 0.95 }, { "factor": 1.05 }] });
    let tables = parse(&bench, &media()).unwrap();
    assert_eq!(tables.settings().competition_factor(5_000_000.0), 0.95);
    assert_eq!(tables.settings().competition_factor(20_000_000.0), 1.05);
}
