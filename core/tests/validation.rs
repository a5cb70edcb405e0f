use mediamix_core::{
    config::ReferenceTables,
    error::MixError,
    validation::{self, Field, Verdict},
};
use serde_json::json;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Tables where "광고대행" has a range around very small CTR values.
fn tables_with_low_ctr_industry() -> ReferenceTables {
    let bench = json!({
        "INDUSTRY_BASE_METRICS": { "광고대행": { "CTR": 0.01, "CPC": 1000, "CVR": 0.02 } },
        "SEASONALITY_COMMON": {
            "1": 1.0, "2": 1.0, "3": 1.0, "4": 1.0, "5": 1.0, "6": 1.0,
            "7": 1.0, "8": 1.0, "9": 1.0, "10": 1.0, "11": 1.0, "12": 1.0
        },
        "INDUSTRY_SEASON_WEIGHT": {},
        "MEDIA_MULTIPLIERS": {},
        "BENCHMARKS": {},
        "EFFICIENCY_RANGES": {
            "광고대행": {
                "CTR": { "avg": 0.01, "min": 0.005, "max": 0.02 },
                "CVR": { "avg": 2.0, "min": 1.5, "max": 2.5 }
            }
        }
    });
    let media = json!({ "MEDIA_CATEGORIES": { "SA": ["네이버_SA"] } });
    ReferenceTables::from_json(&bench.to_string(), &media.to_string()).unwrap()
}

fn check(field: Field, value: f64, industry: Option<&str>) -> Verdict {
    validation::validate(&ReferenceTables::default_test(), field, value, industry)
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Budget must be positive and within [1,000,000, 10,000,000,000].
#[test]
fn budget_bounds() {
    assert!(check(Field::Budget, 0.0, None).is_blocking());
    assert!(check(Field::Budget, -5.0, None).is_blocking());
    assert!(check(Field::Budget, 999_999.0, None).is_blocking());
    assert_eq!(check(Field::Budget, 1_000_000.0, None), Verdict::Ok);
    assert_eq!(check(Field::Budget, 10_000_000_000.0, None), Verdict::Ok);
    assert!(check(Field::Budget, 10_000_000_001.0, None).is_blocking());
}

/// A negative CTR is invalid.
#[test]
fn negative_ctr_is_blocking() {
    assert!(check(Field::Ctr, -0.01, None).is_blocking());
    assert!(check(Field::Ctr, -0.01, Some("보험")).is_blocking());
}

/// A CTR far below the industry's typical range is accepted with a message.
#[test]
fn ctr_outside_industry_range_is_advisory() {
    let verdict = check(Field::Ctr, 0.008, Some("보험"));
    match &verdict {
        Verdict::Advisory(message) => {
            assert!(message.contains("below"), "unexpected message: {message}");
            assert!(message.contains("보험"), "message should name the industry: {message}");
        }
        other => panic!("expected an advisory, got {other:?}"),
    }
    assert!(!verdict.is_blocking());
}

/// A CTR inside the industry's typical range passes silently.
#[test]
fn ctr_inside_industry_range_is_ok() {
    let t = tables_with_low_ctr_industry();
    assert_eq!(validation::validate(&t, Field::Ctr, 0.008, Some("광고대행")), Verdict::Ok);
    assert_eq!(check(Field::Ctr, 1.2, Some("보험")), Verdict::Ok);
}

/// Values above 1.5x the average are flagged even below the max.
#[test]
fn ctr_above_average_is_advisory() {
    let verdict = check(Field::Ctr, 1.9, Some("보험"));
    assert!(matches!(&verdict, Verdict::Advisory(m) if m.contains("above")), "{verdict:?}");
}

/// Inside [0.5 avg, 1.5 avg] but below the configured minimum.
#[test]
fn cvr_below_minimum_is_advisory() {
    let t = tables_with_low_ctr_industry();
    let verdict = validation::validate(&t, Field::Cvr, 1.2, Some("광고대행"));
    assert!(matches!(&verdict, Verdict::Advisory(m) if m.contains("typical range")), "{verdict:?}");
}

/// Without an industry or a recorded range there is nothing to compare to.
#[test]
fn ratio_without_range_is_ok() {
    assert_eq!(check(Field::Ctr, 0.008, None), Verdict::Ok);
    assert_eq!(check(Field::Cvr, 50.0, Some("패션")), Verdict::Ok);
    assert!(check(Field::Cvr, 100.5, Some("패션")).is_blocking());
}

#[test]
fn month_must_be_integer_in_range() {
    assert!(check(Field::Month, 0.0, None).is_blocking());
    assert!(check(Field::Month, 13.0, None).is_blocking());
    assert!(check(Field::Month, 6.5, None).is_blocking());
    assert_eq!(check(Field::Month, 1.0, None), Verdict::Ok);
    assert_eq!(check(Field::Month, 12.0, None), Verdict::Ok);
}

#[test]
fn cpc_revenue_share_and_adjustment_bounds() {
    assert!(check(Field::Cpc, 0.0, None).is_blocking());
    assert!(check(Field::Cpc, 5.0, None).is_blocking());
    assert_eq!(check(Field::Cpc, 2_500.0, None), Verdict::Ok);
    assert!(check(Field::Cpc, 100_001.0, None).is_blocking());

    assert!(check(Field::Revenue, 500.0, None).is_blocking());
    assert_eq!(check(Field::Revenue, 100_000.0, None), Verdict::Ok);

    assert!(check(Field::Ratio, 100.1, None).is_blocking());
    assert!(check(Field::Ratio, -1.0, None).is_blocking());
    assert_eq!(check(Field::Ratio, 0.0, None), Verdict::Ok);

    assert!(check(Field::Adjustment, -101.0, None).is_blocking());
    assert_eq!(check(Field::Adjustment, -20.0, None), Verdict::Ok);
}

/// NaN and infinity never pass, whatever the field.
#[test]
fn non_finite_values_are_blocking() {
    for field in [Field::Budget, Field::Ctr, Field::Cvr, Field::Month, Field::Ratio] {
        assert!(check(field, f64::NAN, Some("보험")).is_blocking(), "{field} accepted NaN");
        assert!(check(field, f64::INFINITY, None).is_blocking(), "{field} accepted inf");
    }
}

/// Blocking converts to a validation error; an advisory is handed back.
#[test]
fn verdict_into_result() {
    let err = check(Field::Budget, 0.0, None).into_result(Field::Budget).unwrap_err();
    assert!(matches!(err, MixError::Validation { ref field, .. } if field == "budget"));

    let advisory = check(Field::Ctr, 0.008, Some("보험")).into_result(Field::Ctr).unwrap();
    assert!(advisory.is_some());

    assert_eq!(Verdict::Ok.into_result(Field::Ctr).unwrap(), None);
}

#[test]
fn field_names_round_trip_through_from_str() {
    for field in [
        Field::Budget, Field::Ratio, Field::Cpc, Field::Ctr,
        Field::Cvr, Field::Revenue, Field::Month, Field::Adjustment,
    ] {
        assert_eq!(field.name().parse::<Field>().unwrap(), field);
    }
    assert!("roi".parse::<Field>().is_err());
}

#[test]
fn validate_range_is_inclusive() {
    assert_eq!(validation::validate_range(0.5, 0.5, 1.5), Verdict::Ok);
    assert_eq!(validation::validate_range(1.5, 0.5, 1.5), Verdict::Ok);
    assert!(validation::validate_range(1.51, 0.5, 1.5).is_blocking());
    assert!(validation::validate_range(f64::NAN, 0.5, 1.5).is_blocking());
}
