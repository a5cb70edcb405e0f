use mediamix_core::{
    config::ReferenceTables,
    seasonality::{self, SeasonalityCache},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn tables() -> ReferenceTables {
    ReferenceTables::default_test()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// An industry without a seasonal weight gets the common coefficient as-is.
#[test]
fn industry_without_weight_uses_common_coefficient() {
    let t = tables();
    assert!(close(seasonality::resolve(&t, 1, "보험"), 1.10));
    assert!(close(seasonality::resolve(&t, 7, "보험"), 0.90));
    assert!(close(seasonality::resolve(&t, 12, "보험"), 1.20));
}

/// High months multiply by high_multiplier, low months by low_multiplier,
/// other months are left alone.
#[test]
fn industry_weight_applies_to_high_and_low_months() {
    let t = tables();
    let december = seasonality::resolve(&t, 12, "패션");
    let july = seasonality::resolve(&t, 7, "패션");
    let march = seasonality::resolve(&t, 3, "패션");

    assert!(close(december, 1.20 * 1.2), "December factor {december}");
    assert!(close(july, 0.90 * 0.85), "July factor {july}");
    assert!(close(march, 1.00), "March factor {march}");
}

/// Every valid month yields a strictly positive factor for every known
/// industry, and scaling a zero metric keeps it at zero.
#[test]
fn factor_is_positive_for_all_months_and_industries() {
    let t = tables();
    for industry in t.available_industries() {
        for month in 1..=12 {
            let factor = seasonality::resolve(&t, month, industry);
            assert!(factor > 0.0, "{industry} month {month} factor={factor}");
            assert_eq!(0.0 * factor, 0.0);
        }
    }
}

/// Unknown industries fall back to the common coefficient; out-of-range
/// months fall back to 1.0.
#[test]
fn unknown_inputs_fall_back_to_defaults() {
    let t = tables();
    assert!(close(seasonality::resolve(&t, 11, "없는업종"), 1.15));
    assert!(close(seasonality::resolve(&t, 13, "보험"), 1.0));
    assert!(close(seasonality::resolve(&t, 0, "보험"), 1.0));
}

/// Two calls with the same inputs are bit-identical.
#[test]
fn resolve_is_idempotent() {
    let t = tables();
    for month in 1..=12 {
        let a = seasonality::resolve(&t, month, "패션");
        let b = seasonality::resolve(&t, month, "패션");
        assert_eq!(a.to_bits(), b.to_bits(), "month {month} drifted");
    }
}

/// The cache returns exactly what the pure function returns and stores
/// one entry per (month, industry).
#[test]
fn cache_matches_pure_function() {
    let t = tables();
    let mut cache = SeasonalityCache::new();
    assert!(cache.is_empty());

    let first = cache.resolve(&t, 12, "패션");
    let second = cache.resolve(&t, 12, "패션");
    let other = cache.resolve(&t, 12, "보험");

    assert_eq!(first.to_bits(), seasonality::resolve(&t, 12, "패션").to_bits());
    assert_eq!(first.to_bits(), second.to_bits());
    assert!(close(other, 1.20));
    assert_eq!(cache.len(), 2);
}
