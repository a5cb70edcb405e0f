//! Reference tables: benchmark metrics, seasonality, media multipliers,
//! the media catalog and tunable simulation settings.
//!
//! RULE: Tables are parsed and checked once, at load. Everything downstream
//! trusts them and never re-checks key existence. There is no mutation API.

use crate::{
    error::{MixError, MixResult},
    grading::GradeThresholds,
    scenario::ScenarioSpread,
    types::{Industry, MediaCategory, MediaKey, Metrics, Month},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const BENCHMARKS_FILE: &str = "benchmarks.json";
pub const MEDIA_CATEGORIES_FILE: &str = "media_categories.json";

fn unit() -> f64 {
    1.0
}

// ── Benchmarks document ────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct RawMetrics {
    #[serde(rename = "CTR")]
    ctr: f64,
    #[serde(rename = "CPC")]
    cpc: f64,
    #[serde(rename = "CVR")]
    cvr: f64,
}

/// Benchmark values as stored on disk: CTR and CVR in percent.
#[derive(Debug, Clone, Deserialize)]
struct RawBenchmark {
    cpc: f64,
    ctr: f64,
    cvr: f64,
    #[serde(rename = "CPA", alias = "cpa", default)]
    cpa: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaMultiplier {
    #[serde(rename = "CTR", default = "unit")]
    pub ctr: f64,
    #[serde(rename = "CPC", default = "unit")]
    pub cpc: f64,
    #[serde(rename = "CVR", default = "unit")]
    pub cvr: f64,
}

impl MediaMultiplier {
    pub const IDENTITY: MediaMultiplier = MediaMultiplier { ctr: 1.0, cpc: 1.0, cvr: 1.0 };

    /// Component-wise product with the industry base metrics.
    pub fn apply(&self, base: &Metrics) -> Metrics {
        Metrics {
            ctr: base.ctr * self.ctr,
            cpc: base.cpc * self.cpc,
            cvr: base.cvr * self.cvr,
        }
    }
}

impl Default for MediaMultiplier {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndustrySeasonWeight {
    #[serde(default)]
    pub high_months: BTreeSet<Month>,
    #[serde(default)]
    pub low_months: BTreeSet<Month>,
    #[serde(default = "unit")]
    pub high_multiplier: f64,
    #[serde(default = "unit")]
    pub low_multiplier: f64,
}

/// Observed per-(industry, media) values. Ratios are stored as ratios here,
/// converted from the percent values of the configuration file.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Benchmark {
    pub cpc: f64,
    pub ctr: f64,
    pub cvr: f64,
    pub cpa: Option<f64>,
}

impl Benchmark {
    pub fn metrics(&self) -> Metrics {
        Metrics::new(self.ctr, self.cpc, self.cvr)
    }
}

/// Typical range of one user-entered metric, in the units the user types
/// (percent for CTR and CVR, currency for CPC).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EfficiencyRange {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// One calendar year of common demand coefficients. Always complete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlySeasonality {
    coefficients: [f64; 12],
}

impl MonthlySeasonality {
    pub fn new(coefficients: [f64; 12]) -> Self {
        Self { coefficients }
    }

    pub fn coefficient(&self, month: Month) -> Option<f64> {
        if (1..=12).contains(&month) {
            Some(self.coefficients[(month - 1) as usize])
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompetitionTier {
    /// Exclusive upper bound on the media budget. `None` = open-ended.
    #[serde(default)]
    pub below: Option<f64>,
    pub factor: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RevenueDefaults {
    #[serde(rename = "SA")]
    pub search: f64,
    #[serde(rename = "DA")]
    pub display: f64,
    #[serde(rename = "OTHER")]
    pub other: f64,
}

impl RevenueDefaults {
    pub fn for_category(&self, category: MediaCategory) -> f64 {
        match category {
            MediaCategory::Search  => self.search,
            MediaCategory::Display => self.display,
            MediaCategory::Other   => self.other,
        }
    }
}

impl Default for RevenueDefaults {
    fn default() -> Self {
        Self { search: 100_000.0, display: 80_000.0, other: 80_000.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub grade_thresholds: GradeThresholds,
    /// CPC competition tiers, evaluated in order; first match wins.
    pub budget_competition: Vec<CompetitionTier>,
    pub scenario_spread: ScenarioSpread,
    pub revenue_per_conversion: RevenueDefaults,
    /// Share (%) above which one channel is a concentration risk.
    pub risk_ratio_threshold: f64,
    /// Fraction of the industry average below which an input is flagged.
    pub efficiency_warning_threshold: f64,
    /// Accepted deviation (percentage points) of the share sum from 100.
    pub allocation_tolerance: f64,
    /// Industry CPA used when the benchmark table carries none.
    pub fallback_industry_cpa: f64,
}

impl SimulationSettings {
    /// CPC multiplier for the given media budget. Larger budgets bid on
    /// more contested keywords.
    pub fn competition_factor(&self, budget: f64) -> f64 {
        self.budget_competition
            .iter()
            .find(|tier| tier.below.map_or(true, |bound| budget < bound))
            .map(|tier| tier.factor)
            .unwrap_or(1.0)
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            grade_thresholds: GradeThresholds::default(),
            budget_competition: vec![
                CompetitionTier { below: Some(10_000_000.0),  factor: 0.90 },
                CompetitionTier { below: Some(50_000_000.0),  factor: 1.00 },
                CompetitionTier { below: Some(100_000_000.0), factor: 1.10 },
                CompetitionTier { below: None,                factor: 1.20 },
            ],
            scenario_spread: ScenarioSpread::default(),
            revenue_per_conversion: RevenueDefaults::default(),
            risk_ratio_threshold: 50.0,
            efficiency_warning_threshold: 0.5,
            allocation_tolerance: 0.5,
            fallback_industry_cpa: 50_000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BenchmarksFile {
    #[serde(rename = "INDUSTRY_BASE_METRICS")]
    industry_base_metrics: Option<HashMap<String, RawMetrics>>,
    #[serde(rename = "SEASONALITY_COMMON")]
    seasonality_common: Option<HashMap<String, serde_json::Value>>,
    #[serde(rename = "INDUSTRY_SEASON_WEIGHT")]
    industry_season_weight: Option<HashMap<String, IndustrySeasonWeight>>,
    #[serde(rename = "MEDIA_MULTIPLIERS")]
    media_multipliers: Option<HashMap<String, MediaMultiplier>>,
    #[serde(rename = "BENCHMARKS")]
    benchmarks: Option<HashMap<String, HashMap<String, RawBenchmark>>>,
    #[serde(rename = "EFFICIENCY_RANGES", default)]
    efficiency_ranges: HashMap<String, HashMap<String, EfficiencyRange>>,
    #[serde(rename = "SIMULATION_SETTINGS", default)]
    settings: SimulationSettings,
}

// ── Media categories document ──────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct MediaCategoriesFile {
    #[serde(rename = "MEDIA_CATEGORIES")]
    media_categories: Option<BTreeMap<String, Vec<String>>>,
    #[serde(rename = "MEDIA_KEYS", default)]
    media_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelEntry {
    pub display_name: String,
    pub media_key: MediaKey,
    pub category: MediaCategory,
}

/// Channel taxonomy and display-name mapping.
#[derive(Debug, Clone, Default)]
pub struct MediaCatalog {
    channels: Vec<ChannelEntry>,
}

impl MediaCatalog {
    pub fn new(channels: Vec<ChannelEntry>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &[ChannelEntry] {
        &self.channels
    }

    pub fn by_category(&self, category: MediaCategory) -> Vec<&ChannelEntry> {
        self.channels.iter().filter(|c| c.category == category).collect()
    }

    pub fn entry_for_key(&self, media_key: &str) -> Option<&ChannelEntry> {
        self.channels.iter().find(|c| c.media_key == media_key)
    }

    pub fn key_for_display(&self, display_name: &str) -> Option<&str> {
        self.channels
            .iter()
            .find(|c| c.display_name == display_name)
            .map(|c| c.media_key.as_str())
    }

    /// Catalog category if listed, otherwise inferred from the key suffix.
    pub fn category_of(&self, media_key: &str) -> MediaCategory {
        self.entry_for_key(media_key)
            .map(|c| c.category)
            .unwrap_or_else(|| MediaCategory::from_media_key(media_key))
    }

    pub fn display_name<'a>(&'a self, media_key: &'a str) -> &'a str {
        self.entry_for_key(media_key)
            .map(|c| c.display_name.as_str())
            .unwrap_or(media_key)
    }
}

// ── Reference tables ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReferenceTables {
    base_metrics:      HashMap<Industry, Metrics>,
    seasonality:       MonthlySeasonality,
    season_weights:    HashMap<Industry, IndustrySeasonWeight>,
    media_multipliers: HashMap<MediaKey, MediaMultiplier>,
    benchmarks:        HashMap<Industry, HashMap<MediaKey, Benchmark>>,
    efficiency_ranges: HashMap<Industry, HashMap<String, EfficiencyRange>>,
    catalog:           MediaCatalog,
    settings:          SimulationSettings,
}

impl ReferenceTables {
    /// Load from the data/ directory.
    /// In tests, use ReferenceTables::default_test() or from_json().
    pub fn load(data_dir: &str) -> MixResult<Self> {
        let bench_path = format!("{data_dir}/{BENCHMARKS_FILE}");
        let media_path = format!("{data_dir}/{MEDIA_CATEGORIES_FILE}");
        let bench_content = read_document(&bench_path)?;
        let media_content = read_document(&media_path)?;
        Self::parse(&bench_content, &bench_path, &media_content, &media_path)
    }

    /// Parse both configuration documents from memory.
    pub fn from_json(benchmarks: &str, media_categories: &str) -> MixResult<Self> {
        Self::parse(benchmarks, BENCHMARKS_FILE, media_categories, MEDIA_CATEGORIES_FILE)
    }

    fn parse(
        bench_content: &str,
        bench_path: &str,
        media_content: &str,
        media_path: &str,
    ) -> MixResult<Self> {
        let bench: BenchmarksFile = serde_json::from_str(bench_content)
            .map_err(|e| MixError::DataLoad { path: bench_path.to_string(), reason: e.to_string() })?;
        let media: MediaCategoriesFile = serde_json::from_str(media_content)
            .map_err(|e| MixError::DataLoad { path: media_path.to_string(), reason: e.to_string() })?;

        let base_metrics = require(bench.industry_base_metrics, "INDUSTRY_BASE_METRICS")?
            .into_iter()
            .map(|(industry, m)| (industry, Metrics::new(m.ctr, m.cpc, m.cvr)))
            .collect();

        let seasonality =
            parse_seasonality(require(bench.seasonality_common, "SEASONALITY_COMMON")?)?;

        let season_weights = require(bench.industry_season_weight, "INDUSTRY_SEASON_WEIGHT")?;
        for (industry, weight) in &season_weights {
            check_season_weight(industry, weight)?;
        }

        let media_multipliers = require(bench.media_multipliers, "MEDIA_MULTIPLIERS")?;

        let benchmarks = require(bench.benchmarks, "BENCHMARKS")?
            .into_iter()
            .map(|(industry, by_media)| {
                let converted = by_media
                    .into_iter()
                    .map(|(key, raw)| {
                        let b = Benchmark {
                            cpc: raw.cpc,
                            ctr: raw.ctr / 100.0,
                            cvr: raw.cvr / 100.0,
                            cpa: raw.cpa,
                        };
                        (key, b)
                    })
                    .collect();
                (industry, converted)
            })
            .collect();

        check_settings(&bench.settings)?;

        let catalog = build_catalog(
            require(media.media_categories, "MEDIA_CATEGORIES")?,
            &media.media_keys,
        )?;

        let tables = Self {
            base_metrics,
            seasonality,
            season_weights,
            media_multipliers,
            benchmarks,
            efficiency_ranges: bench.efficiency_ranges,
            catalog,
            settings: bench.settings,
        };

        log::info!(
            "config: loaded {} industries, {} media multipliers, {} catalog channels",
            tables.available_industries().len(),
            tables.media_multipliers.len(),
            tables.catalog.channels().len(),
        );

        Ok(tables)
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn base_metrics(&self, industry: &str) -> Option<&Metrics> {
        self.base_metrics.get(industry)
    }

    /// Identity multiplier for unknown media keys.
    pub fn media_multiplier(&self, media_key: &str) -> MediaMultiplier {
        self.media_multipliers
            .get(media_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn benchmark_override(&self, industry: &str, media_key: &str) -> Option<&Benchmark> {
        self.benchmarks.get(industry).and_then(|m| m.get(media_key))
    }

    /// Sorted union of industries with base metrics or benchmarks.
    pub fn available_industries(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .base_metrics
            .keys()
            .chain(self.benchmarks.keys())
            .map(String::as_str)
            .collect();
        names.into_iter().collect()
    }

    /// 1.0 for months outside 1..=12.
    pub fn common_coefficient(&self, month: Month) -> f64 {
        self.seasonality.coefficient(month).unwrap_or(1.0)
    }

    pub fn season_weight(&self, industry: &str) -> Option<&IndustrySeasonWeight> {
        self.season_weights.get(industry)
    }

    pub fn efficiency_range(&self, industry: &str, metric: &str) -> Option<&EfficiencyRange> {
        self.efficiency_ranges.get(industry).and_then(|m| m.get(metric))
    }

    /// Mean benchmark CPA across the industry's media, when any is recorded.
    pub fn industry_average_cpa(&self, industry: &str) -> Option<f64> {
        let values: Vec<f64> = self
            .benchmarks
            .get(industry)?
            .values()
            .filter_map(|b| b.cpa)
            .filter(|cpa| *cpa > 0.0)
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    pub fn catalog(&self) -> &MediaCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Tables with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let base_metrics = HashMap::from([
            ("보험".to_string(), Metrics::new(0.008, 2500.0, 0.02)),
            ("패션".to_string(), Metrics::new(0.012, 800.0, 0.025)),
        ]);

        let seasonality = MonthlySeasonality::new([
            1.10, 0.95, 1.00, 1.00, 1.05, 0.95, 0.90, 0.90, 1.00, 1.05, 1.15, 1.20,
        ]);

        let season_weights = HashMap::from([(
            "패션".to_string(),
            IndustrySeasonWeight {
                high_months: BTreeSet::from([11, 12]),
                low_months: BTreeSet::from([7, 8]),
                high_multiplier: 1.2,
                low_multiplier: 0.85,
            },
        )]);

        let media_multipliers = HashMap::from([
            ("네이버_SA".to_string(), MediaMultiplier::IDENTITY),
            ("구글_SA".to_string(), MediaMultiplier { ctr: 1.1, cpc: 1.2, cvr: 1.05 }),
            ("메타_DA".to_string(), MediaMultiplier { ctr: 0.6, cpc: 0.5, cvr: 0.7 }),
            ("유튜브_DA".to_string(), MediaMultiplier { ctr: 0.5, cpc: 0.4, cvr: 0.6 }),
        ]);

        let benchmarks = HashMap::from([(
            "보험".to_string(),
            HashMap::from([(
                "카카오_SA".to_string(),
                Benchmark { cpc: 1800.0, ctr: 0.009, cvr: 0.015, cpa: Some(120_000.0) },
            )]),
        )]);

        let efficiency_ranges = HashMap::from([(
            "보험".to_string(),
            HashMap::from([
                ("CTR".to_string(), EfficiencyRange { avg: 1.2, min: 0.6, max: 2.0 }),
                ("CVR".to_string(), EfficiencyRange { avg: 2.0, min: 1.0, max: 3.5 }),
            ]),
        )]);

        let channel = |display: &str, key: &str, category| ChannelEntry {
            display_name: display.into(),
            media_key: key.into(),
            category,
        };
        let catalog = MediaCatalog::new(vec![
            channel("네이버", "네이버_SA", MediaCategory::Search),
            channel("구글", "구글_SA", MediaCategory::Search),
            channel("카카오", "카카오_SA", MediaCategory::Search),
            channel("메타", "메타_DA", MediaCategory::Display),
            channel("유튜브", "유튜브_DA", MediaCategory::Display),
        ]);

        Self {
            base_metrics,
            seasonality,
            season_weights,
            media_multipliers,
            benchmarks,
            efficiency_ranges,
            catalog,
            settings: SimulationSettings::default(),
        }
    }
}

fn read_document(path: &str) -> MixResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| MixError::DataLoad { path: path.to_string(), reason: e.to_string() })
}

fn require<T>(section: Option<T>, name: &str) -> MixResult<T> {
    section.ok_or_else(|| MixError::schema(name, "required section is missing"))
}

fn parse_seasonality(raw: HashMap<String, serde_json::Value>) -> MixResult<MonthlySeasonality> {
    const SECTION: &str = "SEASONALITY_COMMON";
    let mut coefficients = [None; 12];

    for (key, value) in raw {
        // Annotation keys such as "description" are not months.
        let Ok(month) = key.parse::<Month>() else { continue };
        if !(1..=12).contains(&month) {
            return Err(MixError::schema(SECTION, format!("month {month} is outside 1..=12")));
        }
        let coefficient = value
            .as_f64()
            .ok_or_else(|| MixError::schema(SECTION, format!("month {month} is not a number")))?;
        if !(coefficient.is_finite() && coefficient > 0.0) {
            return Err(MixError::schema(
                SECTION,
                format!("month {month} coefficient must be positive, got {coefficient}"),
            ));
        }
        let slot = &mut coefficients[(month - 1) as usize];
        if slot.is_some() {
            return Err(MixError::schema(SECTION, format!("month {month} is given more than once")));
        }
        *slot = Some(coefficient);
    }

    let mut table = [0.0; 12];
    for (idx, slot) in coefficients.iter().enumerate() {
        table[idx] = slot.ok_or_else(|| {
            MixError::schema(SECTION, format!("month {} is missing", idx + 1))
        })?;
    }
    Ok(MonthlySeasonality::new(table))
}

fn check_season_weight(industry: &str, weight: &IndustrySeasonWeight) -> MixResult<()> {
    const SECTION: &str = "INDUSTRY_SEASON_WEIGHT";
    if let Some(m) = weight
        .high_months
        .iter()
        .chain(weight.low_months.iter())
        .find(|m| !(1..=12).contains(*m))
    {
        return Err(MixError::schema(SECTION, format!("{industry}: month {m} is outside 1..=12")));
    }
    if let Some(m) = weight.high_months.intersection(&weight.low_months).next() {
        return Err(MixError::schema(
            SECTION,
            format!("{industry}: month {m} is both a high and a low month"),
        ));
    }
    for (label, value) in [("high_multiplier", weight.high_multiplier), ("low_multiplier", weight.low_multiplier)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(MixError::schema(
                SECTION,
                format!("{industry}: {label} must be positive, got {value}"),
            ));
        }
    }
    Ok(())
}

fn check_settings(settings: &SimulationSettings) -> MixResult<()> {
    const SECTION: &str = "SIMULATION_SETTINGS";
    if let Some(tier) = settings
        .budget_competition
        .iter()
        .find(|t| !(t.factor.is_finite() && t.factor > 0.0))
    {
        return Err(MixError::schema(
            SECTION,
            format!("competition factor must be positive, got {}", tier.factor),
        ));
    }
    check_competition_tiers(&settings.budget_competition)?;
    if settings.allocation_tolerance < 0.0 {
        return Err(MixError::schema(SECTION, "allocation_tolerance must not be negative"));
    }
    Ok(())
}

/// Bounds strictly ascend and only the last tier is open-ended, so every
/// budget lands in exactly one tier.
fn check_competition_tiers(tiers: &[CompetitionTier]) -> MixResult<()> {
    const SECTION: &str = "SIMULATION_SETTINGS";
    let Some((last, bounded)) = tiers.split_last() else {
        return Err(MixError::schema(SECTION, "budget_competition needs at least one tier"));
    };
    if let Some(bound) = last.below {
        return Err(MixError::schema(
            SECTION,
            format!("last competition tier must be open-ended, got a bound of {bound}"),
        ));
    }

    let mut previous = 0.0;
    for tier in bounded {
        let Some(bound) = tier.below else {
            return Err(MixError::schema(SECTION, "only the last competition tier may be open-ended"));
        };
        if !(bound.is_finite() && bound > previous) {
            return Err(MixError::schema(
                SECTION,
                format!("competition bounds must be finite and ascending, got {bound} after {previous}"),
            ));
        }
        previous = bound;
    }
    Ok(())
}

fn build_catalog(
    categories: BTreeMap<String, Vec<String>>,
    media_keys: &HashMap<String, String>,
) -> MixResult<MediaCatalog> {
    let mut channels = Vec::new();
    for (code, names) in categories {
        let category = match code.as_str() {
            "SA" => MediaCategory::Search,
            "DA" => MediaCategory::Display,
            _ => MediaCategory::Other,
        };
        for display_name in names {
            let media_key = media_keys
                .get(&display_name)
                .cloned()
                .unwrap_or_else(|| display_name.clone());
            if channels.iter().any(|c: &ChannelEntry| c.media_key == media_key) {
                return Err(MixError::schema(
                    "MEDIA_CATEGORIES",
                    format!("media key {media_key} is listed twice"),
                ));
            }
            channels.push(ChannelEntry { display_name, media_key, category });
        }
    }
    Ok(MediaCatalog::new(channels))
}
