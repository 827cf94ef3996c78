//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the cleaning / index / summary stages
//! - exported to JSON/CSV
//! - persisted in the session store and reloaded on the next interaction

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Commodity label used for generated index rows.
pub const FOOD_PRICE_INDEX: &str = "Food Price Index";

/// Unit label used for generated index rows ("price per list").
pub const INDEX_UNIT: &str = "PPL";

/// One raw price record.
///
/// The day-of-month of `date` carries no meaning; observations are monthly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub market: String,
    pub latitude: f64,
    pub longitude: f64,
    pub commodity: String,
    pub unit: String,
    pub usd_price: f64,
}

/// An ordered collection of observations.
///
/// Row order matters only for output determinism. Every pipeline stage takes
/// a table by reference and returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new(rows: Vec<Observation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Observation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }

    /// Rows matching `keep`, in their original order.
    pub fn filter(&self, mut keep: impl FnMut(&Observation) -> bool) -> Self {
        Self::new(self.rows.iter().filter(|o| keep(o)).cloned().collect())
    }

    pub fn distinct_dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.iter().map(|o| o.date).collect()
    }

    pub fn distinct_markets(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.market.as_str()).collect()
    }

    pub fn distinct_commodities(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.commodity.as_str()).collect()
    }

    pub fn min_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|o| o.date).min()
    }

    pub fn max_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|o| o.date).max()
    }
}

impl FromIterator<Observation> for ObservationTable {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ObservationTable {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::invalid(format!(
                "Invalid date range: end {end} is before start {start}."
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Immutable snapshot of the user's current selections.
///
/// `commodities` and `markets` behave as sets but keep insertion order for
/// display; duplicates are dropped on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParameters {
    pub country: String,
    pub date_range: DateRange,
    pub commodities: Vec<String>,
    pub markets: Vec<String>,
}

impl FilterParameters {
    pub fn new<C, M>(country: impl Into<String>, date_range: DateRange, commodities: C, markets: M) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            country: country.into(),
            date_range,
            commodities: dedup_ordered(commodities),
            markets: dedup_ordered(markets),
        }
    }

    pub fn has_empty_selection(&self) -> bool {
        self.commodities.is_empty() || self.markets.is_empty()
    }

    pub fn market_set(&self) -> BTreeSet<&str> {
        self.markets.iter().map(String::as_str).collect()
    }

    pub fn commodity_set(&self) -> BTreeSet<&str> {
        self.commodities.iter().map(String::as_str).collect()
    }
}

fn dedup_ordered<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for item in items {
        let item: String = item.into();
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}

/// Latest value and period-over-period changes for one commodity.
///
/// Every field except `commodity` is `None` when the filtered data has no
/// rows for it; the change fields are also `None` when history is too short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStat {
    pub commodity: String,
    pub unit: Option<String>,
    pub latest_date: Option<NaiveDate>,
    pub latest_price: Option<f64>,
    pub mom_pct_change: Option<f64>,
    pub yoy_pct_change: Option<f64>,
}

impl SummaryStat {
    pub fn empty(commodity: impl Into<String>) -> Self {
        Self {
            commodity: commodity.into(),
            unit: None,
            latest_date: None,
            latest_price: None,
            mom_pct_change: None,
            yoy_pct_change: None,
        }
    }
}

/// Last committed snapshot of the widget selections.
///
/// Round-tripped through the session store; only field equality matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetState {
    pub geo_view: bool,
    pub country: String,
    pub date_range: DateRange,
    pub commodities: Vec<String>,
    pub markets: Vec<String>,
}

impl WidgetState {
    pub fn from_params(params: &FilterParameters, geo_view: bool) -> Self {
        Self {
            geo_view,
            country: params.country.clone(),
            date_range: params.date_range,
            commodities: params.commodities.clone(),
            markets: params.markets.clone(),
        }
    }
}

/// Thresholds used by the cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Minimum share of all distinct dates a (market, commodity) pair must cover.
    pub date_abundance_threshold: f64,
    /// Minimum share of all markets a commodity must be observed in.
    pub market_abundance_threshold: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            date_abundance_threshold: 0.5,
            market_abundance_threshold: 0.7,
        }
    }
}

impl CleanConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("date abundance threshold", self.date_abundance_threshold),
            ("market abundance threshold", self.market_abundance_threshold),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(AppError::invalid(format!(
                    "Invalid {name} {value}: expected a value in [0, 1]."
                )));
            }
        }
        Ok(())
    }
}

/// Where country data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Humanitarian Data Exchange (network).
    Hdx,
    /// Local `<data-dir>/<country>.csv` files.
    Csv,
    /// Deterministic synthetic data (offline).
    Sample,
}

/// A run's configuration as understood by the app layer.
///
/// This is derived from CLI flags, environment (plus defaults).
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub source: SourceKind,
    pub data_dir: Option<PathBuf>,
    pub hdx_base_url: String,
    pub cache_ttl_secs: u64,
    pub sample_seed: u64,
    pub clean: CleanConfig,
}

impl DashboardConfig {
    /// Identify the data a dashboard session is computed from.
    pub fn fingerprint(&self) -> DataFingerprint {
        DataFingerprint {
            source: self.source,
            seed: (self.source == SourceKind::Sample).then_some(self.sample_seed),
            data_dir: self.data_dir.clone().filter(|_| self.source == SourceKind::Csv),
            base_url: (self.source == SourceKind::Hdx).then(|| self.hdx_base_url.clone()),
            clean: self.clean,
        }
    }
}

/// The inputs cached panels depend on besides the widget selections.
///
/// Stored with the session; panels saved under another fingerprint are stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFingerprint {
    pub source: SourceKind,
    pub seed: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub clean: CleanConfig,
}
