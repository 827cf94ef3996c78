//! Default widget values for a freshly loaded country.

use std::collections::BTreeMap;

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::domain::date_label::{DATE_STEP, to_date, to_label};
use crate::domain::{DateRange, FilterParameters, ObservationTable};
use crate::error::AppError;

/// Number of commodities / markets preselected on load.
pub const DEFAULT_SELECTION: usize = 2;

/// Months covered by the default slider window.
pub const DEFAULT_WINDOW_MONTHS: u32 = 24;

/// Slider bounds, default selections and dropdown options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetOptions {
    pub min_label: f64,
    pub max_label: f64,
    pub step: f64,
    /// Default `[start, end]` slider position.
    pub range_labels: (f64, f64),
    /// Most frequent first.
    pub commodity_options: Vec<String>,
    pub commodity_selection: Vec<String>,
    /// Most frequent first.
    pub market_options: Vec<String>,
    pub market_selection: Vec<String>,
}

impl WidgetOptions {
    pub fn from_table(table: &ObservationTable) -> Result<Self, AppError> {
        let (Some(min_date), Some(max_date)) = (table.min_date(), table.max_date()) else {
            return Err(AppError::invalid("No observations available to derive widget options."));
        };

        let window_start = max_date
            .checked_sub_months(Months::new(DEFAULT_WINDOW_MONTHS))
            .map_or(min_date, |d| d.max(min_date));

        let commodity_options = by_frequency(table.iter().map(|o| o.commodity.as_str()));
        let market_options = by_frequency(table.iter().map(|o| o.market.as_str()));

        Ok(Self {
            min_label: to_label(min_date),
            max_label: to_label(max_date),
            step: DATE_STEP,
            range_labels: (to_label(window_start), to_label(max_date)),
            commodity_selection: commodity_options.iter().take(DEFAULT_SELECTION).cloned().collect(),
            commodity_options,
            market_selection: market_options.iter().take(DEFAULT_SELECTION).cloned().collect(),
            market_options,
        })
    }

    /// Filter parameters for the default selection.
    pub fn default_params(&self, country: &str) -> Result<FilterParameters, AppError> {
        let range = DateRange::new(to_date(self.range_labels.0)?, to_date(self.range_labels.1)?)?;
        Ok(FilterParameters::new(
            country,
            range,
            self.commodity_selection.iter().cloned(),
            self.market_selection.iter().cloned(),
        ))
    }
}

fn by_frequency<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    // Stable sort keeps name order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().map(|(v, _)| v.to_string()).collect()
}
