//! Reporting utilities: table statistics and formatted terminal output.

use chrono::NaiveDate;

use crate::domain::ObservationTable;

pub mod format;

pub use format::*;

/// What cleaning did to a country table.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReport {
    pub raw_rows: usize,
    pub clean_rows: usize,
    pub raw_markets: usize,
    pub clean_markets: usize,
    pub raw_commodities: usize,
    pub clean_commodities: usize,
    pub dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl CleanReport {
    pub fn from_tables(raw: &ObservationTable, clean: &ObservationTable) -> Self {
        Self {
            raw_rows: raw.len(),
            clean_rows: clean.len(),
            raw_markets: raw.distinct_markets().len(),
            clean_markets: clean.distinct_markets().len(),
            raw_commodities: raw.distinct_commodities().len(),
            clean_commodities: clean.distinct_commodities().len(),
            dates: clean.distinct_dates().len(),
            first_date: clean.min_date(),
            last_date: clean.max_date(),
        }
    }
}
