//! The fetch boundary: where raw country tables come from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::ObservationTable;
use crate::error::AppError;

/// Countries exposed by the dashboard, with their ISO3 codes.
pub const PROTOTYPE_COUNTRIES: [(&str, &str); 10] = [
    ("AFG", "Afghanistan"),
    ("BOL", "Bolivia"),
    ("FJI", "Fiji"),
    ("JPN", "Japan"),
    ("MEX", "Mexico"),
    ("LAO", "Laos"),
    ("PAK", "Pakistan"),
    ("SYR", "Syria"),
    ("TZA", "Tanzania"),
    ("UKR", "Ukraine"),
];

/// Short country name for an ISO3 code (prototype countries only).
pub fn country_name(iso3: &str) -> Option<&'static str> {
    PROTOTYPE_COUNTRIES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(iso3))
        .map(|(_, name)| *name)
}

/// One entry of the country index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub country: String,
    pub iso3: String,
    /// Dataset identifier on the hosting service.
    pub dataset_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A provider of country observation tables.
///
/// Implementations block until the whole table is available or fail outright.
pub trait CountrySource {
    fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError>;

    fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError>;

    /// Fetch the table for an entry already resolved from the index.
    fn fetch_entry_observations(&self, entry: &CountryEntry) -> Result<ObservationTable, AppError> {
        self.fetch_country_observations(&entry.country)
    }
}

/// Find `country` in an index, or fail with [`AppError::UnknownCountry`].
pub fn lookup_country<'a>(index: &'a [CountryEntry], country: &str) -> Result<&'a CountryEntry, AppError> {
    index
        .iter()
        .find(|e| e.country == country)
        .ok_or_else(|| AppError::UnknownCountry(country.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso3_lookup_is_case_insensitive() {
        assert_eq!(country_name("jpn"), Some("Japan"));
        assert_eq!(country_name("XXX"), None);
    }

    #[test]
    fn unknown_country_is_reported() {
        let index = vec![CountryEntry {
            country: "Japan".into(),
            iso3: "JPN".into(),
            dataset_id: "wfp-food-prices-for-japan".into(),
            start_date: None,
            end_date: None,
        }];
        assert!(lookup_country(&index, "Japan").is_ok());
        assert_eq!(
            lookup_country(&index, "Atlantis").unwrap_err(),
            AppError::UnknownCountry("Atlantis".into())
        );
    }
}
