//! Country tables from a local directory of `<Country>.csv` files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::data::source::{CountryEntry, CountrySource, PROTOTYPE_COUNTRIES};
use crate::domain::ObservationTable;
use crate::error::AppError;
use crate::io::ingest::load_observations;

#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<country>.csv`; the name must be a single plain file stem.
    fn country_path(&self, country: &str) -> Result<PathBuf, AppError> {
        if country.is_empty() || country.contains(['/', '\\', std::path::MAIN_SEPARATOR]) {
            return Err(AppError::invalid(format!("Invalid country name '{country}'.")));
        }
        Ok(self.dir.join(format!("{country}.csv")))
    }
}

impl CountrySource for CsvDirectorySource {
    fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| AppError::io(format!("Failed to read data directory '{}': {e}", self.dir.display())))?;

        let mut index = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| AppError::io(format!("Failed to read data directory entry: {e}")))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(country) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let iso3 = PROTOTYPE_COUNTRIES
                .iter()
                .find(|(_, name)| *name == country)
                .map(|(code, _)| code.to_string())
                .unwrap_or_default();
            index.push(CountryEntry {
                country: country.to_string(),
                iso3,
                dataset_id: path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string(),
                start_date: None,
                end_date: None,
            });
        }

        index.sort_by(|a, b| a.country.cmp(&b.country));
        Ok(index)
    }

    fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError> {
        let path = self.country_path(country)?;
        if !path.is_file() {
            return Err(AppError::UnknownCountry(country.to_string()));
        }
        let ingested = load_observations(&path)?;
        info!(
            country,
            path = %path.display(),
            rows = ingested.table.len(),
            skipped = ingested.row_errors.len(),
            "loaded country observations"
        );
        Ok(ingested.table)
    }
}
