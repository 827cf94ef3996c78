//! Data sources for country food price tables.
//!
//! - HDX download (`hdx`)
//! - local CSV directory (`csv_dir`)
//! - synthetic offline data (`sample`)
//! - TTL cache in front of any of them (`cache`)

pub mod cache;
pub mod csv_dir;
pub mod hdx;
pub mod sample;
pub mod source;

use std::time::Duration;

use crate::domain::{DashboardConfig, ObservationTable, SourceKind};
use crate::error::AppError;

pub use cache::CachedSource;
pub use csv_dir::CsvDirectorySource;
pub use hdx::HdxClient;
pub use sample::SampleSource;
pub use source::{CountryEntry, CountrySource, PROTOTYPE_COUNTRIES, lookup_country};

impl<S: CountrySource + ?Sized> CountrySource for Box<S> {
    fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError> {
        (**self).fetch_country_index()
    }

    fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError> {
        (**self).fetch_country_observations(country)
    }

    fn fetch_entry_observations(&self, entry: &CountryEntry) -> Result<ObservationTable, AppError> {
        (**self).fetch_entry_observations(entry)
    }
}

/// Build the configured source wrapped in the TTL cache.
pub fn open_source(config: &DashboardConfig) -> Result<CachedSource<Box<dyn CountrySource>>, AppError> {
    let inner: Box<dyn CountrySource> = match config.source {
        SourceKind::Hdx => Box::new(HdxClient::new(config.hdx_base_url.clone())?),
        SourceKind::Csv => {
            let dir = config
                .data_dir
                .clone()
                .ok_or_else(|| AppError::invalid("`--source csv` requires `--data-dir`."))?;
            Box::new(CsvDirectorySource::new(dir))
        }
        SourceKind::Sample => Box::new(SampleSource::new(config.sample_seed)),
    };
    Ok(CachedSource::new(inner, Duration::from_secs(config.cache_ttl_secs)))
}
