//! Humanitarian Data Exchange (HDX) integration for WFP food price datasets.
//!
//! HDX is a CKAN instance: a dataset's downloadable files are listed by the
//! `package_show` action. The global index dataset lists one food price
//! dataset per country; each country dataset's first resource is the CSV.

use std::io::Read;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::source::{CountryEntry, CountrySource, country_name, lookup_country};
use crate::domain::ObservationTable;
use crate::error::AppError;
use crate::io::ingest::{parse_date, read_observations};

pub const DEFAULT_BASE_URL: &str = "https://data.humdata.org";

/// Dataset listing every country's food price dataset.
const INDEX_DATASET: &str = "global-wfp-food-prices";

const USER_AGENT: &str = concat!("food-price-tracker/", env!("CARGO_PKG_VERSION"));

pub struct HdxClient {
    client: Client,
    base_url: String,
}

impl HdxClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::fetch(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the first resource of a dataset.
    fn first_resource_url(&self, dataset_id: &str) -> Result<String, AppError> {
        let url = format!("{}/api/3/action/package_show", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("id", dataset_id)])
            .send()
            .map_err(|e| AppError::fetch(format!("HDX request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::fetch(format!(
                "HDX request for dataset '{dataset_id}' failed with status {}.",
                resp.status()
            )));
        }

        let body: PackageShowResponse = resp
            .json()
            .map_err(|e| AppError::fetch(format!("Failed to parse HDX response: {e}")))?;
        if !body.success {
            return Err(AppError::fetch(format!("HDX reported failure for dataset '{dataset_id}'.")));
        }

        body.result
            .resources
            .into_iter()
            .next()
            .map(|r| r.url)
            .ok_or_else(|| AppError::fetch(format!("HDX dataset '{dataset_id}' has no resources.")))
    }

    fn download(&self, url: &str) -> Result<String, AppError> {
        debug!(url, "downloading resource");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::fetch(format!("Download failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::fetch(format!("Download of '{url}' failed with status {}.", resp.status())));
        }
        resp.text()
            .map_err(|e| AppError::fetch(format!("Failed to read download body: {e}")))
    }
}

impl CountrySource for HdxClient {
    fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError> {
        let url = self.first_resource_url(INDEX_DATASET)?;
        let body = self.download(&url)?;
        parse_country_index(body.as_bytes())
    }

    fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError> {
        let index = self.fetch_country_index()?;
        self.fetch_entry_observations(lookup_country(&index, country)?)
    }

    fn fetch_entry_observations(&self, entry: &CountryEntry) -> Result<ObservationTable, AppError> {
        let url = self.first_resource_url(&entry.dataset_id)?;
        let body = self.download(&url)?;
        let ingested = read_observations(body.as_bytes())?;
        info!(
            country = %entry.country,
            rows = ingested.table.len(),
            skipped = ingested.row_errors.len(),
            "fetched country observations"
        );
        Ok(ingested.table)
    }
}

#[derive(Debug, Deserialize)]
struct PackageShowResponse {
    success: bool,
    result: Package,
}

#[derive(Debug, Deserialize)]
struct Package {
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    url: String,
}

/// Parse the global index CSV, keeping prototype countries only.
///
/// The dataset id is the last path segment of each row's `url`.
pub fn parse_country_index<R: Read>(source: R) -> Result<Vec<CountryEntry>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::fetch(format!("Failed to read country index headers: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::fetch(format!("Country index is missing column `{name}`.")))
    };
    let iso3_col = column("countryiso3")?;
    let url_col = column("url")?;
    let start_col = column("start_date").ok();
    let end_col = column("end_date").ok();

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| AppError::fetch(format!("Malformed country index row: {e}")))?;
        let Some(iso3) = record.get(iso3_col) else { continue };
        if iso3.starts_with('#') {
            continue;
        }
        let Some(country) = country_name(iso3) else { continue };
        let Some(dataset_id) = record
            .get(url_col)
            .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
            .filter(|id| !id.is_empty())
        else {
            continue;
        };

        let date_at = |col: Option<usize>| col.and_then(|c| record.get(c)).and_then(|s| parse_date(s).ok());
        entries.push(CountryEntry {
            country: country.to_string(),
            iso3: iso3.to_ascii_uppercase(),
            dataset_id: dataset_id.to_string(),
            start_date: date_at(start_col),
            end_date: date_at(end_col),
        });
    }

    entries.sort_by(|a, b| a.country.cmp(&b.country));
    Ok(entries)
}
