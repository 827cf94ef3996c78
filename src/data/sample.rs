//! Deterministic synthetic country tables for offline runs.
//!
//! Each country gets the same shape of data:
//! - five markets around a per-country anchor coordinate
//! - five commodities on a monthly grid, prices following a log random walk
//! - occasional missing months (left for the cleaner to forward-fill)
//! - one market that only started reporting recently
//! - a minority alternate unit for rice plus some exact duplicate rows
//!
//! The same `(country, seed)` always produces the same table.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Months, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::source::{CountryEntry, CountrySource, PROTOTYPE_COUNTRIES};
use crate::domain::{Observation, ObservationTable};
use crate::error::AppError;

/// Months of history per country.
pub const SAMPLE_MONTHS: u32 = 60;

/// Markets: (name, latitude offset, longitude offset).
const MARKETS: [(&str, f64, f64); 5] = [
    ("Central", 0.0, 0.0),
    ("North", 1.2, 0.3),
    ("South", -1.1, -0.2),
    ("East", 0.2, 1.4),
    ("West", -0.3, -1.3),
];

/// Market that only reports for the last `LATE_MARKET_MONTHS` months.
const LATE_MARKET: &str = "West";
const LATE_MARKET_MONTHS: u32 = 6;

/// Commodities: (name, unit, starting USD price).
const COMMODITIES: [(&str, &str, f64); 5] = [
    ("Rice", "KG", 0.9),
    ("Wheat flour", "KG", 0.6),
    ("Beans", "KG", 1.4),
    ("Oil (vegetable)", "L", 2.1),
    ("Sugar", "KG", 0.8),
];

const GAP_PROB: f64 = 0.05;
const MONTHLY_DRIFT: f64 = 0.003;
const MONTHLY_VOL: f64 = 0.03;

/// Synthetic source; every prototype country is available.
#[derive(Debug, Clone)]
pub struct SampleSource {
    seed: u64,
    end: NaiveDate,
}

impl SampleSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            end: default_end(),
        }
    }

    /// Same generator with a different last month.
    pub fn with_end(seed: u64, end: NaiveDate) -> Self {
        Self { seed, end }
    }

    fn start(&self) -> Result<NaiveDate, AppError> {
        self.end
            .checked_sub_months(Months::new(SAMPLE_MONTHS - 1))
            .ok_or_else(|| AppError::invalid("Sample end date is too early."))
    }
}

fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap_or(NaiveDate::MIN)
}

impl CountrySource for SampleSource {
    fn fetch_country_index(&self) -> Result<Vec<CountryEntry>, AppError> {
        let start = self.start()?;
        let mut index: Vec<CountryEntry> = PROTOTYPE_COUNTRIES
            .iter()
            .map(|(iso3, name)| CountryEntry {
                country: name.to_string(),
                iso3: iso3.to_string(),
                dataset_id: format!("sample-{}", iso3.to_ascii_lowercase()),
                start_date: Some(start),
                end_date: Some(self.end),
            })
            .collect();
        index.sort_by(|a, b| a.country.cmp(&b.country));
        Ok(index)
    }

    fn fetch_country_observations(&self, country: &str) -> Result<ObservationTable, AppError> {
        if !PROTOTYPE_COUNTRIES.iter().any(|(_, name)| *name == country) {
            return Err(AppError::UnknownCountry(country.to_string()));
        }
        generate_country(country, self.seed, self.start()?, SAMPLE_MONTHS)
    }
}

/// Generate one country's raw table.
pub fn generate_country(country: &str, seed: u64, start: NaiveDate, months: u32) -> Result<ObservationTable, AppError> {
    let mut rng = StdRng::seed_from_u64(sample_seed(country, seed));
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::invalid(format!("Noise distribution error: {e}")))?;

    let anchor_lat = rng.gen_range(-30.0..45.0);
    let anchor_lon = rng.gen_range(-100.0..140.0);

    let mut rows = Vec::new();
    for (market, dlat, dlon) in MARKETS {
        let first_month = if market == LATE_MARKET {
            months.saturating_sub(LATE_MARKET_MONTHS)
        } else {
            0
        };
        let (lat, lon) = (anchor_lat + dlat, anchor_lon + dlon);

        for (commodity, unit, base) in COMMODITIES {
            let mut price: f64 = base * rng.gen_range(0.8..1.2);

            for m in 0..months {
                let shock: f64 = normal.sample(&mut rng);
                price *= (MONTHLY_DRIFT + MONTHLY_VOL * shock).exp();
                if m < first_month || rng.gen_bool(GAP_PROB) {
                    continue;
                }

                let date = start
                    .checked_add_months(Months::new(m))
                    .ok_or_else(|| AppError::invalid("Sample date out of range."))?;
                let row = Observation {
                    date,
                    market: market.to_string(),
                    latitude: lat,
                    longitude: lon,
                    commodity: commodity.to_string(),
                    unit: unit.to_string(),
                    usd_price: round_cents(price),
                };

                if commodity == "Rice" && m % 6 == 0 {
                    rows.push(Observation {
                        unit: "50 KG".to_string(),
                        usd_price: round_cents(price * 50.0),
                        ..row.clone()
                    });
                }
                if m % 10 == 0 {
                    rows.push(row.clone());
                }
                rows.push(row);
            }
        }
    }

    Ok(ObservationTable::new(rows))
}

fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn sample_seed(country: &str, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    country.hash(&mut hasher);
    seed.hash(&mut hasher);
    hasher.finish()
}
