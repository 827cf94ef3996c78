//! Cleaning: raw observations -> de-duplicated, well-covered, gap-filled table.
//!
//! Stages run in a fixed order:
//!
//! 1. unit dedup (one unit per commodity)
//! 2. row dedup on (date, market, coordinates, commodity, unit)
//! 3. date-abundance filter per (market, commodity)
//! 4. market-coverage filter per commodity
//! 5. cross-product gap filling with a per-series forward fill
//!
//! Stage 3 must run before stage 4: with borderline thresholds the reverse
//! order keeps a different set of rows.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{CleanConfig, Observation, ObservationTable};

/// Clean a raw table with the given thresholds.
///
/// An empty result is a valid outcome, not an error. Running `clean` on its
/// own output returns the same table.
pub fn clean(raw: &ObservationTable, config: &CleanConfig) -> ObservationTable {
    let rows = dedup_units(raw.rows());
    debug!(rows_in = raw.len(), rows_out = rows.len(), "unit dedup");

    let rows = dedup_rows(rows);
    debug!(rows = rows.len(), "row dedup");

    let rows = filter_date_abundance(rows, config.date_abundance_threshold);
    debug!(rows = rows.len(), threshold = config.date_abundance_threshold, "date abundance filter");

    let rows = filter_market_coverage(rows, config.market_abundance_threshold);
    debug!(rows = rows.len(), threshold = config.market_abundance_threshold, "market coverage filter");

    if rows.is_empty() {
        warn!(rows_in = raw.len(), "all observations were filtered out during cleaning");
        return ObservationTable::default();
    }

    let table = fill_gaps(rows);
    debug!(rows = table.len(), "gap fill");
    table
}

/// [`clean`] with the default thresholds (0.5 dates, 0.7 markets).
pub fn clean_default(raw: &ObservationTable) -> ObservationTable {
    clean(raw, &CleanConfig::default())
}

/// Keep only rows whose unit is the most frequent unit of their commodity.
///
/// Ties go to the lexicographically smallest unit.
fn dedup_units(rows: &[Observation]) -> Vec<Observation> {
    let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for row in rows {
        *counts
            .entry(row.commodity.as_str())
            .or_default()
            .entry(row.unit.as_str())
            .or_default() += 1;
    }

    let mut chosen: HashMap<&str, &str> = HashMap::new();
    for (commodity, units) in &counts {
        let mut best: Option<(&str, usize)> = None;
        for (unit, count) in units {
            if best.is_none_or(|(_, best_count)| *count > best_count) {
                best = Some((unit, *count));
            }
        }
        if let Some((unit, _)) = best {
            chosen.insert(commodity, unit);
        }
    }

    rows.iter()
        .filter(|row| chosen.get(row.commodity.as_str()) == Some(&row.unit.as_str()))
        .cloned()
        .collect()
}

#[derive(PartialEq, Eq, Hash)]
struct RowKey {
    date: NaiveDate,
    market: String,
    latitude: u64,
    longitude: u64,
    commodity: String,
    unit: String,
}

impl RowKey {
    fn of(row: &Observation) -> Self {
        Self {
            date: row.date,
            market: row.market.clone(),
            latitude: row.latitude.to_bits(),
            longitude: row.longitude.to_bits(),
            commodity: row.commodity.clone(),
            unit: row.unit.clone(),
        }
    }
}

/// First price wins per (date, market, coordinates, commodity, unit).
fn dedup_rows(rows: Vec<Observation>) -> Vec<Observation> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(RowKey::of(row))).collect()
}

fn filter_date_abundance(rows: Vec<Observation>, threshold: f64) -> Vec<Observation> {
    let num_dates = rows.iter().map(|r| r.date).collect::<BTreeSet<_>>().len();

    let mut dates_per_pair: HashMap<(&str, &str), BTreeSet<NaiveDate>> = HashMap::new();
    for row in &rows {
        dates_per_pair
            .entry((row.market.as_str(), row.commodity.as_str()))
            .or_default()
            .insert(row.date);
    }

    let min_count = threshold * num_dates as f64;
    let kept: HashSet<(String, String)> = dates_per_pair
        .into_iter()
        .filter(|(_, dates)| dates.len() as f64 >= min_count)
        .map(|((market, commodity), _)| (market.to_string(), commodity.to_string()))
        .collect();

    rows.into_iter()
        .filter(|row| kept.contains(&(row.market.clone(), row.commodity.clone())))
        .collect()
}

fn filter_market_coverage(rows: Vec<Observation>, threshold: f64) -> Vec<Observation> {
    let num_markets = rows.iter().map(|r| r.market.as_str()).collect::<BTreeSet<_>>().len();

    let mut markets_per_commodity: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for row in &rows {
        markets_per_commodity
            .entry(row.commodity.as_str())
            .or_default()
            .insert(row.market.as_str());
    }

    let min_count = threshold * num_markets as f64;
    let kept: HashSet<String> = markets_per_commodity
        .into_iter()
        .filter(|(_, markets)| markets.len() as f64 >= min_count)
        .map(|(commodity, _)| commodity.to_string())
        .collect();

    rows.into_iter().filter(|row| kept.contains(&row.commodity)).collect()
}

/// Expand to dates x markets x commodities and forward-fill each series.
///
/// Filled rows copy coordinates, unit and price from the last observed row of
/// the same (market, commodity). Leading gaps stay empty and are dropped.
fn fill_gaps(rows: Vec<Observation>) -> ObservationTable {
    let dates: BTreeSet<NaiveDate> = rows.iter().map(|r| r.date).collect();
    let markets: BTreeSet<String> = rows.iter().map(|r| r.market.clone()).collect();
    let commodities: BTreeSet<String> = rows.iter().map(|r| r.commodity.clone()).collect();

    let mut observed: HashMap<(String, String, NaiveDate), Vec<Observation>> = HashMap::new();
    for row in rows {
        observed
            .entry((row.market.clone(), row.commodity.clone(), row.date))
            .or_default()
            .push(row);
    }

    let mut last_seen: HashMap<(String, String), Observation> = HashMap::new();
    let mut out = Vec::new();

    for date in &dates {
        for market in &markets {
            for commodity in &commodities {
                let series = (market.clone(), commodity.clone());
                match observed.remove(&(market.clone(), commodity.clone(), *date)) {
                    Some(found) => {
                        if let Some(last) = found.last() {
                            last_seen.insert(series, last.clone());
                        }
                        out.extend(found);
                    }
                    None => {
                        if let Some(last) = last_seen.get(&series) {
                            out.push(Observation {
                                date: *date,
                                ..last.clone()
                            });
                        }
                    }
                }
            }
        }
    }

    ObservationTable::new(out)
}
