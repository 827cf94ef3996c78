//! Food Price Index: unweighted mean of the selected commodities per
//! (date, market).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{FOOD_PRICE_INDEX, INDEX_UNIT, Observation, ObservationTable};

/// Filter to the selection and append one index row per (date, market,
/// coordinates) group.
///
/// The result holds the filtered input rows first, then the index rows.
/// An empty market or commodity selection yields an empty table.
pub fn compute_index<M, C>(clean: &ObservationTable, markets: &[M], commodities: &[C]) -> ObservationTable
where
    M: AsRef<str>,
    C: AsRef<str>,
{
    let markets: BTreeSet<&str> = markets.iter().map(AsRef::as_ref).collect();
    let commodities: BTreeSet<&str> = commodities.iter().map(AsRef::as_ref).collect();

    if markets.is_empty() || commodities.is_empty() {
        debug!("empty market/commodity selection; index is empty");
        return ObservationTable::default();
    }

    let selected = clean.filter(|o| {
        markets.contains(o.market.as_str()) && commodities.contains(o.commodity.as_str())
    });

    // (date, market, lat bits, lon bits) -> (lat, lon, sum, count)
    let mut groups: BTreeMap<(NaiveDate, &str, u64, u64), (f64, f64, f64, usize)> = BTreeMap::new();
    for o in selected.iter() {
        let entry = groups
            .entry((o.date, o.market.as_str(), o.latitude.to_bits(), o.longitude.to_bits()))
            .or_insert((o.latitude, o.longitude, 0.0, 0));
        entry.2 += o.usd_price;
        entry.3 += 1;
    }

    let index_rows: Vec<Observation> = groups
        .into_iter()
        .map(|((date, market, _, _), (latitude, longitude, sum, count))| Observation {
            date,
            market: market.to_string(),
            latitude,
            longitude,
            commodity: FOOD_PRICE_INDEX.to_string(),
            unit: INDEX_UNIT.to_string(),
            usd_price: sum / count as f64,
        })
        .collect();

    debug!(rows = selected.len(), index_rows = index_rows.len(), "food price index");

    let mut rows = selected.into_rows();
    rows.extend(index_rows);
    ObservationTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, m, 15).unwrap()
    }

    fn obs(date: NaiveDate, market: &str, commodity: &str, price: f64) -> Observation {
        Observation {
            date,
            market: market.to_string(),
            latitude: 35.7,
            longitude: 139.7,
            commodity: commodity.to_string(),
            unit: "KG".to_string(),
            usd_price: price,
        }
    }

    #[test]
    fn index_is_mean_of_selected_commodities() {
        let table = ObservationTable::new(vec![
            obs(d(1), "Tokyo", "Rice", 2.0),
            obs(d(1), "Tokyo", "Wheat", 4.0),
        ]);
        let out = compute_index(&table, &["Tokyo"], &["Rice", "Wheat"]);

        assert_eq!(out.len(), 3);
        let index: Vec<&Observation> = out.iter().filter(|o| o.commodity == FOOD_PRICE_INDEX).collect();
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].unit, INDEX_UNIT);
        assert_eq!(index[0].market, "Tokyo");
        assert_eq!(index[0].date, d(1));
        assert!((index[0].usd_price - 3.0).abs() < 1e-12);
    }

    #[test]
    fn unselected_rows_are_excluded() {
        let table = ObservationTable::new(vec![
            obs(d(1), "Tokyo", "Rice", 2.0),
            obs(d(1), "Tokyo", "Milk", 10.0),
            obs(d(1), "Osaka", "Rice", 8.0),
        ]);
        let out = compute_index(&table, &["Tokyo"], &["Rice"]);

        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0].commodity, "Rice");
        assert_eq!(out.rows()[1].usd_price, 2.0);
    }

    #[test]
    fn one_index_row_per_date_and_market() {
        let table = ObservationTable::new(vec![
            obs(d(1), "Tokyo", "Rice", 2.0),
            obs(d(2), "Tokyo", "Rice", 3.0),
            obs(d(1), "Osaka", "Rice", 4.0),
            obs(d(1), "Osaka", "Wheat", 6.0),
        ]);
        let out = compute_index(&table, &["Tokyo", "Osaka"], &["Rice", "Wheat"]);
        let index: Vec<(NaiveDate, &str, f64)> = out
            .iter()
            .filter(|o| o.commodity == FOOD_PRICE_INDEX)
            .map(|o| (o.date, o.market.as_str(), o.usd_price))
            .collect();
        assert_eq!(index, vec![(d(1), "Osaka", 5.0), (d(1), "Tokyo", 2.0), (d(2), "Tokyo", 3.0)]);
    }

    #[test]
    fn empty_selection_returns_empty_table() {
        let table = ObservationTable::new(vec![obs(d(1), "Tokyo", "Rice", 2.0)]);
        let none: [&str; 0] = [];
        assert!(compute_index(&table, &none, &none).is_empty());
        assert!(compute_index(&table, &["Tokyo"], &none).is_empty());
    }
}
