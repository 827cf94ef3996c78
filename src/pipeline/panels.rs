//! Computed panel data.
//!
//! A panel is the data behind one visual unit: the summary figure plus the
//! per-market price lines. Panels are plain values so the reconciler can
//! carry them over unchanged; turning them into charts is up to the renderer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{FOOD_PRICE_INDEX, FilterParameters, ObservationTable, SummaryStat};
use crate::pipeline::index::compute_index;
use crate::pipeline::summary::compute_summary;

/// One point of a per-market price line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub market: String,
    pub usd_price: f64,
}

/// Summary figure + line series for one commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityPanel {
    pub commodity: String,
    pub summary: SummaryStat,
    pub series: Vec<SeriesPoint>,
}

/// The Food Price Index overview panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPanel {
    pub title: String,
    pub subtitle: String,
    pub panel: CommodityPanel,
}

/// Latest index value of one market (geo view).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMarker {
    pub market: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDate,
    pub index_value: f64,
}

/// Build panels for `commodities` under the scope of `params`.
pub fn build_commodity_panels<C: AsRef<str>>(
    table: &ObservationTable,
    params: &FilterParameters,
    commodities: &[C],
) -> BTreeMap<String, CommodityPanel> {
    let summaries = compute_summary(table, params.date_range, params.markets.as_slice(), commodities);

    summaries
        .into_iter()
        .map(|summary| {
            let series = series_for(table, params, &summary.commodity);
            let panel = CommodityPanel {
                commodity: summary.commodity.clone(),
                summary,
                series,
            };
            (panel.commodity.clone(), panel)
        })
        .collect()
}

/// Food Price Index over the selected commodities and markets.
pub fn build_index_panel(clean: &ObservationTable, params: &FilterParameters) -> IndexPanel {
    let with_index = compute_index(clean, params.markets.as_slice(), params.commodities.as_slice());
    let panel = build_commodity_panels(&with_index, params, &[FOOD_PRICE_INDEX])
        .remove(FOOD_PRICE_INDEX)
        .unwrap_or_else(|| CommodityPanel {
            commodity: FOOD_PRICE_INDEX.to_string(),
            summary: SummaryStat::empty(FOOD_PRICE_INDEX),
            series: Vec::new(),
        });

    IndexPanel {
        title: FOOD_PRICE_INDEX.to_string(),
        subtitle: format!("(Arithmetic mean of {})", params.commodities.join(", ")),
        panel,
    }
}

/// Latest in-range index value per selected market, in market selection order.
pub fn geo_snapshot(clean: &ObservationTable, params: &FilterParameters) -> Vec<GeoMarker> {
    let with_index = compute_index(clean, params.markets.as_slice(), params.commodities.as_slice());

    let mut latest: BTreeMap<&str, GeoMarker> = BTreeMap::new();
    for o in with_index.iter() {
        if o.commodity != FOOD_PRICE_INDEX || !params.date_range.contains(o.date) {
            continue;
        }
        let newer = latest.get(o.market.as_str()).is_none_or(|m| o.date > m.date);
        if newer {
            latest.insert(
                o.market.as_str(),
                GeoMarker {
                    market: o.market.clone(),
                    latitude: o.latitude,
                    longitude: o.longitude,
                    date: o.date,
                    index_value: o.usd_price,
                },
            );
        }
    }

    params
        .markets
        .iter()
        .filter_map(|m| latest.remove(m.as_str()))
        .collect()
}

fn series_for(table: &ObservationTable, params: &FilterParameters, commodity: &str) -> Vec<SeriesPoint> {
    let markets = params.market_set();
    let mut series: Vec<SeriesPoint> = table
        .iter()
        .filter(|o| {
            o.commodity == commodity && params.date_range.contains(o.date) && markets.contains(o.market.as_str())
        })
        .map(|o| SeriesPoint {
            date: o.date,
            market: o.market.clone(),
            usd_price: o.usd_price,
        })
        .collect();
    series.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.market.cmp(&b.market)));
    series
}
