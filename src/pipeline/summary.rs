//! Latest price plus month-over-month / year-over-year changes.
//!
//! Lags count distinct dates in a commodity's series, not calendar months:
//! on a series with missing months the "1 month ago" point is simply the
//! previous observed date. Cleaned tables are gap-filled, so in practice the
//! series is monthly.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{DateRange, ObservationTable, SummaryStat};

/// Periods back for month-over-month.
pub const MOM_LAG: usize = 1;
/// Periods back for year-over-year.
pub const YOY_LAG: usize = 12;

/// One [`SummaryStat`] per requested commodity, in request order.
///
/// Commodities with no rows inside the selection still get an entry with
/// every value set to `None`.
pub fn compute_summary<M, C>(
    table: &ObservationTable,
    date_range: DateRange,
    markets: &[M],
    commodities: &[C],
) -> Vec<SummaryStat>
where
    M: AsRef<str>,
    C: AsRef<str>,
{
    let market_set: BTreeSet<&str> = markets.iter().map(AsRef::as_ref).collect();
    let commodity_set: BTreeSet<&str> = commodities.iter().map(AsRef::as_ref).collect();

    // (commodity, unit) -> date -> (sum, count); averaged across markets below.
    let mut grouped: BTreeMap<(&str, &str), BTreeMap<NaiveDate, (f64, usize)>> = BTreeMap::new();
    for o in table.iter() {
        if !date_range.contains(o.date)
            || !market_set.contains(o.market.as_str())
            || !commodity_set.contains(o.commodity.as_str())
        {
            continue;
        }
        let cell = grouped
            .entry((o.commodity.as_str(), o.unit.as_str()))
            .or_default()
            .entry(o.date)
            .or_insert((0.0, 0));
        cell.0 += o.usd_price;
        cell.1 += 1;
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(commodities.len());
    for commodity in commodities {
        let commodity = commodity.as_ref();
        if !seen.insert(commodity) {
            continue;
        }

        // The unit whose series reaches furthest wins; ties by unit order.
        let best = grouped
            .iter()
            .filter(|((c, _), series)| *c == commodity && !series.is_empty())
            .max_by(|((_, ua), sa), ((_, ub), sb)| {
                let la = sa.keys().next_back();
                let lb = sb.keys().next_back();
                la.cmp(&lb).then_with(|| ub.cmp(ua))
            });

        let Some(((_, unit), series)) = best else {
            debug!(commodity, "no rows inside selection; summary is empty");
            out.push(SummaryStat::empty(commodity));
            continue;
        };

        let points: Vec<(NaiveDate, f64)> = series
            .iter()
            .map(|(date, (sum, count))| (*date, sum / *count as f64))
            .collect();
        out.push(summarize_series(commodity, unit, &points));
    }

    out
}

/// Summarize one date-ascending series.
fn summarize_series(commodity: &str, unit: &str, points: &[(NaiveDate, f64)]) -> SummaryStat {
    let Some(&(latest_date, latest_price)) = points.last() else {
        return SummaryStat::empty(commodity);
    };

    let mom = pct_change(points, MOM_LAG);
    let yoy = pct_change(points, YOY_LAG);
    if mom.is_none() || yoy.is_none() {
        debug!(
            commodity,
            periods = points.len(),
            mom = mom.is_some(),
            yoy = yoy.is_some(),
            "insufficient history for period-over-period change"
        );
    }

    SummaryStat {
        commodity: commodity.to_string(),
        unit: Some(unit.to_string()),
        latest_date: Some(latest_date),
        latest_price: Some(latest_price),
        mom_pct_change: mom,
        yoy_pct_change: yoy,
    }
}

/// `latest / value[lag periods back] - 1`, or `None` without enough history
/// or when the result is not finite.
fn pct_change(points: &[(NaiveDate, f64)], lag: usize) -> Option<f64> {
    let n = points.len();
    if n <= lag {
        return None;
    }
    let latest = points[n - 1].1;
    let base = points[n - 1 - lag].1;
    let change = latest / base - 1.0;
    change.is_finite().then_some(change)
}
