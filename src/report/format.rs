//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

use crate::data::CountryEntry;
use crate::domain::SummaryStat;
use crate::pipeline::{CommodityPanel, GeoMarker, IndexPanel, PanelState, WidgetOptions};
use crate::report::CleanReport;

/// Format the country index.
pub fn format_countries(entries: &[CountryEntry]) -> String {
    let mut out = String::new();
    out.push_str(&header_line(&format!(
        "{:<16} {:<5} {:<12} {:<12} {:<40}",
        "country", "iso3", "start", "end", "dataset"
    )));

    for e in entries {
        out.push_str(&row_line(&format!(
            "{:<16} {:<5} {:<12} {:<12} {:<40}",
            truncate(&e.country, 16),
            e.iso3,
            fmt_opt(e.start_date),
            fmt_opt(e.end_date),
            truncate(&e.dataset_id, 40),
        )));
    }
    out
}

/// Format the cleaning report plus the default widget options.
pub fn format_clean_report(country: &str, report: &CleanReport, options: Option<&WidgetOptions>) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== fpt - {country} ===\n"));
    out.push_str(&format!(
        "Rows: raw={} | clean={}\n",
        report.raw_rows, report.clean_rows
    ));
    out.push_str(&format!(
        "Markets: raw={} | clean={}\n",
        report.raw_markets, report.clean_markets
    ));
    out.push_str(&format!(
        "Commodities: raw={} | clean={}\n",
        report.raw_commodities, report.clean_commodities
    ));
    out.push_str(&format!(
        "Dates: n={} | [{}, {}]\n",
        report.dates,
        fmt_opt(report.first_date),
        fmt_opt(report.last_date)
    ));

    if let Some(o) = options {
        out.push_str("\nDefault selection:\n");
        out.push_str(&format!(
            "- range : [{:.3}, {:.3}] of [{:.3}, {:.3}]\n",
            o.range_labels.0, o.range_labels.1, o.min_label, o.max_label
        ));
        out.push_str(&format!("- commodities: {}\n", o.commodity_selection.join(", ")));
        out.push_str(&format!("- markets    : {}\n", o.market_selection.join(", ")));
    }

    out
}

/// Format summary stats as a table.
pub fn format_summary_table(stats: &[SummaryStat]) -> String {
    let mut out = String::new();
    out.push_str(&header_line(&format!(
        "{:<24} {:<8} {:<12} {:>10} {:>9} {:>9}",
        "commodity", "unit", "date", "usd", "mom", "yoy"
    )));

    for s in stats {
        out.push_str(&row_line(&format!(
            "{:<24} {:<8} {:<12} {:>10} {:>9} {:>9}",
            truncate(&s.commodity, 24),
            truncate(s.unit.as_deref().unwrap_or("-"), 8),
            fmt_opt(s.latest_date),
            s.latest_price.map_or_else(|| "-".to_string(), |p| format!("{p:.2}")),
            fmt_pct(s.mom_pct_change),
            fmt_pct(s.yoy_pct_change),
        )));
    }
    out
}

/// Format the index panel and the commodity panels with their reuse state.
pub fn format_chart_view(index: &IndexPanel, panels: &[CommodityPanel], states: &[(String, PanelState)]) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} {}\n", index.title, index.subtitle));
    out.push_str(&format_summary_table(std::slice::from_ref(&index.panel.summary)));
    out.push('\n');

    out.push_str("Panels:\n");
    out.push_str(&header_line(&format!("{:<24} {:<7} {:>7}", "commodity", "state", "points")));
    for (commodity, state) in states {
        let points = panels
            .iter()
            .find(|p| &p.commodity == commodity)
            .map_or(0, |p| p.series.len());
        let state = match state {
            PanelState::Exists => "reused",
            PanelState::New => "new",
        };
        out.push_str(&row_line(&format!("{:<24} {:<7} {:>7}", truncate(commodity, 24), state, points)));
    }
    out.push('\n');

    let stats: Vec<SummaryStat> = panels.iter().map(|p| p.summary.clone()).collect();
    out.push_str(&format_summary_table(&stats));
    out
}

/// Format the geographic view: latest index value per market.
pub fn format_geo_view(index: &IndexPanel, markers: &[GeoMarker]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", index.title, index.subtitle));
    out.push_str(&header_line(&format!(
        "{:<24} {:>9} {:>10} {:<12} {:>10}",
        "market", "lat", "lon", "date", "index"
    )));

    for m in markers {
        out.push_str(&row_line(&format!(
            "{:<24} {:>9.4} {:>10.4} {:<12} {:>10.3}",
            truncate(&m.market, 24),
            m.latitude,
            m.longitude,
            m.date,
            m.index_value,
        )));
    }
    out
}

fn header_line(header: &str) -> String {
    let header = header.trim_end();
    let rule: String = header
        .chars()
        .map(|c| if c == ' ' { ' ' } else { '-' })
        .collect();
    format!("{header}\n{}\n", rule.trim_end())
}

fn row_line(row: &str) -> String {
    format!("{}\n", row.trim_end())
}

fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:+.1}%", v * 100.0))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
