//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and environment into a `DashboardConfig`
//! - sets up logging
//! - fetches and cleans country data
//! - runs summaries / dashboard interactions
//! - prints reports and writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CleanArgs, Command, DashboardArgs, SelectionArgs, SourceArgs, ThresholdArgs};
use crate::data::{CountrySource, cache, hdx, open_source};
use crate::domain::date_label::to_date;
use crate::domain::{CleanConfig, DashboardConfig, DateRange, FilterParameters};
use crate::error::AppError;
use crate::pipeline::{WidgetOptions, compute_index, compute_summary};
use crate::report::CleanReport;

pub mod pipeline;

use pipeline::{DashboardSession, Interaction, LoadedCountry, load_country};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "FPT_LOG";

/// Entry point for the `fpt` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Countries(args) => handle_countries(&args),
        Command::Clean(args) => handle_clean(&args),
        Command::Summary(args) => handle_summary(&args),
        Command::Dashboard(args) => handle_dashboard(&args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_countries(args: &SourceArgs) -> Result<(), AppError> {
    let config = dashboard_config(args, None)?;
    let source = open_source(&config)?;
    let index = source.fetch_country_index()?;
    print!("{}", crate::report::format_countries(&index));
    Ok(())
}

fn handle_clean(args: &CleanArgs) -> Result<(), AppError> {
    let config = dashboard_config(&args.source, Some(&args.thresholds))?;
    let source = open_source(&config)?;
    let raw = source.fetch_country_observations(&args.country)?;
    let clean = crate::pipeline::clean(&raw, &config.clean);

    let report = CleanReport::from_tables(&raw, &clean);
    // An empty clean table has no options; the report still prints.
    let options = WidgetOptions::from_table(&clean).ok();
    println!(
        "{}",
        crate::report::format_clean_report(&args.country, &report, options.as_ref())
    );

    if let Some(path) = &args.export {
        crate::io::export::write_table_csv(path, &clean)?;
        info!(path = %path.display(), rows = clean.len(), "wrote cleaned table");
    }
    Ok(())
}

fn handle_summary(args: &SelectionArgs) -> Result<(), AppError> {
    let (loaded, params, _) = load_selection(args)?;
    let stats = compute_summary(
        &loaded.clean,
        params.date_range,
        params.markets.as_slice(),
        params.commodities.as_slice(),
    );
    print!("{}", crate::report::format_summary_table(&stats));

    if let Some(path) = &args.export_json {
        crate::io::export::write_summary_json(path, &stats)?;
    }
    Ok(())
}

fn handle_dashboard(args: &DashboardArgs) -> Result<(), AppError> {
    let (loaded, params, config) = load_selection(&args.selection)?;

    let stored = crate::io::session::read_session_json(&args.state)?;
    let mut session = DashboardSession::from_session_file(stored, &config.fingerprint());

    match session.interact(&loaded.clean, &params, args.geo)? {
        Interaction::Chart(view) => {
            print!(
                "{}",
                crate::report::format_chart_view(&view.index, &view.panels, &view.states)
            );
            crate::io::session::write_session_json(&args.state, &session.to_session_file())?;
        }
        Interaction::Geo(view) => {
            print!("{}", crate::report::format_geo_view(&view.index, &view.markers));
        }
    }

    if let Some(path) = &args.export_index {
        export_index(path, &loaded, &params)?;
    }
    Ok(())
}

fn export_index(path: &Path, loaded: &LoadedCountry, params: &FilterParameters) -> Result<(), AppError> {
    let with_index = compute_index(&loaded.clean, params.markets.as_slice(), params.commodities.as_slice());
    let index_rows = with_index.filter(|o| o.commodity == crate::domain::FOOD_PRICE_INDEX);
    crate::io::export::write_table_csv(path, &index_rows)
}

fn load_selection(args: &SelectionArgs) -> Result<(LoadedCountry, FilterParameters, DashboardConfig), AppError> {
    let config = dashboard_config(&args.source, Some(&args.thresholds))?;
    let source = open_source(&config)?;
    let loaded = load_country(&source, &args.country, &config.clean)?;
    let params = selection_params(args, &loaded.options)?;
    Ok((loaded, params, config))
}

/// Resolve CLI selections against the data-derived defaults.
pub fn selection_params(args: &SelectionArgs, options: &WidgetOptions) -> Result<FilterParameters, AppError> {
    let defaults = options.default_params(&args.country)?;

    let start = match args.from {
        Some(label) => to_date(label)?,
        None => defaults.date_range.start,
    };
    let end = match args.to {
        Some(label) => to_date(label)?,
        None => defaults.date_range.end,
    };
    let range = DateRange::new(start, end)?;

    let commodities = if args.commodities.is_empty() {
        defaults.commodities
    } else {
        args.commodities.clone()
    };
    let markets = if args.markets.is_empty() {
        defaults.markets
    } else {
        args.markets.clone()
    };

    Ok(FilterParameters::new(args.country.clone(), range, commodities, markets))
}

/// Build the run configuration from CLI flags and environment.
pub fn dashboard_config(source: &SourceArgs, thresholds: Option<&ThresholdArgs>) -> Result<DashboardConfig, AppError> {
    let clean = match thresholds {
        Some(t) => CleanConfig {
            date_abundance_threshold: t.date_threshold,
            market_abundance_threshold: t.market_threshold,
        },
        None => CleanConfig::default(),
    };
    clean.validate()?;

    let cache_ttl_secs = match std::env::var("FPT_CACHE_TTL_SECS") {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| AppError::invalid(format!("Invalid FPT_CACHE_TTL_SECS '{v}': expected seconds.")))?,
        Err(_) => cache::DEFAULT_TTL_SECS,
    };

    Ok(DashboardConfig {
        source: source.source,
        data_dir: source.data_dir.clone(),
        hdx_base_url: std::env::var("HDX_BASE_URL").unwrap_or_else(|_| hdx::DEFAULT_BASE_URL.to_string()),
        cache_ttl_secs,
        sample_seed: source.seed,
        clean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleSource;
    use crate::domain::SourceKind;

    fn sample_args() -> SourceArgs {
        SourceArgs {
            source: SourceKind::Sample,
            data_dir: None,
            seed: 5,
        }
    }

    fn selection(from: Option<f64>, to: Option<f64>, commodities: &[&str]) -> SelectionArgs {
        SelectionArgs {
            source: sample_args(),
            thresholds: ThresholdArgs {
                date_threshold: 0.5,
                market_threshold: 0.7,
            },
            country: "Pakistan".to_string(),
            from,
            to,
            commodities: commodities.iter().map(|c| c.to_string()).collect(),
            markets: Vec::new(),
            export_json: None,
        }
    }

    #[test]
    fn config_rejects_bad_thresholds() {
        let bad = ThresholdArgs {
            date_threshold: 1.5,
            market_threshold: 0.7,
        };
        assert!(matches!(
            dashboard_config(&sample_args(), Some(&bad)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn omitted_selections_use_defaults() {
        let loaded = load_country(&SampleSource::new(5), "Pakistan", &CleanConfig::default()).unwrap();
        let params = selection_params(&selection(None, None, &[]), &loaded.options).unwrap();
        assert_eq!(params, loaded.options.default_params("Pakistan").unwrap());
    }

    #[test]
    fn explicit_selections_override_defaults() {
        let loaded = load_country(&SampleSource::new(5), "Pakistan", &CleanConfig::default()).unwrap();
        let params = selection_params(&selection(Some(2023.0), Some(2023.5), &["Sugar"]), &loaded.options).unwrap();
        assert_eq!(params.commodities, vec!["Sugar"]);
        assert_eq!(params.date_range.start, chrono::NaiveDate::from_ymd_opt(2023, 1, 15).unwrap());
        assert_eq!(params.date_range.end, chrono::NaiveDate::from_ymd_opt(2023, 7, 15).unwrap());
        assert_eq!(params.markets, loaded.options.market_selection);
    }

    #[test]
    fn reversed_labels_are_rejected() {
        let loaded = load_country(&SampleSource::new(5), "Pakistan", &CleanConfig::default()).unwrap();
        assert!(selection_params(&selection(Some(2024.0), Some(2023.0), &[]), &loaded.options).is_err());
    }
}
