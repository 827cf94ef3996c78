//! Command-line parsing for the food price tracker.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the cleaning/index/summary code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::SourceKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fpt", version, about = "Food price dashboard pipeline (WFP data via HDX)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the countries available from the selected source.
    Countries(SourceArgs),
    /// Fetch and clean a country table; print counts and optionally export CSV.
    Clean(CleanArgs),
    /// Print latest price and MoM/YoY changes for the selected commodities.
    Summary(SelectionArgs),
    /// Run one dashboard interaction against a persisted session.
    ///
    /// Panels whose scope is unchanged since the last run are reused from the
    /// session file instead of being recomputed.
    Dashboard(DashboardArgs),
}

/// Where to read country data from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Data source.
    #[arg(long, value_enum, default_value_t = SourceKind::Hdx)]
    pub source: SourceKind,

    /// Directory of `<Country>.csv` files (required for `--source csv`).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Random seed for `--source sample`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Cleaning thresholds.
#[derive(Debug, Args, Clone)]
pub struct ThresholdArgs {
    /// Minimum share of dates a (market, commodity) pair must cover.
    #[arg(long, default_value_t = 0.5)]
    pub date_threshold: f64,

    /// Minimum share of markets a commodity must appear in.
    #[arg(long, default_value_t = 0.7)]
    pub market_threshold: f64,
}

#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Country name as listed by `fpt countries`.
    #[arg(short = 'c', long)]
    pub country: String,

    /// Export the cleaned table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// A country plus widget selections. Omitted selections use the defaults
/// derived from the data (last two years, two most frequent of each).
#[derive(Debug, Args, Clone)]
pub struct SelectionArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Country name as listed by `fpt countries`.
    #[arg(short = 'c', long)]
    pub country: String,

    /// Range start as a date label (e.g. 2021.5 = July 2021).
    #[arg(long, value_name = "LABEL", allow_negative_numbers = true)]
    pub from: Option<f64>,

    /// Range end as a date label.
    #[arg(long, value_name = "LABEL", allow_negative_numbers = true)]
    pub to: Option<f64>,

    /// Commodity to include (repeatable).
    #[arg(long = "commodity", value_name = "NAME")]
    pub commodities: Vec<String>,

    /// Market to include (repeatable).
    #[arg(long = "market", value_name = "NAME")]
    pub markets: Vec<String>,

    /// Export the summary stats to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Session file holding the last committed selections and panels.
    #[arg(long, value_name = "JSON", default_value = "fpt-session.json")]
    pub state: PathBuf,

    /// Show the geographic view instead of the commodity charts.
    #[arg(long)]
    pub geo: bool,

    /// Export the Food Price Index rows to CSV.
    #[arg(long = "export-index", value_name = "CSV")]
    pub export_index: Option<PathBuf>,
}
