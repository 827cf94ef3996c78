use std::fs;

use food_price_tracker::app::pipeline::{DashboardSession, Interaction, load_country};
use food_price_tracker::data::{CachedSource, CountrySource, CsvDirectorySource, SampleSource};
use food_price_tracker::domain::{CleanConfig, DataFingerprint, FilterParameters, SourceKind};
use food_price_tracker::io::{read_session_json, write_session_json, write_table_csv};
use food_price_tracker::pipeline::PanelState;
use std::time::Duration;

fn sample_fingerprint(seed: u64, clean: CleanConfig) -> DataFingerprint {
    DataFingerprint {
        source: SourceKind::Sample,
        seed: Some(seed),
        data_dir: None,
        base_url: None,
        clean,
    }
}

/// Export a synthetic country to a CSV directory and read it back through
/// the directory source; cleaning must give the same table.
#[test]
fn csv_directory_matches_sample_source() {
    let dir = tempfile::tempdir().unwrap();
    let sample = SampleSource::new(99);
    let raw = sample.fetch_country_observations("Ukraine").unwrap();
    write_table_csv(&dir.path().join("Ukraine.csv"), &raw).unwrap();

    let from_csv = load_country(&CsvDirectorySource::new(dir.path()), "Ukraine", &CleanConfig::default()).unwrap();
    let from_sample = load_country(&sample, "Ukraine", &CleanConfig::default()).unwrap();
    assert_eq!(from_csv.clean, from_sample.clean);
    assert_eq!(from_csv.options, from_sample.options);
}

#[test]
fn session_file_carries_panels_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let source = CachedSource::new(SampleSource::new(4), Duration::from_secs(600));
    let fingerprint = sample_fingerprint(4, CleanConfig::default());

    let loaded = load_country(&source, "Tanzania", &CleanConfig::default()).unwrap();
    let params = loaded.options.default_params("Tanzania").unwrap();

    // First run: nothing stored yet.
    let mut session = DashboardSession::from_session_file(read_session_json(&session_path).unwrap(), &fingerprint);
    let Interaction::Chart(first) = session.interact(&loaded.clean, &params, false).unwrap() else {
        panic!("expected chart view");
    };
    assert!(first.states.iter().all(|(_, s)| *s == PanelState::New));
    write_session_json(&session_path, &session.to_session_file()).unwrap();

    // Second run drops one commodity and adds another.
    let loaded = load_country(&source, "Tanzania", &CleanConfig::default()).unwrap();
    let commodities = vec![
        params.commodities[1].clone(),
        loaded.options.commodity_options[3].clone(),
    ];
    let next = FilterParameters::new("Tanzania", params.date_range, commodities, params.markets.clone());
    let mut session = DashboardSession::from_session_file(read_session_json(&session_path).unwrap(), &fingerprint);
    let Interaction::Chart(second) = session.interact(&loaded.clean, &next, false).unwrap() else {
        panic!("expected chart view");
    };

    assert_eq!(second.states[0], (params.commodities[1].clone(), PanelState::Exists));
    assert_eq!(second.states[1].1, PanelState::New);
    assert_eq!(second.panels[0].commodity, first.panels[1].commodity);
    assert_eq!(second.panels[0].series.len(), first.panels[1].series.len());
    assert!(!session.panels().contains_key(&params.commodities[0]));
    assert_eq!(source.inner().fetch_country_index().unwrap().len(), 10);
}

#[test]
fn changed_thresholds_recompute_every_panel() {
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let source = SampleSource::new(21);
    let loose = CleanConfig {
        date_abundance_threshold: 0.0,
        market_abundance_threshold: 0.0,
    };
    let strict = CleanConfig::default();

    // Stricter cleaning keeps a subset, so these selections fit both tables.
    let strict_loaded = load_country(&source, "Mexico", &strict).unwrap();
    let params = strict_loaded.options.default_params("Mexico").unwrap();

    let loose_loaded = load_country(&source, "Mexico", &loose).unwrap();
    let mut session =
        DashboardSession::from_session_file(read_session_json(&session_path).unwrap(), &sample_fingerprint(21, loose));
    let Interaction::Chart(first) = session.interact(&loose_loaded.clean, &params, false).unwrap() else {
        panic!("expected chart view");
    };
    assert!(first.states.iter().all(|(_, s)| *s == PanelState::New));
    write_session_json(&session_path, &session.to_session_file()).unwrap();

    // Same selections, other thresholds: nothing stored may be reused.
    let strict_fingerprint = sample_fingerprint(21, strict);
    let mut session =
        DashboardSession::from_session_file(read_session_json(&session_path).unwrap(), &strict_fingerprint);
    assert!(session.panels().is_empty());
    let Interaction::Chart(view) = session.interact(&strict_loaded.clean, &params, false).unwrap() else {
        panic!("expected chart view");
    };
    assert_eq!(view.states.len(), params.commodities.len());
    assert!(view.states.iter().all(|(_, s)| *s == PanelState::New));

    write_session_json(&session_path, &session.to_session_file()).unwrap();
    let stored = read_session_json(&session_path).unwrap();
    assert_eq!(stored.fingerprint, Some(strict_fingerprint));
}

#[test]
fn geo_view_reports_each_selected_market() {
    let loaded = load_country(&SampleSource::new(8), "Syria", &CleanConfig::default()).unwrap();
    let params = loaded.options.default_params("Syria").unwrap();
    let mut session = DashboardSession::new(sample_fingerprint(8, CleanConfig::default()));

    let Interaction::Geo(view) = session.interact(&loaded.clean, &params, true).unwrap() else {
        panic!("expected geo view");
    };
    let markets: Vec<&str> = view.markers.iter().map(|m| m.market.as_str()).collect();
    assert_eq!(markets, params.markets.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(view.markers.iter().all(|m| m.date == params.date_range.end));
    assert!(session.state().is_none());
}

#[test]
fn unreadable_session_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    fs::write(&path, "{not json").unwrap();
    let err = read_session_json(&path).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}
