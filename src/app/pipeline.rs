//! Shared dashboard workflow used by every CLI subcommand.
//!
//! Keeping this in one place avoids duplicating the core flow:
//! fetch -> clean -> widget options -> (index + reconcile + panels)
//!
//! The subcommands then only deal with presentation and exports.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::data::CountrySource;
use crate::domain::{CleanConfig, DataFingerprint, FilterParameters, ObservationTable, WidgetState};
use crate::error::AppError;
use crate::io::session::SessionFile;
use crate::pipeline::{
    CommodityPanel, GeoMarker, IndexPanel, PanelSlot, PanelState, WidgetOptions, build_commodity_panels,
    build_index_panel, clean, geo_snapshot, reconcile,
};

/// A country's tables after fetch and cleaning.
#[derive(Debug, Clone)]
pub struct LoadedCountry {
    pub country: String,
    pub raw: ObservationTable,
    pub clean: ObservationTable,
    pub options: WidgetOptions,
}

/// Fetch a country table, clean it and derive the widget options.
pub fn load_country(
    source: &dyn CountrySource,
    country: &str,
    config: &CleanConfig,
) -> Result<LoadedCountry, AppError> {
    config.validate()?;
    let raw = source.fetch_country_observations(country)?;
    let clean = clean(&raw, config);
    info!(country, raw = raw.len(), clean = clean.len(), "country table ready");

    let options = WidgetOptions::from_table(&clean)?;
    Ok(LoadedCountry {
        country: country.to_string(),
        raw,
        clean,
        options,
    })
}

/// Chart-view output: index panel plus one panel per selected commodity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub index: IndexPanel,
    /// In selection order.
    pub panels: Vec<CommodityPanel>,
    pub states: Vec<(String, PanelState)>,
}

/// Geo-view output: index panel plus one marker per selected market.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoView {
    pub index: IndexPanel,
    pub markers: Vec<GeoMarker>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Chart(ChartView),
    Geo(GeoView),
}

/// The dashboard's mutable state between interactions.
///
/// Holds the last committed [`WidgetState`] and the panels computed under it,
/// tagged with the data they were computed from.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    fingerprint: DataFingerprint,
    state: Option<WidgetState>,
    panels: BTreeMap<String, CommodityPanel>,
}

impl DashboardSession {
    pub fn new(fingerprint: DataFingerprint) -> Self {
        Self {
            fingerprint,
            state: None,
            panels: BTreeMap::new(),
        }
    }

    /// Restore a stored session; state saved under other data is dropped.
    pub fn from_session_file(file: SessionFile, fingerprint: &DataFingerprint) -> Self {
        let file = file.retain_if_matching(fingerprint);
        Self {
            fingerprint: fingerprint.clone(),
            state: file.state,
            panels: file.panels,
        }
    }

    pub fn to_session_file(&self) -> SessionFile {
        SessionFile::new(Some(self.fingerprint.clone()), self.state.clone(), self.panels.clone())
    }

    pub fn state(&self) -> Option<&WidgetState> {
        self.state.as_ref()
    }

    pub fn panels(&self) -> &BTreeMap<String, CommodityPanel> {
        &self.panels
    }

    /// Handle one change of the widget selections.
    ///
    /// Geo view leaves the committed state alone. Chart view reuses panels
    /// whose scope is unchanged, computes the rest, then commits.
    pub fn interact(
        &mut self,
        clean: &ObservationTable,
        params: &FilterParameters,
        geo_view: bool,
    ) -> Result<Interaction, AppError> {
        if params.has_empty_selection() {
            return Err(AppError::EmptySelection {
                commodities: params.commodities.len(),
                markets: params.markets.len(),
            });
        }

        let index = build_index_panel(clean, params);
        if geo_view {
            let markers = geo_snapshot(clean, params);
            return Ok(Interaction::Geo(GeoView { index, markers }));
        }

        let plan = reconcile(params, self.state.as_ref(), &self.panels);
        let states: Vec<(String, PanelState)> = plan
            .states()
            .into_iter()
            .map(|(c, s)| (c.to_string(), s))
            .collect();
        let to_recompute = plan.to_recompute();
        debug!(
            recompute = to_recompute.len(),
            reuse = states.len() - to_recompute.len(),
            "reconciled panels"
        );
        let mut fresh = build_commodity_panels(clean, params, to_recompute.as_slice());

        let mut panels = Vec::with_capacity(states.len());
        for slot in plan.into_slots() {
            match slot {
                PanelSlot::Reuse { panel, .. } => panels.push(panel),
                PanelSlot::Recompute { commodity } => {
                    if let Some(panel) = fresh.remove(&commodity) {
                        panels.push(panel);
                    }
                }
            }
        }

        self.state = Some(WidgetState::from_params(params, false));
        self.panels = panels.iter().map(|p| (p.commodity.clone(), p.clone())).collect();

        Ok(Interaction::Chart(ChartView { index, panels, states }))
    }
}
