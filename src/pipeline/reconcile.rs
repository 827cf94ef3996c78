//! Decide which per-commodity panels can be carried over from the previous
//! interaction and which need to be recomputed.
//!
//! A panel is reusable only when it was computed under the same country, the
//! same date range and the same set of markets. Under that scope every
//! commodity that was already selected keeps its panel; newly selected
//! commodities are recomputed. Any scope change recomputes everything.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{FilterParameters, WidgetState};

/// Per-commodity decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    /// Panel exists from the previous interaction and is carried over.
    Exists,
    /// Panel must be computed.
    New,
}

/// One layout slot, in `current.commodities` order.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelSlot<P> {
    Reuse { commodity: String, panel: P },
    Recompute { commodity: String },
}

impl<P> PanelSlot<P> {
    pub fn commodity(&self) -> &str {
        match self {
            PanelSlot::Reuse { commodity, .. } | PanelSlot::Recompute { commodity } => commodity,
        }
    }

    pub fn state(&self) -> PanelState {
        match self {
            PanelSlot::Reuse { .. } => PanelState::Exists,
            PanelSlot::Recompute { .. } => PanelState::New,
        }
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<P> {
    slots: Vec<PanelSlot<P>>,
}

impl<P> Reconciliation<P> {
    /// Slots in layout order (reused and recomputed interleaved).
    pub fn slots(&self) -> &[PanelSlot<P>] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<PanelSlot<P>> {
        self.slots
    }

    /// Commodities needing computation, in layout order.
    pub fn to_recompute(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|s| s.state() == PanelState::New)
            .map(PanelSlot::commodity)
            .collect()
    }

    /// Carried-over panels keyed by commodity.
    pub fn to_reuse(&self) -> BTreeMap<&str, &P> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                PanelSlot::Reuse { commodity, panel } => Some((commodity.as_str(), panel)),
                PanelSlot::Recompute { .. } => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<(&str, PanelState)> {
        self.slots.iter().map(|s| (s.commodity(), s.state())).collect()
    }
}

/// Whether panels computed under `prior` may be reused for `current`.
///
/// Country, date range and market set must all match; the geo-view toggle
/// is irrelevant.
pub fn same_scope(current: &FilterParameters, prior: &WidgetState) -> bool {
    let current_markets: BTreeSet<&str> = current.markets.iter().map(String::as_str).collect();
    let prior_markets: BTreeSet<&str> = prior.markets.iter().map(String::as_str).collect();

    current.country == prior.country && current.date_range == prior.date_range && current_markets == prior_markets
}

/// Per-commodity decisions for `current.commodities`, without panels.
pub fn panel_states(current: &FilterParameters, prior: Option<&WidgetState>) -> Vec<(String, PanelState)> {
    let reusable: BTreeSet<&str> = match prior {
        Some(prior) if same_scope(current, prior) => prior.commodities.iter().map(String::as_str).collect(),
        _ => BTreeSet::new(),
    };

    current
        .commodities
        .iter()
        .map(|c| {
            let state = if reusable.contains(c.as_str()) {
                PanelState::Exists
            } else {
                PanelState::New
            };
            (c.clone(), state)
        })
        .collect()
}

/// Reconcile current selections against the last committed state.
///
/// An absent `prior` (first render) recomputes everything. A commodity that
/// qualifies for reuse but has no entry in `existing` is recomputed.
pub fn reconcile<P: Clone>(
    current: &FilterParameters,
    prior: Option<&WidgetState>,
    existing: &BTreeMap<String, P>,
) -> Reconciliation<P> {
    let slots = panel_states(current, prior)
        .into_iter()
        .map(|(commodity, state)| match (state, existing.get(&commodity)) {
            (PanelState::Exists, Some(panel)) => PanelSlot::Reuse {
                commodity,
                panel: panel.clone(),
            },
            _ => PanelSlot::Recompute { commodity },
        })
        .collect();

    Reconciliation { slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DateRange;
    use chrono::NaiveDate;

    fn range(start_month: u32, end_month: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2021, start_month, 15).unwrap(),
            NaiveDate::from_ymd_opt(2022, end_month, 15).unwrap(),
        )
        .unwrap()
    }

    fn prior() -> WidgetState {
        WidgetState {
            geo_view: false,
            country: "Japan".to_string(),
            date_range: range(1, 6),
            commodities: vec!["Rice".to_string(), "Wheat".to_string()],
            markets: vec!["Tokyo".to_string()],
        }
    }

    fn panels() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Rice".to_string(), "rice-panel".to_string()),
            ("Wheat".to_string(), "wheat-panel".to_string()),
        ])
    }

    #[test]
    fn kept_commodity_is_reused_and_new_one_recomputed() {
        let current = FilterParameters::new("Japan", range(1, 6), ["Rice", "Milk"], ["Tokyo"]);
        let prior = prior();
        let out = reconcile(&current, Some(&prior), &panels());

        assert_eq!(out.states(), vec![("Rice", PanelState::Exists), ("Milk", PanelState::New)]);
        assert_eq!(out.to_recompute(), vec!["Milk"]);
        assert_eq!(out.to_reuse().get("Rice").map(|p| p.as_str()), Some("rice-panel"));
    }

    #[test]
    fn date_range_change_recomputes_everything() {
        let current = FilterParameters::new("Japan", range(2, 6), ["Rice", "Milk"], ["Tokyo"]);
        let prior = prior();
        let out = reconcile(&current, Some(&prior), &panels());

        assert_eq!(out.states(), vec![("Rice", PanelState::New), ("Milk", PanelState::New)]);
        assert!(out.to_reuse().is_empty());
    }

    #[test]
    fn country_or_market_change_recomputes_everything() {
        let prior = prior();
        let other_country = FilterParameters::new("Laos", range(1, 6), ["Rice"], ["Tokyo"]);
        assert_eq!(reconcile(&other_country, Some(&prior), &panels()).to_recompute(), vec!["Rice"]);

        let more_markets = FilterParameters::new("Japan", range(1, 6), ["Rice"], ["Tokyo", "Osaka"]);
        assert_eq!(reconcile(&more_markets, Some(&prior), &panels()).to_recompute(), vec!["Rice"]);
    }

    #[test]
    fn market_order_does_not_matter() {
        let mut prior = prior();
        prior.markets = vec!["Osaka".to_string(), "Tokyo".to_string()];
        let current = FilterParameters::new("Japan", range(1, 6), ["Wheat"], ["Tokyo", "Osaka"]);
        let out = reconcile(&current, Some(&prior), &panels());
        assert!(out.to_recompute().is_empty());
    }

    #[test]
    fn geo_toggle_is_ignored() {
        let mut prior = prior();
        prior.geo_view = true;
        let current = FilterParameters::new("Japan", range(1, 6), ["Rice"], ["Tokyo"]);
        assert!(reconcile(&current, Some(&prior), &panels()).to_recompute().is_empty());
    }

    #[test]
    fn absent_prior_recomputes_everything() {
        let current = FilterParameters::new("Japan", range(1, 6), ["Rice", "Wheat"], ["Tokyo"]);
        let out = reconcile(&current, None, &panels());
        assert_eq!(out.to_recompute(), vec!["Rice", "Wheat"]);
    }

    #[test]
    fn layout_follows_current_order() {
        let current = FilterParameters::new("Japan", range(1, 6), ["Milk", "Wheat", "Beans", "Rice"], ["Tokyo"]);
        let prior = prior();
        let out = reconcile(&current, Some(&prior), &panels());
        let order: Vec<&str> = out.slots().iter().map(PanelSlot::commodity).collect();
        assert_eq!(order, vec!["Milk", "Wheat", "Beans", "Rice"]);
        assert_eq!(out.to_recompute(), vec!["Milk", "Beans"]);
    }

    #[test]
    fn missing_existing_panel_falls_back_to_recompute() {
        let current = FilterParameters::new("Japan", range(1, 6), ["Rice"], ["Tokyo"]);
        let prior = prior();
        let empty: BTreeMap<String, String> = BTreeMap::new();
        assert_eq!(reconcile(&current, Some(&prior), &empty).to_recompute(), vec!["Rice"]);
    }
}
