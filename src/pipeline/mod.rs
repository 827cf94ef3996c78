//! The aggregation core.
//!
//! Pure functions over already-fetched tables:
//!
//! - `clean`: dedup, coverage filters, gap filling
//! - `index`: Food Price Index rows
//! - `summary`: latest / MoM / YoY per commodity
//! - `reconcile`: reuse vs recompute per commodity panel
//! - `panels`: the computed data behind each panel
//! - `options`: default widget values for a loaded country

pub mod clean;
pub mod index;
pub mod options;
pub mod panels;
pub mod reconcile;
pub mod summary;

pub use clean::{clean, clean_default};
pub use index::compute_index;
pub use options::WidgetOptions;
pub use panels::{CommodityPanel, GeoMarker, IndexPanel, SeriesPoint, build_commodity_panels, build_index_panel, geo_snapshot};
pub use reconcile::{PanelSlot, PanelState, Reconciliation, reconcile};
pub use summary::compute_summary;
