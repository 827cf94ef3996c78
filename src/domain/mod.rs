//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observation rows and tables (`Observation`, `ObservationTable`)
//! - user selections and their persisted snapshot (`FilterParameters`, `WidgetState`)
//! - computed outputs (`SummaryStat`)
//! - the fractional-year slider codec (`date_label`)

pub mod date_label;
pub mod types;

pub use types::*;
