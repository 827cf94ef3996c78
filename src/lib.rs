//! `food-price-tracker` library crate.
//!
//! The binary (`fpt`) is a thin wrapper around this library so that:
//!
//! - the cleaning / index / summary core is testable without spawning processes
//! - the dashboard controller can be driven from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod report;
