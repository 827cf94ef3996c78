//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - table / summary exports (`export`)
//! - session store read/write (`session`)

pub mod export;
pub mod ingest;
pub mod session;

pub use export::*;
pub use ingest::*;
pub use session::*;
