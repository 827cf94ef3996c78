//! Export computed tables and summaries.
//!
//! Table CSVs use the same column layout the ingest accepts, so a cleaned
//! export can be fed back in as input.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{ObservationTable, SummaryStat};
use crate::error::AppError;

const TABLE_HEADER: [&str; 7] = ["date", "market", "latitude", "longitude", "commodity", "unit", "usdprice"];

/// Write a table as CSV to a file.
pub fn write_table_csv(path: &Path, table: &ObservationTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_table(file, table)
}

/// Write a table as CSV to any writer.
pub fn write_table<W: Write>(out: W, table: &ObservationTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(TABLE_HEADER)
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for o in table {
        writer
            .write_record([
                o.date.to_string(),
                o.market.clone(),
                o.latitude.to_string(),
                o.longitude.to_string(),
                o.commodity.clone(),
                o.unit.clone(),
                o.usd_price.to_string(),
            ])
            .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write summary stats as pretty JSON.
pub fn write_summary_json(path: &Path, stats: &[SummaryStat]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, stats)
        .map_err(|e| AppError::io(format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}
