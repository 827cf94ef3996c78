//! CSV ingest and normalization.
//!
//! This module turns a WFP food price CSV (as published on HDX, or a local
//! export) into an `ObservationTable`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: rows keep file order
//! - **Separation of concerns**: no cleaning logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::{Observation, ObservationTable};
use crate::error::AppError;

const REQUIRED_COLUMNS: [&str; 6] = ["date", "market", "latitude", "longitude", "commodity", "unit"];

/// Accepted names for the USD price column.
const PRICE_COLUMNS: [&str; 2] = ["usdprice", "usd_price"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: observations + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub table: ObservationTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    /// HXL hashtag rows (`#date,#adm1+name,...`) skipped.
    pub tag_rows: usize,
}

/// Load observations from a CSV file.
pub fn load_observations(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file)
}

/// Read observations from any CSV source.
pub fn read_observations<R: Read>(source: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;
    let price_column = PRICE_COLUMNS
        .iter()
        .copied()
        .find(|c| header_map.contains_key(*c))
        .ok_or_else(|| AppError::invalid("Missing required column: `usdprice`"))?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut tag_rows = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and CSV lines are 1-based.
        let line = idx + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                rows_read += 1;
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if is_tag_row(&record) {
            tag_rows += 1;
            continue;
        }
        rows_read += 1;

        match parse_row(&record, &header_map, price_column) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), rows_read, "skipped invalid CSV rows");
    }
    debug!(rows = rows.len(), rows_read, tag_rows, "ingested observations");

    Ok(IngestedData {
        table: ObservationTable::new(rows),
        row_errors,
        rows_read,
        tag_rows,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes carry a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for column in REQUIRED_COLUMNS {
        if !header_map.contains_key(column) {
            return Err(AppError::invalid(format!("Missing required column: `{column}`")));
        }
    }
    Ok(())
}

fn is_tag_row(record: &StringRecord) -> bool {
    record.get(0).is_some_and(|first| first.starts_with('#'))
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>, price_column: &str) -> Result<Observation, String> {
    let date = parse_date(get_required(record, header_map, "date")?)?;
    let market = get_required(record, header_map, "market")?.to_string();
    let commodity = get_required(record, header_map, "commodity")?.to_string();
    let unit = get_required(record, header_map, "unit")?.to_string();

    let latitude = parse_f64(get_required(record, header_map, "latitude")?, "latitude")?;
    let longitude = parse_f64(get_required(record, header_map, "longitude")?, "longitude")?;

    let usd_price = parse_f64(get_required(record, header_map, price_column)?, price_column)?;
    if usd_price < 0.0 {
        return Err(format!("Negative `{price_column}` value {usd_price}."));
    }

    Ok(Observation {
        date,
        market,
        latitude,
        longitude,
        commodity,
        unit,
        usd_price,
    })
}

fn get_required<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}

/// Parse a date column value.
///
/// HDX publishes ISO dates; pandas exports add a time component.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(d);
        }
    }
    Err(format!("Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, DD/MM/YYYY."))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HDX_SAMPLE: &str = "\
date,admin1,admin2,market,latitude,longitude,category,commodity,unit,priceflag,pricetype,currency,price,usdprice
#date,#adm1+name,#adm2+name,#loc+market+name,#geo+lat,#geo+lon,#item+type,#item+name,#item+unit,#item+price+flag,#item+price+type,#currency,#value,#value+usd
2020-01-15,Kanto,Tokyo,Tokyo,35.68,139.69,cereals and tubers,Rice,KG,actual,Retail,JPY,400,3.70
2020-02-15,Kanto,Tokyo,Tokyo,35.68,139.69,cereals and tubers,Rice,KG,actual,Retail,JPY,410,
2020-02-15,Kanto,Tokyo,Tokyo,35.68,139.69,cereals and tubers,Wheat,KG,actual,Retail,JPY,200,1.85
";

    #[test]
    fn reads_hdx_csv_and_skips_tag_row() {
        let data = read_observations(HDX_SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.tag_rows, 1);
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.table.len(), 2);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 4);

        let first = &data.table.rows()[0];
        assert_eq!(first.market, "Tokyo");
        assert_eq!(first.commodity, "Rice");
        assert_eq!(first.usd_price, 3.70);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2020, 1, 15).unwrap());
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "date,market,latitude,longitude,commodity,usdprice\n2020-01-15,A,0,0,Rice,1\n";
        let err = read_observations(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unit"));
    }

    #[test]
    fn parses_timestamped_dates() {
        assert_eq!(
            parse_date("2020-03-15T00:00:00.000").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap()
        );
        assert!(parse_date("March 2020").is_err());
    }

    #[test]
    fn negative_price_is_a_row_error() {
        let csv = "date,market,latitude,longitude,commodity,unit,usd_price\n2020-01-15,A,0,0,Rice,KG,-1\n";
        let data = read_observations(csv.as_bytes()).unwrap();
        assert!(data.table.is_empty());
        assert_eq!(data.row_errors.len(), 1);
    }
}
