//! Fractional-year slider labels.
//!
//! The date slider works on a continuous coordinate `year + (month - 1) / 12`.
//! Converting back always anchors on the 15th of the month: observations are
//! monthly, so the day carries no information.

use chrono::{Datelike, NaiveDate};

use crate::error::AppError;

/// Slider granularity (one month).
pub const DATE_STEP: f64 = 1.0 / 12.0;

/// Day-of-month used for every label -> date conversion.
pub const ANCHOR_DAY: u32 = 15;

/// `year + (month - 1) / 12`.
pub fn to_label(date: NaiveDate) -> f64 {
    date.year() as f64 + (date.month0() as f64) / 12.0
}

/// Inverse of [`to_label`], anchored on day 15.
pub fn to_date(label: f64) -> Result<NaiveDate, AppError> {
    if !label.is_finite() {
        return Err(AppError::invalid(format!("Invalid date label {label}.")));
    }

    let year = label.floor();
    if year < i32::MIN as f64 || year > i32::MAX as f64 {
        return Err(AppError::invalid(format!("Date label {label} is out of range.")));
    }

    let mut year = year as i32;
    let mut month = ((label - label.floor()) * 12.0).round() as u32 + 1;
    // A fraction within half a month of the next year rounds to month 13.
    if month > 12 {
        year = year
            .checked_add(1)
            .ok_or_else(|| AppError::invalid(format!("Date label {label} is out of range.")))?;
        month = 1;
    }

    NaiveDate::from_ymd_opt(year, month, ANCHOR_DAY)
        .ok_or_else(|| AppError::invalid(format!("Date label {label} is out of range.")))
}
