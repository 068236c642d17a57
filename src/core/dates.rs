//! SPSS date normalization
//!
//! SPSS stores dates as seconds since 1582-10-14 00:00:00 (the start of the
//! Gregorian calendar). Date-formatted columns are rendered as `YYYY-MM-DD`.

use crate::error::ConvertError;
use crate::types::{ConversionWarning, DateColumnSet, RawValue, Record, WarningKind};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tracing::warn;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Output format for normalized dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The SPSS epoch, 1582-10-14 00:00:00
pub fn spss_epoch() -> NaiveDateTime {
    // Constant date, always valid
    NaiveDate::from_ymd_opt(1582, 10, 14)
        .unwrap_or(NaiveDate::MIN)
        .and_time(chrono::NaiveTime::MIN)
}

/// Convert an SPSS seconds offset to a calendar date.
///
/// Fractional seconds are floored to the containing day.
pub fn spss_seconds_to_date(seconds: f64) -> Result<NaiveDate, ConvertError> {
    let out_of_range = |reason: &str| ConvertError::DateConversion {
        value: seconds.to_string(),
        reason: reason.to_string(),
    };

    if !seconds.is_finite() {
        return Err(out_of_range("value is not a finite number"));
    }

    let days = (seconds / SECONDS_PER_DAY).floor();
    if days.abs() > i64::MAX as f64 / SECONDS_PER_DAY {
        return Err(out_of_range("offset outside the representable calendar"));
    }

    TimeDelta::try_days(days as i64)
        .and_then(|delta| spss_epoch().checked_add_signed(delta))
        .map(|dt| dt.date())
        .ok_or_else(|| out_of_range("offset outside the representable calendar"))
}

/// Normalize one date cell.
///
/// Missing and NaN become `Missing`; text passes through untouched.
pub fn normalize_value(value: &RawValue) -> Result<RawValue, ConvertError> {
    match value {
        RawValue::Missing => Ok(RawValue::Missing),
        RawValue::Number(n) if n.is_nan() => Ok(RawValue::Missing),
        RawValue::Number(n) => {
            spss_seconds_to_date(*n).map(|d| RawValue::Text(d.format(DATE_FORMAT).to_string()))
        }
        RawValue::Date(dt) => Ok(RawValue::Text(dt.format(DATE_FORMAT).to_string())),
        RawValue::Text(_) => Ok(value.clone()),
    }
}

/// Rewrites date columns of each record into canonical strings
#[derive(Debug, Clone, Default)]
pub struct DateNormalizer {
    columns: DateColumnSet,
}

impl DateNormalizer {
    pub fn new(columns: DateColumnSet) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &DateColumnSet {
        &self.columns
    }

    /// Normalize the date columns of `record` (row index `row`).
    ///
    /// A cell that cannot be converted keeps its raw value and adds one
    /// warning to `warnings`.
    pub fn normalize(
        &self,
        row: usize,
        record: Record,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Record {
        if self.columns.is_empty() {
            return record;
        }

        let fields = record
            .fields
            .into_iter()
            .map(|(key, value)| {
                if !self.columns.contains(&key) {
                    return (key, value);
                }
                match normalize_value(&value) {
                    Ok(normalized) => (key, normalized),
                    Err(error) => {
                        warn!(row, column = %key, "{}", error);
                        warnings.push(ConversionWarning {
                            row: Some(row),
                            column: key.clone(),
                            kind: WarningKind::DateConversion,
                            message: error.to_string(),
                        });
                        (key, value)
                    }
                }
            })
            .collect();

        Record { fields }
    }
}
