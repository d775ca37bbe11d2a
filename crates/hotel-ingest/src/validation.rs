//! Row validation
//!
//! Pure checks over a [`RawRecord`]. Nothing here touches the skip ledger;
//! callers decide what to do with a [`RowRejection`]. The `Display` text of a
//! rejection is the ledger key, so wording changes show up in import reports.

use crate::source::RawRecord;
use thiserror::Error;

/// Lowest accepted review rating
pub const MIN_RATING: f64 = 1.0;

/// Highest accepted review rating
pub const MAX_RATING: f64 = 5.0;

/// Why a row was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowRejection {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {0} (not a number)")]
    NotANumber(&'static str),

    #[error("Invalid {field} (must be between {min:.1} and {max:.1})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    /// Longer than the column's `VARCHAR` width
    #[error("Invalid {field} (too long)")]
    TooLong { field: &'static str, max_chars: usize },

    /// Does not fit the column's `NUMERIC(precision, scale)`
    #[error("Invalid {field} (too large)")]
    TooLarge {
        field: &'static str,
        precision: u32,
        scale: u32,
    },
}

impl RowRejection {
    /// Ledger key for this rejection
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Value of a column, or `None` if it is absent, empty or whitespace.
pub fn present<'r>(record: &'r RawRecord, field: &str) -> Option<&'r str> {
    record.get(field).filter(|v| !v.trim().is_empty())
}

/// Check that every field in `fields` is present, in order.
pub fn require_fields(record: &RawRecord, fields: &[&'static str]) -> Result<(), RowRejection> {
    match fields.iter().find(|f| present(record, f).is_none()) {
        Some(field) => Err(RowRejection::MissingField(*field)),
        None => Ok(()),
    }
}

/// Required column, trimmed
pub fn required<'r>(record: &'r RawRecord, field: &'static str) -> Result<&'r str, RowRejection> {
    present(record, field)
        .map(str::trim)
        .ok_or(RowRejection::MissingField(field))
}

/// Optional column, trimmed; empty reads as `None`
pub fn optional<'r>(record: &'r RawRecord, field: &str) -> Option<&'r str> {
    present(record, field).map(str::trim)
}

fn check_length<'r>(field: &'static str, value: &'r str, max_chars: usize) -> Result<&'r str, RowRejection> {
    // VARCHAR(n) counts characters, not bytes
    if value.chars().count() > max_chars {
        return Err(RowRejection::TooLong { field, max_chars });
    }
    Ok(value)
}

/// Required column, trimmed, at most `max_chars` characters
pub fn bounded<'r>(
    record: &'r RawRecord,
    field: &'static str,
    max_chars: usize,
) -> Result<&'r str, RowRejection> {
    check_length(field, required(record, field)?, max_chars)
}

/// Optional column, trimmed, at most `max_chars` characters
pub fn optional_bounded<'r>(
    record: &'r RawRecord,
    field: &'static str,
    max_chars: usize,
) -> Result<Option<&'r str>, RowRejection> {
    optional(record, field)
        .map(|v| check_length(field, v, max_chars))
        .transpose()
}

/// Required integer column
pub fn integer(record: &RawRecord, field: &'static str) -> Result<i32, RowRejection> {
    required(record, field)?
        .parse::<i32>()
        .map_err(|_| RowRejection::NotANumber(field))
}

/// Required decimal column; `NaN` and infinities are rejected
pub fn decimal(record: &RawRecord, field: &'static str) -> Result<f64, RowRejection> {
    required(record, field)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(RowRejection::NotANumber(field))
}

/// Required decimal column that fits `NUMERIC(precision, scale)`.
///
/// The value is rounded to `scale` digits first, as PostgreSQL does on
/// assignment, so `99.96` overflows `NUMERIC(3, 1)`.
pub fn fixed_point(
    record: &RawRecord,
    field: &'static str,
    precision: u32,
    scale: u32,
) -> Result<f64, RowRejection> {
    let value = decimal(record, field)?;
    let factor = 10f64.powi(scale as i32);
    let limit = 10f64.powi(precision.saturating_sub(scale) as i32);
    if ((value * factor).round() / factor).abs() >= limit {
        return Err(RowRejection::TooLarge {
            field,
            precision,
            scale,
        });
    }
    Ok(value)
}

/// Required decimal column constrained to `[min, max]`
pub fn decimal_in_range(
    record: &RawRecord,
    field: &'static str,
    min: f64,
    max: f64,
) -> Result<f64, RowRejection> {
    let out_of_range = RowRejection::OutOfRange { field, min, max };
    match decimal(record, field) {
        Ok(v) if (min..=max).contains(&v) => Ok(v),
        Ok(_) | Err(RowRejection::NotANumber(_)) => Err(out_of_range),
        Err(other) => Err(other),
    }
}

/// Review rating in `[1.0, 5.0]`
pub fn rating(record: &RawRecord, field: &'static str) -> Result<f64, RowRejection> {
    decimal_in_range(record, field, MIN_RATING, MAX_RATING)
}
