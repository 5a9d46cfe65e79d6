//! Response normalization: heterogeneous provider records into canonical [`Candle`]s.
//!
//! Providers disagree on column spelling (`Open`, `open`, `Adj Close`), on the
//! name of the time column (`timestamp`, `date`, `datetime`), and on how time is
//! encoded (RFC 3339, naive ISO, bare dates, epoch seconds or milliseconds).
//! This module folds all of that into one schema. Rows that cannot be mapped
//! are dropped, never surfaced as errors.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;
use wrdata_types::{Candle, RawRecord, sort_dedup};

/// Candidate time columns, in lookup order.
pub const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp", "date", "datetime"];

const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

// epoch values above this are milliseconds
const EPOCH_MS_THRESHOLD: u64 = 100_000_000_000;

/// Why a single record was left out of the normalized output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowRejection {
    /// A required OHLCV column is absent.
    #[error("missing column '{0}'")]
    Missing(&'static str),
    /// None of the time columns is present.
    #[error("no timestamp, date, or datetime column")]
    NoTimestamp,
    /// A column is present but its value could not be parsed.
    #[error("unparseable {column}: {value}")]
    Unparseable {
        /// Canonical column name.
        column: &'static str,
        /// Offending value, rendered as JSON.
        value: String,
    },
    /// A price or volume is negative.
    #[error("negative {0}")]
    Negative(&'static str),
}

/// Fold a column name to lower snake case: `" Adj Close "` becomes `"adj_close"`.
#[must_use]
pub fn fold_column(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Normalize a batch of records for `symbol`.
///
/// Output is strictly ascending by timestamp; when two rows share a timestamp
/// the first one in input order wins. Empty or entirely malformed input yields
/// an empty vector.
#[must_use]
pub fn normalize(records: &[RawRecord], symbol: &str) -> Vec<Candle> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        match normalize_record(record, symbol) {
            Ok(c) => rows.push(c),
            Err(_reason) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(symbol = %symbol, reason = %_reason, "dropping malformed row");
            }
        }
    }
    sort_dedup(rows)
}

/// Normalize one record.
///
/// # Errors
/// Returns the first reason the record cannot be represented as a [`Candle`].
pub fn normalize_record(record: &RawRecord, symbol: &str) -> Result<Candle, RowRejection> {
    let folded: BTreeMap<String, &Value> =
        record.iter().map(|(k, v)| (fold_column(k), v)).collect();

    let (ts_col, ts_value) = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|c| folded.get(*c).map(|v| (*c, *v)))
        .ok_or(RowRejection::NoTimestamp)?;
    let timestamp = parse_timestamp(ts_value).ok_or_else(|| RowRejection::Unparseable {
        column: ts_col,
        value: ts_value.to_string(),
    })?;

    let mut prices = [Decimal::ZERO; 5];
    for (slot, column) in prices.iter_mut().zip(PRICE_COLUMNS) {
        let v = folded.get(column).ok_or(RowRejection::Missing(column))?;
        let d = parse_decimal(v).ok_or_else(|| RowRejection::Unparseable {
            column,
            value: v.to_string(),
        })?;
        if d.is_sign_negative() && !d.is_zero() {
            return Err(RowRejection::Negative(column));
        }
        *slot = d;
    }
    let [open, high, low, close, volume] = prices;

    let row_symbol = folded
        .get("symbol")
        .and_then(|v| v.as_str())
        .map_or_else(|| symbol.to_string(), str::to_string);

    let extra = folded
        .into_iter()
        .filter(|(k, _)| {
            k != ts_col && k != "symbol" && !PRICE_COLUMNS.contains(&k.as_str())
        })
        .map(|(k, v)| (k, v.clone()))
        .collect();

    Ok(Candle {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
        symbol: Some(row_symbol),
        extra,
    })
}

/// Parse a JSON number or numeric string as a [`Decimal`].
#[must_use]
pub fn parse_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(|f| Decimal::try_from(f).ok())
            }
        }
        Value::String(s) => parse_decimal_str(s),
        _ => None,
    }
}

/// Parse a decimal string, accepting scientific notation.
#[must_use]
pub fn parse_decimal_str(s: &str) -> Option<Decimal> {
    let t = s.trim();
    Decimal::from_str(t)
        .or_else(|_| Decimal::from_scientific(t))
        .ok()
}

/// Parse any of the accepted time encodings into UTC.
///
/// Accepts RFC 3339 (with `Z` or an offset), naive ISO datetimes with `T` or a
/// space separator (read as UTC), bare `YYYY-MM-DD` dates (midnight UTC), and
/// epoch seconds or milliseconds as numbers or numeric strings.
#[must_use]
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return from_epoch(i);
            }
            #[allow(clippy::cast_possible_truncation)]
            let secs = n.as_f64().map(|f| f.trunc() as i64);
            secs.and_then(from_epoch)
        }
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// String form of [`parse_timestamp`].
#[must_use]
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(t, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }
    t.parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(v: i64) -> Option<DateTime<Utc>> {
    if v.unsigned_abs() >= EPOCH_MS_THRESHOLD {
        DateTime::from_timestamp_millis(v)
    } else {
        DateTime::from_timestamp(v, 0)
    }
}
