//! Canonical OHLCV rows and the response envelope returned by the router.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WrdataError;

/// One raw provider record before normalization.
pub type RawRecord = Map<String, Value>;

/// One OHLCV bar in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time (UTC).
    pub timestamp: DateTime<Utc>,
    /// Opening price.
    pub open: Decimal,
    /// Highest price.
    pub high: Decimal,
    /// Lowest price.
    pub low: Decimal,
    /// Closing price.
    pub close: Decimal,
    /// Traded volume.
    pub volume: Decimal,
    /// Symbol, when the provider or request supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Provider columns outside the canonical set, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// Raw provider payload for a successful exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    /// Records in whatever column spelling the provider uses.
    pub records: Vec<RawRecord>,
    /// Free-form provider metadata (request ids, pagination, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RawSeries {
    /// Wrap records with empty metadata.
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            metadata: Map::new(),
        }
    }
}

/// Outcome of a routed history fetch.
///
/// `success == false` implies `data` is empty. `success == true` implies `data`
/// is strictly ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    /// Requested symbol.
    pub symbol: String,
    /// Provider that produced the data, or the primary choice on failure.
    pub provider: String,
    /// Normalized rows.
    pub data: Vec<Candle>,
    /// Whether any provider succeeded.
    pub success: bool,
    /// Failure message when `success` is false.
    pub error: Option<String>,
    /// Diagnostics: warnings, per-provider attempt errors, provider metadata.
    pub metadata: Map<String, Value>,
}

impl DataResponse {
    /// Successful response. Rows are sorted and de-duplicated by timestamp, first wins.
    pub fn ok(symbol: impl Into<String>, provider: impl Into<String>, data: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            provider: provider.into(),
            data: sort_dedup(data),
            success: true,
            error: None,
            metadata: Map::new(),
        }
    }

    /// Failed response with no rows.
    pub fn failed(
        symbol: impl Into<String>,
        provider: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            provider: provider.into(),
            data: Vec::new(),
            success: false,
            error: Some(error.into()),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Warnings recorded while routing (e.g. unknown explicit provider).
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.metadata
            .get("warnings")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Convert into the rows or an error describing the failure.
    ///
    /// When per-provider attempts were recorded the error is an
    /// `AllProvidersFailed` carrying one `Provider` error per attempt.
    ///
    /// # Errors
    /// Returns an error when `success` is false.
    pub fn into_result(self) -> Result<Vec<Candle>, WrdataError> {
        if self.success {
            return Ok(self.data);
        }
        let attempts: Vec<WrdataError> = self
            .metadata
            .get("attempts")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .map(|a| {
                        WrdataError::provider(
                            a.get("provider").and_then(Value::as_str).unwrap_or("unknown"),
                            a.get("error").and_then(Value::as_str).unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        if attempts.is_empty() {
            Err(WrdataError::provider(
                self.provider,
                self.error.unwrap_or_default(),
            ))
        } else {
            Err(WrdataError::AllProvidersFailed(attempts))
        }
    }
}

/// Stable sort by timestamp, keeping the first row of each timestamp.
#[must_use]
pub fn sort_dedup(mut rows: Vec<Candle>) -> Vec<Candle> {
    rows.sort_by_key(|c| c.timestamp);
    rows.dedup_by_key(|c| c.timestamp);
    rows
}
