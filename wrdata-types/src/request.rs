//! Historical data request envelope and its builder.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WrdataError;
use crate::market::{AssetType, Interval};

/// A request for OHLCV history over an inclusive date range.
///
/// Construct through [`DataRequest::builder`] to get defaults (daily bars, equity,
/// the trailing year) and validation, or fill the fields directly and call
/// [`DataRequest::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    /// Ticker or pair as the caller spelled it.
    pub symbol: String,
    /// Asset class used to choose a provider priority list.
    pub asset_type: AssetType,
    /// First day of the range (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the range (inclusive).
    pub end_date: NaiveDate,
    /// Bar width.
    pub interval: Interval,
    /// Provider to try first, by registry name.
    pub provider: Option<String>,
    /// Request-level override of the instance fallback flag.
    pub fallback: Option<bool>,
}

impl DataRequest {
    /// Start building a request for `symbol`.
    pub fn builder(symbol: impl Into<String>) -> DataRequestBuilder {
        DataRequestBuilder::new(symbol)
    }

    /// Check the request invariants.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the symbol is blank or `start_date > end_date`.
    pub fn validate(&self) -> Result<(), WrdataError> {
        if self.symbol.trim().is_empty() {
            return Err(WrdataError::InvalidArg("symbol must not be empty".into()));
        }
        if self.start_date > self.end_date {
            return Err(WrdataError::InvalidArg(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

/// Builder for [`DataRequest`].
#[derive(Debug, Clone)]
pub struct DataRequestBuilder {
    symbol: String,
    asset_type: AssetType,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    interval: Interval,
    provider: Option<String>,
    fallback: Option<bool>,
}

impl DataRequestBuilder {
    /// New builder with daily bars for an equity.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            asset_type: AssetType::default(),
            start: None,
            end: None,
            interval: Interval::default(),
            provider: None,
            fallback: None,
        }
    }

    /// Set the asset class.
    #[must_use]
    pub const fn asset_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = asset_type;
        self
    }

    /// Set the first day of the range. Defaults to one year before `end`.
    #[must_use]
    pub const fn start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the last day of the range. Defaults to today (UTC).
    #[must_use]
    pub const fn end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the bar width.
    #[must_use]
    pub const fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    /// Ask for a specific provider first.
    #[must_use]
    pub fn provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(name.into());
        self
    }

    /// Optionally ask for a specific provider first.
    #[must_use]
    pub fn provider_opt(mut self, name: Option<String>) -> Self {
        self.provider = name;
        self
    }

    /// Override the instance-level fallback flag for this request only.
    #[must_use]
    pub const fn fallback(mut self, enabled: bool) -> Self {
        self.fallback = Some(enabled);
        self
    }

    /// Finish the request, applying date defaults and validating.
    ///
    /// # Errors
    /// Returns `InvalidArg` when the symbol is blank or the range is inverted.
    pub fn build(self) -> Result<DataRequest, WrdataError> {
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = match self.start {
            Some(s) => s,
            None => end.checked_sub_days(Days::new(365)).ok_or_else(|| {
                WrdataError::InvalidArg(format!("cannot default start before {end}"))
            })?,
        };
        let req = DataRequest {
            symbol: self.symbol.trim().to_string(),
            asset_type: self.asset_type,
            start_date: start,
            end_date: end,
            interval: self.interval,
            provider: self.provider,
            fallback: self.fallback,
        };
        req.validate()?;
        Ok(req)
    }
}
