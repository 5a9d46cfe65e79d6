//! Asset classes and bar intervals shared by requests, routing, and streaming.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WrdataError;

/// Broad class of instrument used to pick a provider priority list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AssetType {
    /// Listed equity.
    #[default]
    Equity,
    /// Alias kept separate from `Equity` so tables can diverge.
    Stock,
    /// Exchange-traded fund.
    Etf,
    /// Listed option contract.
    Option,
    /// Futures contract.
    Future,
    /// Market index.
    Index,
    /// Currency pair.
    Forex,
    /// Crypto asset or pair.
    #[serde(alias = "cryptocurrency")]
    Crypto,
    /// Macroeconomic series.
    Economic,
    /// Fixed income.
    Bond,
    /// Physical commodity.
    Commodity,
}

impl AssetType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Equity,
        Self::Stock,
        Self::Etf,
        Self::Option,
        Self::Future,
        Self::Index,
        Self::Forex,
        Self::Crypto,
        Self::Economic,
        Self::Bond,
        Self::Commodity,
    ];

    /// Stable lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Stock => "stock",
            Self::Etf => "etf",
            Self::Option => "option",
            Self::Future => "future",
            Self::Index => "index",
            Self::Forex => "forex",
            Self::Crypto => "crypto",
            Self::Economic => "economic",
            Self::Bond => "bond",
            Self::Commodity => "commodity",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = WrdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if lowered == "cryptocurrency" {
            return Ok(Self::Crypto);
        }
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == lowered)
            .ok_or_else(|| WrdataError::InvalidArg(format!("unknown asset type '{s}'")))
    }
}

/// Bar width for historical and kline requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[non_exhaustive]
pub enum Interval {
    /// One minute.
    #[serde(rename = "1m")]
    I1m,
    /// Five minutes.
    #[serde(rename = "5m")]
    I5m,
    /// Fifteen minutes.
    #[serde(rename = "15m")]
    I15m,
    /// Thirty minutes.
    #[serde(rename = "30m")]
    I30m,
    /// One hour.
    #[serde(rename = "1h")]
    H1,
    /// Four hours.
    #[serde(rename = "4h")]
    H4,
    /// One day.
    #[default]
    #[serde(rename = "1d")]
    D1,
    /// One week.
    #[serde(rename = "1wk")]
    W1,
    /// One calendar month.
    #[serde(rename = "1mo")]
    M1,
}

impl Interval {
    /// Every variant, shortest first.
    pub const ALL: [Self; 9] = [
        Self::I1m,
        Self::I5m,
        Self::I15m,
        Self::I30m,
        Self::H1,
        Self::H4,
        Self::D1,
        Self::W1,
        Self::M1,
    ];

    /// Wire label, e.g. `"1m"`, `"1wk"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::I1m => "1m",
            Self::I5m => "5m",
            Self::I15m => "15m",
            Self::I30m => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
            Self::W1 => "1wk",
            Self::M1 => "1mo",
        }
    }

    /// Fixed length in seconds. Calendar months have none.
    #[must_use]
    pub const fn seconds(self) -> Option<i64> {
        match self {
            Self::I1m => Some(60),
            Self::I5m => Some(300),
            Self::I15m => Some(900),
            Self::I30m => Some(1_800),
            Self::H1 => Some(3_600),
            Self::H4 => Some(14_400),
            Self::D1 => Some(86_400),
            Self::W1 => Some(604_800),
            Self::M1 => None,
        }
    }

    /// True for bars shorter than one day.
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        matches!(
            self,
            Self::I1m | Self::I5m | Self::I15m | Self::I30m | Self::H1 | Self::H4
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = WrdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        // common provider spellings
        let canon = match t {
            "1w" => "1wk",
            "60m" => "1h",
            "240m" => "4h",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == canon)
            .ok_or_else(|| WrdataError::InvalidArg(format!("unknown interval '{s}'")))
    }
}
