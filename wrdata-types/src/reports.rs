//! Report envelopes produced by the facade and its builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WrdataError;
use crate::response::Candle;

/// Summary of provider registration at build time.
///
/// Providers whose construction failed are listed in `warnings` instead of
/// aborting the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StartupReport {
    /// Names of providers that were registered, in registration order.
    pub registered: Vec<String>,
    /// Non-fatal issues encountered while registering.
    pub warnings: Vec<WrdataError>,
}

/// Summary of a multi-symbol history download.
///
/// Every requested symbol has an entry in `data`; failed symbols map to an
/// empty vector, are listed in `failed` and their error is kept in `warnings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GetManyReport {
    /// Rows per requested symbol.
    pub data: BTreeMap<String, Vec<Candle>>,
    /// Symbols whose fetch failed, parallel to `warnings`.
    #[serde(default)]
    pub failed: Vec<String>,
    /// Non-fatal issues encountered while fetching.
    pub warnings: Vec<WrdataError>,
}

/// Health and capability snapshot for one registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderStatus {
    /// Result of the provider's connectivity probe.
    pub connected: bool,
    /// Whether the provider serves option chains.
    pub supports_options: bool,
    /// Whether the provider serves historical option data.
    pub supports_historical_options: bool,
    /// Whether a streaming connection for this name is currently open.
    pub streaming: bool,
    /// Probe failure detail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Vendor behind a history provider; `None` for stream-only entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}
