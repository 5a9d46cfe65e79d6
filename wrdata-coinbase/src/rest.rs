use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;
use wrdata_core::{DataRequest, Interval, Provider, RawRecord, RawSeries, WrdataError};

use crate::NAME;
use crate::symbol::normalize_symbol;

/// Public Advanced Trade brokerage endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.coinbase.com/api/v3/brokerage";

const HISTORY_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PROBE_PRODUCT: &str = "BTC-USD";

#[derive(Debug, Deserialize)]
struct CandlesBody {
    #[serde(default)]
    candles: Vec<WireCandle>,
}

#[derive(Debug, Deserialize)]
struct WireCandle {
    start: Value,
    low: Value,
    high: Value,
    open: Value,
    close: Value,
    volume: Value,
}

impl WireCandle {
    fn into_record(self, product: &str) -> RawRecord {
        let mut r = Map::new();
        r.insert("timestamp".into(), self.start);
        r.insert("open".into(), self.open);
        r.insert("high".into(), self.high);
        r.insert("low".into(), self.low);
        r.insert("close".into(), self.close);
        r.insert("volume".into(), self.volume);
        r.insert("symbol".into(), Value::String(product.to_string()));
        r
    }
}

/// Coinbase candle granularity for `interval`, if the API offers it.
#[must_use]
pub const fn granularity(interval: Interval) -> Option<&'static str> {
    match interval {
        Interval::I1m => Some("ONE_MINUTE"),
        Interval::I5m => Some("FIVE_MINUTE"),
        Interval::I15m => Some("FIFTEEN_MINUTE"),
        Interval::I30m => Some("THIRTY_MINUTE"),
        Interval::H1 => Some("ONE_HOUR"),
        Interval::D1 => Some("ONE_DAY"),
        _ => None,
    }
}

fn day_start(d: NaiveDate) -> i64 {
    d.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn looks_like_not_found(msg: &str) -> bool {
    let m = msg.to_ascii_lowercase();
    m.contains("not found") || m.contains("invalid product") || m.contains("no data")
}

/// Historical candles from the Coinbase Advanced Trade REST API.
///
/// Symbols are normalized to Coinbase product ids (`btcusd` becomes
/// `BTC-USD`). The API returns newest candles first; records are handed to the
/// router oldest first. One request covers the whole range, so very long
/// intraday ranges are truncated by the venue's per-request candle limit.
#[derive(Debug, Clone)]
pub struct CoinbaseProvider {
    client: reqwest::Client,
    base: String,
}

impl Default for CoinbaseProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinbaseProvider {
    /// Provider against the public production endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Provider against another endpoint (a proxy, a sandbox, a test server).
    ///
    /// # Errors
    /// Returns `InvalidArg` when `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, WrdataError> {
        let base = Url::parse(base_url)
            .map_err(|e| WrdataError::InvalidArg(format!("base url '{base_url}': {e}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(WrdataError::InvalidArg(format!(
                "base url '{base_url}' must be http(s)"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base: base.into(),
        })
    }

    /// Reuse an existing HTTP client.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Endpoint requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, WrdataError> {
        let mut url = Url::parse(&self.base)
            .map_err(|e| WrdataError::InvalidArg(format!("base url '{}': {e}", self.base)))?;
        url.path_segments_mut()
            .map_err(|()| WrdataError::InvalidArg(format!("base url '{}'", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn map_status(status: StatusCode, body: &str, what: &str) -> WrdataError {
        if status == StatusCode::NOT_FOUND || looks_like_not_found(body) {
            return WrdataError::not_found(what.to_string());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return WrdataError::provider(NAME, "rate limited");
        }
        WrdataError::provider(NAME, format!("HTTP {status}"))
    }

    fn map_send(e: &reqwest::Error) -> WrdataError {
        if e.is_timeout() {
            WrdataError::provider_timeout(NAME, "history")
        } else {
            WrdataError::transport(e)
        }
    }
}

#[async_trait]
impl Provider for CoinbaseProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn vendor(&self) -> &'static str {
        "Coinbase"
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "wrdata_coinbase::history",
            skip(self, req),
            fields(symbol = %req.symbol, interval = %req.interval),
        )
    )]
    async fn fetch_timeseries(&self, req: &DataRequest) -> Result<RawSeries, WrdataError> {
        let product = normalize_symbol(&req.symbol);
        let gran = granularity(req.interval)
            .ok_or_else(|| WrdataError::unsupported(format!("history {}", req.interval)))?;
        let start = day_start(req.start_date);
        // end is exclusive at the venue; cover the whole last day
        let end = day_start(req.end_date.succ_opt().unwrap_or(req.end_date));

        let url = self.endpoint(&["products", &product, "candles"])?;
        let resp = self
            .client
            .get(url)
            .query(&[
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("granularity", gran.to_string()),
            ])
            .timeout(HISTORY_TIMEOUT)
            .send()
            .await
            .map_err(|e| Self::map_send(&e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Self::map_send(&e))?;
        let what = format!("history for {product}");
        if !status.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(product = %product, status = %status, "candles request rejected");
            return Err(Self::map_status(status, &text, &what));
        }

        let body: CandlesBody = serde_json::from_str(&text)?;
        if body.candles.is_empty() {
            return Err(WrdataError::not_found(what));
        }

        let mut records: Vec<RawRecord> = body
            .candles
            .into_iter()
            .map(|c| c.into_record(&product))
            .collect();
        records.reverse();
        #[cfg(feature = "tracing")]
        tracing::debug!(product = %product, rows = records.len(), "candles received");

        let mut series = RawSeries::new(records);
        series.metadata.insert("interval".into(), json!(req.interval.as_str()));
        series.metadata.insert("granularity".into(), json!(gran));
        series.metadata.insert("product_id".into(), json!(product));
        series.metadata.insert("source".into(), json!("Coinbase Advanced"));
        Ok(series)
    }

    async fn validate_connection(&self) -> bool {
        let Ok(url) = self.endpoint(&["products", PROBE_PRODUCT]) else {
            return false;
        };
        match self.client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "coinbase probe failed");
                false
            }
        }
    }
}
