//! Deterministic wrdata providers for tests and demos.
//!
//! - [`MockProvider`] serves fixed history fixtures. The symbols `FAIL` and
//!   `TIMEOUT` force a provider error and a slow response respectively.
//! - [`DynamicMockProvider`] defers every call to rules set through its
//!   [`DynamicMockController`].
//! - [`MockStreamProvider`] replays scripted feed sessions through the same
//!   supervised driver real exchanges use.

use async_trait::async_trait;
use wrdata_core::{DataRequest, Provider, RawSeries, WrdataError};

mod dynamic;
mod fixtures;
mod stream;

pub use dynamic::{DynamicMockController, DynamicMockProvider, MockBehavior};
pub use fixtures::history::SYMBOLS as FIXTURE_SYMBOLS;
pub use stream::{MockEvent, MockStreamProvider, Session};

/// Fixture-backed history provider for CI-safe examples.
pub struct MockProvider {
    name: &'static str,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Provider registered as `wrdata-mock`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: "wrdata-mock",
        }
    }

    /// Same fixtures under another name, for multi-provider setups.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self { name }
    }

    async fn maybe_fail_or_timeout(&self, symbol: &str) -> Result<(), WrdataError> {
        match symbol {
            "FAIL" => Err(WrdataError::provider(self.name, "forced failure: history")),
            "TIMEOUT" => {
                // trips any provider_timeout under 200 ms
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    async fn fetch_timeseries(&self, req: &DataRequest) -> Result<RawSeries, WrdataError> {
        let symbol = req.symbol.as_str();
        self.maybe_fail_or_timeout(symbol).await?;
        fixtures::history::by_symbol(symbol)
            .ok_or_else(|| WrdataError::not_found(format!("history for {symbol}")))
    }

    async fn validate_connection(&self) -> bool {
        true
    }
}
