#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::{Duration, sleep};
use wrdata::{Capability, DataRequest, Provider, RawSeries, WrdataError};

/// Simple in-memory provider used by integration tests.
/// Behavior (rows or error, latency, probe result) is set through the builder.
pub struct MockProvider {
    pub name: &'static str,
    pub rows: Option<RawSeries>,
    pub error: Option<WrdataError>,
    pub delay_ms: u64,
    pub connected: bool,
    pub options: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<DataRequest>>,
}

impl MockProvider {
    pub fn builder() -> MockProviderBuilder {
        MockProviderBuilder::default()
    }

    /// Number of `fetch_timeseries` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most recent request this provider received.
    pub fn last_request(&self) -> Option<DataRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_timeseries(&self, req: &DataRequest) -> Result<RawSeries, WrdataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(req.clone());
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        self.rows
            .clone()
            .ok_or_else(|| WrdataError::unsupported(Capability::History.as_str()))
    }

    async fn validate_connection(&self) -> bool {
        if self.delay_ms > 0 {
            sleep(Duration::from_millis(self.delay_ms)).await;
        }
        self.connected
    }

    fn supports_options(&self) -> bool {
        self.options
    }
}

pub struct MockProviderBuilder {
    name: &'static str,
    rows: Option<RawSeries>,
    error: Option<WrdataError>,
    delay_ms: u64,
    connected: bool,
    options: bool,
}

impl Default for MockProviderBuilder {
    fn default() -> Self {
        Self {
            name: "default_mock",
            rows: None,
            error: None,
            delay_ms: 0,
            connected: true,
            options: false,
        }
    }
}

impl MockProviderBuilder {
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn returns_ok(mut self, rows: RawSeries) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn fails_with(mut self, e: WrdataError) -> Self {
        self.error = Some(e);
        self
    }

    pub const fn delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    pub const fn connected(mut self, yes: bool) -> Self {
        self.connected = yes;
        self
    }

    pub const fn supports_options(mut self, yes: bool) -> Self {
        self.options = yes;
        self
    }

    pub fn build(self) -> Arc<MockProvider> {
        Arc::new(MockProvider {
            name: self.name,
            rows: self.rows,
            error: self.error,
            delay_ms: self.delay_ms,
            connected: self.connected,
            options: self.options,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }
}

/// Provider returning one bar per timestamp, each closing at the timestamp value.
pub fn m_hist(name: &'static str, ts: &[i64]) -> Arc<MockProvider> {
    #[allow(clippy::cast_precision_loss)]
    let rows: Vec<(i64, f64)> = ts.iter().map(|&t| (t, t as f64)).collect();
    MockProvider::builder()
        .name(name)
        .returns_ok(super::series(&rows))
        .build()
}

/// Provider whose every call fails.
pub fn m_fail(name: &'static str) -> Arc<MockProvider> {
    MockProvider::builder()
        .name(name)
        .fails_with(WrdataError::provider(name, "boom"))
        .build()
}
