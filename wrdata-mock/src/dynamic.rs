use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wrdata_core::{Capability, DataRequest, Provider, RawSeries, WrdataError};

/// Instruction for how a method should behave for a given input.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(WrdataError),
    /// Hang indefinitely (simulate a timeout).
    Hang,
}

struct InternalState {
    history_rules: HashMap<String, MockBehavior<RawSeries>>,
    history_calls: HashMap<String, usize>,
    connected: bool,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            history_rules: HashMap::new(),
            history_calls: HashMap::new(),
            connected: true,
        }
    }
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the behavior for `fetch_timeseries` calls for a specific symbol.
    pub async fn set_history_behavior(&self, symbol: &str, behavior: MockBehavior<RawSeries>) {
        let mut guard = self.state.lock().await;
        guard.history_rules.insert(symbol.to_string(), behavior);
    }

    /// Set what `validate_connection` reports.
    pub async fn set_connected(&self, connected: bool) {
        self.state.lock().await.connected = connected;
    }

    /// Number of `fetch_timeseries` calls seen for `symbol`.
    pub async fn history_calls(&self, symbol: &str) -> usize {
        let guard = self.state.lock().await;
        guard.history_calls.get(symbol).copied().unwrap_or(0)
    }

    /// Number of `fetch_timeseries` calls across all symbols.
    pub async fn total_history_calls(&self) -> usize {
        self.state.lock().await.history_calls.values().sum()
    }

    /// Clear all configured behaviors and call counts.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.history_rules.clear();
        guard.history_calls.clear();
        guard.connected = true;
    }
}

/// A provider that defers all behavior to an external controller.
pub struct DynamicMockProvider {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockProvider {
    /// Create a new dynamic mock provider and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn Provider>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn Provider>, controller)
    }
}

#[async_trait]
impl Provider for DynamicMockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "DynamicMock"
    }

    async fn fetch_timeseries(&self, req: &DataRequest) -> Result<RawSeries, WrdataError> {
        // Snapshot the rule without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            *guard.history_calls.entry(req.symbol.clone()).or_default() += 1;
            guard.history_rules.get(&req.symbol).cloned()
        };

        match behavior {
            Some(MockBehavior::Return(series)) => Ok(series),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(WrdataError::unsupported(Capability::History.as_str())),
        }
    }

    async fn validate_connection(&self) -> bool {
        self.state.lock().await.connected
    }
}
