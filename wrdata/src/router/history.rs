use std::sync::Arc;

use serde_json::{Value, json};
use wrdata_core::normalize::normalize;
use wrdata_core::{Candle, Capability, DataRequest, DataResponse, Provider, WrdataError};

use crate::core::{DataStream, GetOptions, tag_err};
use crate::router::util::collapse_errors;

const ALL_FAILED: &str = "All providers failed to fetch data";

/// A routed request that produced no data.
pub(crate) struct RouteFailure {
    pub(crate) response: DataResponse,
    pub(crate) error: WrdataError,
}

/// Routing diagnostics collected along the chain.
#[derive(Default)]
struct Trail {
    warnings: Vec<String>,
    attempts: Vec<(&'static str, WrdataError)>,
}

impl Trail {
    fn warn(&mut self, msg: String) {
        #[cfg(feature = "tracing")]
        tracing::warn!(warning = %msg, "routing warning");
        self.warnings.push(msg);
    }

    fn decorate(&self, mut resp: DataResponse) -> DataResponse {
        if !self.warnings.is_empty() {
            resp.metadata
                .insert("warnings".into(), json!(self.warnings));
        }
        if !self.attempts.is_empty() {
            let attempts: Vec<Value> = self
                .attempts
                .iter()
                .map(|(p, e)| json!({ "provider": p, "error": e.to_string() }))
                .collect();
            resp.metadata.insert("attempts".into(), Value::Array(attempts));
        }
        resp
    }
}

impl DataStream {
    /// Pick the primary provider for `req`.
    ///
    /// Order: the explicit (or default) provider when registered; otherwise the
    /// first registered name in the asset type's priority list; otherwise the
    /// first registered provider. An unknown explicit name is a warning, not an
    /// error.
    ///
    /// # Errors
    /// Returns `NoProviders` when nothing is registered.
    pub fn select_provider(&self, req: &DataRequest) -> Result<&'static str, WrdataError> {
        let mut trail = Trail::default();
        self.select(req, &mut trail).map(|p| p.name())
    }

    fn select(
        &self,
        req: &DataRequest,
        trail: &mut Trail,
    ) -> Result<Arc<dyn Provider>, WrdataError> {
        let explicit = req
            .provider
            .as_deref()
            .or(self.cfg.default_provider.as_deref());
        if let Some(name) = explicit {
            if let Some(p) = self.provider(name) {
                return Ok(Arc::clone(p));
            }
            trail.warn(format!("provider '{name}' not available, using fallback"));
        }

        if let Some(p) = self
            .cfg
            .priority
            .get(&req.asset_type)
            .into_iter()
            .flatten()
            .find_map(|n| self.provider(n))
        {
            return Ok(Arc::clone(p));
        }

        self.providers
            .first()
            .cloned()
            .ok_or(WrdataError::NoProviders)
    }

    /// Fetch history for `req`, falling back across providers on failure.
    ///
    /// Behavior and trade-offs:
    /// - Never returns an error: every failure is a `DataResponse` with
    ///   `success == false`. Use [`get`](Self::get) for a `Result`.
    /// - The primary comes from [`select_provider`](Self::select_provider). When it
    ///   fails and fallback is on, every other provider is tried in registration
    ///   order until one succeeds.
    /// - `provider` on the response names whoever produced the data.
    /// - Per-provider errors are kept under `metadata["attempts"]` and routing
    ///   warnings under `metadata["warnings"]`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "wrdata::router::fetch",
            skip(self, req),
            fields(symbol = %req.symbol, asset_type = %req.asset_type, interval = %req.interval),
        )
    )]
    pub async fn fetch(&self, req: &DataRequest) -> DataResponse {
        match self.route(req).await {
            Ok(resp) => resp,
            Err(failure) => failure.response,
        }
    }

    /// Fetch history for one symbol.
    ///
    /// # Errors
    /// Returns `InvalidArg` for a bad request, `NoProviders` when nothing is
    /// registered, `RequestTimeout` when the chain budget runs out, the tagged
    /// provider error when fallback is disabled, and otherwise an aggregate of
    /// every attempt.
    pub async fn get(&self, symbol: &str, opts: &GetOptions) -> Result<Vec<Candle>, WrdataError> {
        let req = opts.request(symbol)?;
        self.route(&req)
            .await
            .map(|r| r.data)
            .map_err(|f| f.error)
    }

    pub(crate) async fn route(&self, req: &DataRequest) -> Result<DataResponse, RouteFailure> {
        let mut trail = Trail::default();

        if let Err(e) = req.validate() {
            let name = req.provider.clone().unwrap_or_default();
            return Err(RouteFailure {
                response: DataResponse::failed(&req.symbol, name, e.to_string()),
                error: e,
            });
        }

        let primary = match self.select(req, &mut trail) {
            Ok(p) => p,
            Err(e) => {
                return Err(RouteFailure {
                    response: trail.decorate(DataResponse::failed(&req.symbol, "", e.to_string())),
                    error: e,
                });
            }
        };

        let chain = self.run_chain(req, &primary, &mut trail);
        let outcome = match self.cfg.request_timeout {
            Some(budget) => tokio::time::timeout(budget, chain)
                .await
                .unwrap_or_else(|_| Err(WrdataError::request_timeout(Capability::History.as_str()))),
            None => chain.await,
        };

        match outcome {
            Ok(resp) => Ok(trail.decorate(resp)),
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(symbol = %req.symbol, error = %error, "history request failed");
                let fallback = req.fallback.unwrap_or(self.cfg.fallback_enabled);
                let message = match &error {
                    WrdataError::AllProvidersFailed(_) | WrdataError::NotFound { .. }
                        if fallback =>
                    {
                        ALL_FAILED.to_string()
                    }
                    other => other.to_string(),
                };
                Err(RouteFailure {
                    response: trail.decorate(DataResponse::failed(
                        &req.symbol,
                        primary.name(),
                        message,
                    )),
                    error,
                })
            }
        }
    }

    async fn run_chain(
        &self,
        req: &DataRequest,
        primary: &Arc<dyn Provider>,
        trail: &mut Trail,
    ) -> Result<DataResponse, WrdataError> {
        match self.attempt(primary, req).await {
            Ok(resp) => return Ok(resp),
            Err(e) => trail.attempts.push((primary.name(), e)),
        }

        let fallback = req.fallback.unwrap_or(self.cfg.fallback_enabled);
        if !fallback {
            return Err(trail
                .attempts
                .last()
                .map(|(_, e)| e.clone())
                .unwrap_or(WrdataError::NoProviders));
        }

        for p in self.providers.iter().filter(|p| p.name() != primary.name()) {
            #[cfg(feature = "tracing")]
            tracing::info!(provider = p.name(), symbol = %req.symbol, "trying fallback provider");
            match self.attempt(p, req).await {
                Ok(resp) => return Ok(resp),
                Err(e) => trail.attempts.push((p.name(), e)),
            }
        }

        let errors = trail.attempts.iter().map(|(_, e)| e.clone()).collect();
        Err(collapse_errors(
            Capability::History,
            true,
            errors,
            Some(format!("history for {}", req.symbol)),
        ))
    }

    async fn attempt(
        &self,
        p: &Arc<dyn Provider>,
        req: &DataRequest,
    ) -> Result<DataResponse, WrdataError> {
        let series = Self::provider_call_with_timeout(
            p.name(),
            Capability::History.as_str(),
            self.cfg.provider_timeout,
            p.fetch_timeseries(req),
        )
        .await
        .map_err(|e| tag_err(p.name(), e))
        .inspect_err(|_err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(provider = p.name(), symbol = %req.symbol, error = %_err, "provider failed");
        })?;

        if series.records.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(provider = p.name(), symbol = %req.symbol, "provider returned no data");
            return Err(WrdataError::not_found(format!(
                "history for {} via {}",
                req.symbol,
                p.name()
            )));
        }

        let rows = normalize(&series.records, &req.symbol);
        let mut resp = DataResponse::ok(&req.symbol, p.name(), rows);
        resp.metadata = series.metadata;
        Ok(resp)
    }
}
