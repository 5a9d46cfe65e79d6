use std::collections::BTreeMap;

use wrdata_core::{Capability, ProviderStatus};

use crate::core::DataStream;

impl DataStream {
    /// Probe every registered provider.
    ///
    /// Behavior and trade-offs:
    /// - Probes run concurrently and honor the per-provider timeout when one is
    ///   configured; a timed-out probe reads as disconnected with an `error`.
    /// - `streaming` reflects whether the stream provider of the same name holds
    ///   an open connection. Stream-only providers are listed too, with
    ///   `connected` mirroring their stream state.
    pub async fn status(&self) -> BTreeMap<String, ProviderStatus> {
        let streaming = self.streams.status();

        let probes = self.providers.iter().map(|p| async move {
            let probe = Self::provider_call_with_timeout(
                p.name(),
                Capability::Validate.as_str(),
                self.cfg.provider_timeout,
                async { Ok(p.validate_connection().await) },
            )
            .await;
            (p, probe)
        });

        let mut out = BTreeMap::new();
        for (p, probe) in futures::future::join_all(probes).await {
            let (connected, error) = match probe {
                Ok(ok) => (ok, None),
                Err(e) => (false, Some(e.to_string())),
            };
            out.insert(
                p.name().to_string(),
                ProviderStatus {
                    connected,
                    supports_options: p.supports_options(),
                    supports_historical_options: p.supports_historical_options(),
                    streaming: streaming.get(p.name()).copied().unwrap_or(false),
                    error,
                    vendor: Some(p.vendor().to_string()),
                },
            );
        }

        for (name, live) in streaming {
            out.entry(name).or_insert(ProviderStatus {
                connected: live,
                streaming: live,
                ..ProviderStatus::default()
            });
        }
        out
    }
}
