use std::collections::BTreeSet;

use wrdata_core::GetManyReport;

use crate::core::{DataStream, GetOptions};

impl DataStream {
    /// Fetch history for several symbols with the same options.
    ///
    /// Behavior and trade-offs:
    /// - Symbols are routed concurrently; each one runs its own sequential
    ///   fallback chain exactly like [`get`](Self::get).
    /// - Duplicate symbols are fetched once.
    /// - Every requested symbol gets an entry in [`GetManyReport::data`]; failed
    ///   symbols map to an empty vector and are listed in `failed`, with the
    ///   matching error at the same index in `warnings`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "wrdata::router::get_many",
            skip(self, symbols, opts),
            fields(symbols = symbols.len()),
        )
    )]
    pub async fn get_many<S: AsRef<str>>(&self, symbols: &[S], opts: &GetOptions) -> GetManyReport {
        let unique: BTreeSet<&str> = symbols.iter().map(AsRef::as_ref).collect();

        let tasks = unique.into_iter().map(|symbol| async move {
            let res = self.get(symbol, opts).await;
            (symbol, res)
        });
        let joined = futures::future::join_all(tasks).await;

        let mut report = GetManyReport::default();
        for (symbol, result) in joined {
            match result {
                Ok(rows) => {
                    report.data.insert(symbol.to_string(), rows);
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(symbol = symbol, error = %e, "symbol failed in batch download");
                    report.data.insert(symbol.to_string(), Vec::new());
                    report.failed.push(symbol.to_string());
                    report.warnings.push(e);
                }
            }
        }
        report
    }
}
