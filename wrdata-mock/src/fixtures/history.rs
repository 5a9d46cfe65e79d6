use serde_json::{Value, json};
use wrdata_core::{RawRecord, RawSeries};

/// Symbols with fixture history.
pub const SYMBOLS: &[&str] = &["AAPL", "MSFT", "BTC-USD", "ETH-USD"];

// Each symbol uses a different provider dialect so the normalizer sees them all.
pub fn by_symbol(s: &str) -> Option<RawSeries> {
    match s {
        "AAPL" => Some(daily(vec![
            ("2023-01-02", 140.0, 142.0, 139.0, 141.0, 10_000_000),
            ("2023-01-03", 141.0, 143.0, 140.0, 142.0, 11_000_000),
            ("2023-01-04", 142.0, 144.5, 141.2, 144.1, 9_800_000),
        ])),
        "MSFT" => Some(daily(vec![
            ("2023-01-02", 240.0, 245.0, 238.0, 244.0, 9_000_000),
            ("2023-01-03", 244.0, 246.0, 243.0, 245.0, 9_500_000),
        ])),
        "BTC-USD" => Some(epoch_ms(vec![
            (1_672_617_600_000, "16625.5", "16760.1", "16551.0", "16688.4", "12.5"),
            (1_672_704_000_000, "16688.4", "16770.0", "16600.2", "16679.9", "10.75"),
        ])),
        "ETH-USD" => Some(rfc3339(vec![
            ("2023-01-02T00:00:00Z", "1200.6", "1220.0", "1195.1", "1214.8", "310.2"),
            ("2023-01-03T00:00:00Z", "1214.8", "1219.9", "1205.3", "1214.2", "280.0"),
        ])),
        _ => None,
    }
}

fn record<const N: usize>(pairs: [(&str, Value); N]) -> RawRecord {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn daily(rows: Vec<(&str, f64, f64, f64, f64, u64)>) -> RawSeries {
    let records = rows
        .into_iter()
        .map(|(date, o, h, l, c, v)| {
            record([
                ("Date", json!(date)),
                ("Open", json!(o)),
                ("High", json!(h)),
                ("Low", json!(l)),
                ("Close", json!(c)),
                ("Adj Close", json!(c)),
                ("Volume", json!(v)),
            ])
        })
        .collect();
    RawSeries::new(records)
}

fn epoch_ms(rows: Vec<(i64, &str, &str, &str, &str, &str)>) -> RawSeries {
    let records = rows
        .into_iter()
        .map(|(ts, o, h, l, c, v)| {
            record([
                ("timestamp", json!(ts)),
                ("open", json!(o)),
                ("high", json!(h)),
                ("low", json!(l)),
                ("close", json!(c)),
                ("volume", json!(v)),
            ])
        })
        .collect();
    let mut series = RawSeries::new(records);
    series
        .metadata
        .insert("granularity".into(), json!(86_400));
    series
}

fn rfc3339(rows: Vec<(&str, &str, &str, &str, &str, &str)>) -> RawSeries {
    let records = rows
        .into_iter()
        .map(|(ts, o, h, l, c, v)| {
            record([
                ("datetime", json!(ts)),
                ("open", json!(o)),
                ("high", json!(h)),
                ("low", json!(l)),
                ("close", json!(c)),
                ("volume", json!(v)),
            ])
        })
        .collect();
    RawSeries::new(records)
}
