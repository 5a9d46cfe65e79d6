/// Quote currencies recognized when splitting an undashed pair, longest first
/// so `USDT` wins over `USD`.
const QUOTES: [&str; 6] = ["USDT", "USDC", "USD", "EUR", "GBP", "BTC"];

/// Spell `symbol` the way Coinbase products are named (`BTC-USD`).
///
/// Upper-cases the input, keeps an existing dash, splits a known quote
/// currency off the end (`ethusdt` becomes `ETH-USDT`), and otherwise quotes
/// in USD (`SOL` becomes `SOL-USD`).
#[must_use]
pub fn normalize_symbol(symbol: &str) -> String {
    let s = symbol.trim().to_ascii_uppercase().replace('/', "-");
    if s.contains('-') {
        return s;
    }
    for quote in QUOTES {
        if let Some(base) = s.strip_suffix(quote)
            && !base.is_empty()
        {
            return format!("{base}-{quote}");
        }
    }
    format!("{s}-USD")
}
