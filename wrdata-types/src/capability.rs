use core::fmt;
use serde::{Deserialize, Serialize};

use crate::stream::StreamKind;

/// High-level capability labels for routing, errors, and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Capability {
    /// Historical OHLCV bars.
    History,
    /// Multi-symbol history.
    DownloadHistory,
    /// Connectivity probe.
    Validate,
    /// Streaming: trades and best bid/offer.
    StreamTicker,
    /// Streaming: OHLCV bars.
    StreamKline,
    /// Streaming: order book depth.
    StreamDepth,
}

impl Capability {
    /// Stable, kebab-case identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::History => "history",
            Self::DownloadHistory => "download:history",
            Self::Validate => "validate",
            Self::StreamTicker => "stream-ticker",
            Self::StreamKline => "stream-kline",
            Self::StreamDepth => "stream-depth",
        }
    }
}

impl From<StreamKind> for Capability {
    fn from(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Ticker => Self::StreamTicker,
            StreamKind::Kline => Self::StreamKline,
            StreamKind::Depth => Self::StreamDepth,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
