//! Re-export of foundational types from `wrdata-types`.
// Consolidated re-exports so downstream crates can depend on `wrdata-core` only

pub use wrdata_types::{Capability, ProviderKey, WrdataError};

pub use wrdata_types::{
    BackoffConfig, GetManyReport, ProviderStatus, StartupReport, StreamSettings, WrdataConfig,
    default_priority,
};

pub use wrdata_types::{AssetType, DataRequest, DataRequestBuilder, Interval};

pub use wrdata_types::{Candle, DataResponse, RawRecord, RawSeries, sort_dedup};

pub use wrdata_types::{BookLevel, BookSide, CloseReason, StreamKind, StreamMessage, StreamSpec};

pub use rust_decimal::Decimal;
