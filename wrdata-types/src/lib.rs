//! wrdata-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod capability;
mod config;
mod error;
mod market;
mod provider;
mod reports;
mod request;
mod response;
mod stream;

pub use capability::Capability;
pub use config::{BackoffConfig, StreamSettings, WrdataConfig, default_priority};
pub use error::WrdataError;
pub use market::{AssetType, Interval};
pub use provider::ProviderKey;
pub use reports::{GetManyReport, ProviderStatus, StartupReport};
pub use request::{DataRequest, DataRequestBuilder};
pub use response::{Candle, DataResponse, RawRecord, RawSeries, sort_dedup};
pub use stream::{BookLevel, BookSide, CloseReason, StreamKind, StreamMessage, StreamSpec};
