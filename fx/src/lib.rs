//! FxQuote FX Engine
//!
//! Client-side foreign exchange quotes with a local, era-aware cache.
//!
//! # Features
//!
//! - Date and currency validation before any remote call
//! - Quote cache keyed by base and publication date, optionally mirrored to disk
//! - JSON and CSV snapshots of the cache
//! - Blocking HTTP fetcher behind the `http` feature
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxquote_fx::{FxEngine, FxEngineConfig, FetchConfig, HttpQuoteFetcher};
//! use fxquote_common::{Currency, DateToken};
//!
//! let fetcher = Arc::new(HttpQuoteFetcher::new(FetchConfig::from_env())?);
//! let engine = FxEngine::open(fetcher, FxEngineConfig::from_env())?;
//!
//! let yen = engine.convert("20", &Currency::usd(), &Currency::jpy(), DateToken::Latest)?;
//! ```

pub mod cache;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod era;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod persistence;
pub mod provider;

pub use cache::{CacheStats, QuoteCache, QuoteCacheConfig, SharedQuoteCache};
pub use config::{FetchConfig, FxEngineConfig};
pub use conversion::{Conversion, ConversionRequest};
pub use engine::{FxEngine, FxEngineStats};
pub use era::{CurrencyEra, EraTable};
pub use error::{FxError, FxResult, PersistenceError};
#[cfg(feature = "http")]
pub use http::HttpQuoteFetcher;
pub use persistence::{Snapshot, SnapshotFile, SnapshotFormat};
pub use provider::{QuoteFetcher, QuoteRequest, RawQuoteResponse};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockQuoteFetcher;
