//! FX quote cache error types.

use chrono::NaiveDate;
use fxquote_common::{Currency, ValidationError};
use thiserror::Error;

/// Errors that can occur in the quote cache and engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Date, currency or amount failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `get` was called for rates the cache does not hold.
    #[error("Cache miss for {base} on {date}; check `has` before calling `get`")]
    CacheMiss { base: Currency, date: NaiveDate },

    /// The quote service reported an error or returned an unusable body.
    #[error("Remote quote error: {0}")]
    RemoteQuote(String),

    /// Reading or writing a cache snapshot failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl FxError {
    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Validation(e) => e.error_code(),
            FxError::CacheMiss { .. } => "CACHE_MISS",
            FxError::RemoteQuote(_) => "REMOTE_QUOTE_ERROR",
            FxError::Persistence(_) => "PERSISTENCE_ERROR",
            FxError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Snapshot encoding and file errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Structurally valid input that does not describe a snapshot.
    #[error("Malformed snapshot: {0}")]
    Format(String),
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_keep_their_code() {
        let err: FxError = ValidationError::InvalidAmount("ten".into()).into();
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
        assert_eq!(err.to_string(), "Invalid amount: ten");
    }

    #[test]
    fn test_cache_miss_message() {
        let err = FxError::CacheMiss {
            base: Currency::usd(),
            date: NaiveDate::from_ymd_opt(2018, 1, 10).unwrap(),
        };
        assert_eq!(err.error_code(), "CACHE_MISS");
        assert!(err.to_string().contains("USD on 2018-01-10"));
    }
}
