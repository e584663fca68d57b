//! Validation error types shared by the fxquote crates.

use thiserror::Error;

/// Input validation failures.
///
/// These are raised before any cache or network interaction takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Malformed date text, or a date outside the supported range.
    #[error("Invalid date: {0} (expected 'latest' or YYYY-MM-DD between 1999-01-04 and today)")]
    InvalidDate(String),

    /// Currency code not in the known universe, or a missing code.
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Currency argument that cannot be read as a code or comma-separated list.
    #[error("Currency unavailable: {0} (use a code such as 'USD' or a list such as 'USD,JPY')")]
    CurrencyUnavailable(String),

    /// Amount that cannot be coerced to a decimal.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl ValidationError {
    /// Get a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::InvalidDate(_) => "INVALID_DATE",
            ValidationError::InvalidCurrency(_) => "INVALID_CURRENCY",
            ValidationError::CurrencyUnavailable(_) => "CURRENCY_UNAVAILABLE",
            ValidationError::InvalidAmount(_) => "INVALID_AMOUNT",
        }
    }
}

/// Result type alias for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;
