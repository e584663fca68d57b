//! Currency conversion types.

use chrono::NaiveDate;
use fxquote_common::{Currency, DateToken, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a completed currency conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    /// Input amount, in `base`.
    pub amount: Decimal,
    pub base: Currency,
    pub target: Currency,
    /// Publication date of the rate; `None` when no rate was needed.
    pub date: Option<NaiveDate>,
    /// Rate applied.
    pub rate: Decimal,
    /// Output amount, in `target`.
    pub output: Decimal,
}

impl Conversion {
    /// A same-currency conversion that returns the amount untouched.
    pub fn identity(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount,
            base: currency.clone(),
            target: currency,
            date: None,
            rate: Decimal::ONE,
            output: amount,
        }
    }

    /// A conversion at a quoted rate.
    ///
    /// Fails with `InvalidAmount` when the output does not fit a `Decimal`.
    pub fn at_rate(
        amount: Decimal,
        base: Currency,
        target: Currency,
        date: NaiveDate,
        rate: Decimal,
    ) -> Result<Self, ValidationError> {
        let output = amount.checked_mul(rate).ok_or_else(|| {
            ValidationError::InvalidAmount(format!("{} at rate {} overflows", amount, rate))
        })?;

        Ok(Self {
            amount,
            base,
            target,
            date: Some(date),
            rate,
            output,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.date.is_none()
    }
}

/// Request to perform a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Amount to convert.
    pub amount: Decimal,
    /// Source currency; the engine's default base when unset.
    pub base: Option<Currency>,
    /// Target currency.
    pub target: Currency,
    /// Rate date.
    pub date: DateToken,
}

impl ConversionRequest {
    /// Convert `amount` of the default base into `target` at the latest rate.
    pub fn new(amount: Decimal, target: Currency) -> Self {
        Self {
            amount,
            base: None,
            target,
            date: DateToken::Latest,
        }
    }

    /// Convert from a specific base.
    pub fn from(mut self, base: Currency) -> Self {
        self.base = Some(base);
        self
    }

    /// Use the rate published on `date`.
    pub fn on(mut self, date: impl Into<DateToken>) -> Self {
        self.date = date.into();
        self
    }
}
