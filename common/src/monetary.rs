//! Currency, currency-spec and quote types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};

/// Every code the quote service has ever published rates for.
pub const ALL_CURRENCIES: [&str; 33] = [
    "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD", "HRK", "HUF",
    "IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MXN", "MYR", "NOK", "NZD", "PHP", "PLN", "RON",
    "RUB", "SEK", "SGD", "THB", "TRY", "USD", "ZAR",
];

/// Currency code as sent to and received from the quote service.
///
/// Codes are case-sensitive: `usd` is not a known currency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from a code, trimming surrounding whitespace.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_string())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether the code belongs to the known currency universe.
    pub fn is_known(&self) -> bool {
        ALL_CURRENCIES.contains(&self.0.as_str())
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::new("USD")
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Iterate the known currency universe as `Currency` values.
pub fn known_currencies() -> impl Iterator<Item = Currency> {
    ALL_CURRENCIES.iter().map(Currency::new)
}

/// Which target currencies a request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CurrencySpec {
    /// Every currency the service quotes for the date.
    #[default]
    All,
    /// One code.
    Single(Currency),
    /// An ordered list of codes.
    List(Vec<Currency>),
    /// Text too short to name a currency. Normalizes to no codes and never
    /// validates.
    Malformed(String),
}

impl CurrencySpec {
    /// Parse a currency argument.
    ///
    /// Exactly three characters is a single code; anything longer is split on
    /// commas with whitespace trimmed around each code. Shorter text cannot name
    /// a currency and parses to `Malformed`, which `validate` rejects with
    /// `InvalidCurrency`.
    pub fn parse(text: &str) -> Result<Self> {
        match text.chars().count() {
            3 => Ok(CurrencySpec::Single(Currency::new(text))),
            n if n > 3 => Ok(CurrencySpec::List(
                text.trim().split(',').map(Currency::new).collect(),
            )),
            _ => Ok(CurrencySpec::Malformed(text.to_string())),
        }
    }

    /// Parse an optional argument, where `None` means every currency.
    pub fn from_arg(arg: Option<&str>) -> Result<Self> {
        match arg {
            None => Ok(CurrencySpec::All),
            Some(text) => Self::parse(text),
        }
    }

    /// The ordered codes requested, or `None` for every currency.
    pub fn normalize(&self) -> Option<Vec<Currency>> {
        match self {
            CurrencySpec::All | CurrencySpec::Malformed(_) => None,
            CurrencySpec::Single(code) => Some(vec![code.clone()]),
            CurrencySpec::List(codes) => Some(codes.clone()),
        }
    }

    /// Whether every requested code is known. `All` is always valid.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Fail with the first unknown code.
    pub fn validate(&self) -> Result<()> {
        if let CurrencySpec::Malformed(text) = self {
            return Err(ValidationError::InvalidCurrency(text.clone()));
        }
        let Some(codes) = self.normalize() else {
            return Ok(());
        };
        match codes.into_iter().find(|c| !c.is_known()) {
            Some(unknown) => Err(ValidationError::InvalidCurrency(unknown.to_string())),
            None => Ok(()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CurrencySpec::All)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, CurrencySpec::Malformed(_))
    }
}

impl fmt::Display for CurrencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let CurrencySpec::Malformed(text) = self {
            return write!(f, "{}", text);
        }
        match self.normalize() {
            None => write!(f, "all"),
            Some(codes) => {
                let joined: Vec<&str> = codes.iter().map(Currency::code).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

impl FromStr for CurrencySpec {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<Option<&str>> for CurrencySpec {
    type Error = ValidationError;

    fn try_from(arg: Option<&str>) -> Result<Self> {
        Self::from_arg(arg)
    }
}

impl From<Currency> for CurrencySpec {
    fn from(code: Currency) -> Self {
        CurrencySpec::Single(code)
    }
}

impl From<Vec<Currency>> for CurrencySpec {
    fn from(codes: Vec<Currency>) -> Self {
        CurrencySpec::List(codes)
    }
}

impl From<Vec<&str>> for CurrencySpec {
    fn from(codes: Vec<&str>) -> Self {
        CurrencySpec::List(codes.into_iter().map(Currency::new).collect())
    }
}

/// Rates keyed by target currency.
pub type Rates = BTreeMap<Currency, Decimal>;

/// Rates for one base currency on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Currency the rates are expressed against.
    pub base: Currency,
    /// Publication date of the rates.
    pub date: NaiveDate,
    /// Target currency rates.
    pub rates: Rates,
}

impl Quote {
    /// Create a new quote.
    pub fn new(base: Currency, date: NaiveDate, rates: Rates) -> Self {
        Self { base, date, rates }
    }

    /// Rate for a single target.
    pub fn rate(&self, target: &Currency) -> Option<Decimal> {
        self.rates.get(target).copied()
    }
}

/// Coercion of an amount argument into a decimal.
pub trait IntoAmount {
    fn into_amount(self) -> Result<Decimal>;
}

impl IntoAmount for Decimal {
    fn into_amount(self) -> Result<Decimal> {
        Ok(self)
    }
}

impl IntoAmount for &str {
    fn into_amount(self) -> Result<Decimal> {
        let text = self.trim();
        text.parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|_| ValidationError::InvalidAmount(self.to_string()))
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> Result<Decimal> {
        self.as_str().into_amount()
    }
}

impl IntoAmount for &String {
    fn into_amount(self) -> Result<Decimal> {
        self.as_str().into_amount()
    }
}

impl IntoAmount for f64 {
    fn into_amount(self) -> Result<Decimal> {
        Decimal::try_from(self).map_err(|_| ValidationError::InvalidAmount(self.to_string()))
    }
}

macro_rules! impl_into_amount_for_int {
    ($($t:ty),*) => {
        $(
            impl IntoAmount for $t {
                fn into_amount(self) -> Result<Decimal> {
                    Ok(Decimal::from(self))
                }
            }
        )*
    };
}

impl_into_amount_for_int!(i32, i64, u32, u64);
