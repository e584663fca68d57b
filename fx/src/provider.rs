//! Quote fetcher trait and the quote service's response shape.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fxquote_common::{Currency, DateToken, Quote, Rates};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FxError, FxResult};

/// Trait for remote quote sources.
///
/// Fetching blocks the calling thread; timeouts and cancellation belong to the
/// implementation.
pub trait QuoteFetcher: Send + Sync {
    /// Get the fetcher name.
    fn name(&self) -> &str;

    /// Fetch a quote for the request.
    fn fetch(&self, request: &QuoteRequest) -> FxResult<Quote>;
}

/// Parameters of a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    /// Date token as the service understands it.
    pub date: DateToken,
    /// Base currency.
    pub base: Currency,
    /// Target currencies, or `None` for all of them.
    pub symbols: Option<Vec<Currency>>,
}

impl QuoteRequest {
    pub fn new(date: DateToken, base: Currency, symbols: Option<Vec<Currency>>) -> Self {
        Self {
            date,
            base,
            symbols,
        }
    }

    /// Comma-joined `symbols` query value.
    pub fn symbols_param(&self) -> Option<String> {
        self.symbols.as_ref().map(|codes| {
            codes
                .iter()
                .map(Currency::code)
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

/// Body of a quote service response.
///
/// A successful body carries `base`, `date` and `rates`; a failed one carries
/// `error`, either as a bare value or as `{code, type, info}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuoteResponse {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rates: Option<BTreeMap<String, Decimal>>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl RawQuoteResponse {
    /// Parse a response body.
    pub fn from_json(body: &str) -> FxResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| FxError::RemoteQuote(format!("unreadable response body: {}", e)))
    }

    /// Convert into a quote, surfacing a service-reported error.
    pub fn into_quote(self) -> FxResult<Quote> {
        if let Some(error) = &self.error {
            return Err(FxError::RemoteQuote(describe_service_error(error)));
        }

        let missing = |field: &str| FxError::RemoteQuote(format!("response has no '{}' field", field));
        let base = self.base.ok_or_else(|| missing("base"))?;
        let date = self.date.ok_or_else(|| missing("date"))?;
        let rates = self.rates.ok_or_else(|| missing("rates"))?;

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| FxError::RemoteQuote(format!("response date '{}' is not YYYY-MM-DD", date)))?;

        let rates: Rates = rates
            .into_iter()
            .map(|(code, rate)| (Currency::new(code), rate))
            .collect();

        Ok(Quote::new(Currency::new(base), date, rates))
    }
}

/// Description of a numeric service error code.
pub fn error_description(code: u64) -> Option<&'static str> {
    let description = match code {
        101 => "No API Key was specified or an invalid API Key was specified.",
        102 => "The account this API request is coming from is inactive.",
        103 => "The requested API endpoint does not exist.",
        104 => "The maximum allowed API amount of monthly API requests has been reached.",
        105 => "The current subscription plan does not support this API endpoint.",
        106 => "The current request did not return any results.",
        201 => "An invalid base currency has been entered.",
        202 => "One or more invalid symbols have been specified.",
        301 => "No date has been specified.",
        302 => "An invalid date has been specified.",
        403 => "No or an invalid amount has been specified.",
        404 => "The requested resource does not exist.",
        501 => "No or an invalid timeframe has been specified.",
        502 => "No or an invalid \"start_date\" has been specified.",
        503 => "No or an invalid \"end_date\" has been specified.",
        504 => "An invalid timeframe has been specified.",
        505 => "The specified timeframe is too long, exceeding 365 days.",
        _ => return None,
    };
    Some(description)
}

fn describe_service_error(error: &Value) -> String {
    let with_code = |code: u64, detail: Option<&str>| {
        let known = error_description(code);
        match (known, detail) {
            (Some(known), Some(detail)) => format!("code {}: {} ({})", code, known, detail),
            (Some(known), None) => format!("code {}: {}", code, known),
            (None, Some(detail)) => format!("code {}: {}", code, detail),
            (None, None) => format!("code {}", code),
        }
    };

    match error {
        Value::Number(n) => match n.as_u64() {
            Some(code) => with_code(code, None),
            None => n.to_string(),
        },
        Value::String(message) => message.clone(),
        Value::Object(fields) => {
            let detail = fields
                .get("info")
                .or_else(|| fields.get("type"))
                .and_then(Value::as_str);
            match fields.get("code").and_then(Value::as_u64) {
                Some(code) => with_code(code, detail),
                None => detail.map(str::to_string).unwrap_or_else(|| error.to_string()),
            }
        }
        other => other.to_string(),
    }
}

/// Mock quote fetcher for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockQuoteFetcher {
    name: String,
    quotes: parking_lot::Mutex<std::collections::HashMap<(Currency, DateToken), Quote>>,
    failure: parking_lot::Mutex<Option<String>>,
    requests: parking_lot::Mutex<Vec<QuoteRequest>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockQuoteFetcher {
    /// Create a new mock fetcher.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quotes: parking_lot::Mutex::new(std::collections::HashMap::new()),
            failure: parking_lot::Mutex::new(None),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Serve `quote` for requests on its own date.
    pub fn set_quote(&self, quote: Quote) {
        self.set_quote_for(DateToken::On(quote.date), quote);
    }

    /// Serve `quote` for requests carrying `token`.
    pub fn set_quote_for(&self, token: DateToken, quote: Quote) {
        self.quotes.lock().insert((quote.base.clone(), token), quote);
    }

    /// Make every subsequent fetch fail with a service error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl QuoteFetcher for MockQuoteFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, request: &QuoteRequest) -> FxResult<Quote> {
        self.requests.lock().push(request.clone());

        if let Some(message) = self.failure.lock().clone() {
            return Err(FxError::RemoteQuote(message));
        }

        let quote = self
            .quotes
            .lock()
            .get(&(request.base.clone(), request.date))
            .cloned()
            .ok_or_else(|| {
                FxError::RemoteQuote(format!(
                    "code 106: {}",
                    error_description(106).unwrap_or_default()
                ))
            })?;

        match &request.symbols {
            None => Ok(quote),
            Some(symbols) => {
                let rates = quote
                    .rates
                    .into_iter()
                    .filter(|(code, _)| symbols.contains(code))
                    .collect();
                Ok(Quote::new(quote.base, quote.date, rates))
            }
        }
    }
}
