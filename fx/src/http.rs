//! Blocking HTTP fetcher for the quote service.

use fxquote_common::Quote;
use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::config::FetchConfig;
use crate::error::{FxError, FxResult};
use crate::provider::{QuoteFetcher, QuoteRequest, RawQuoteResponse};

/// Fetches quotes over HTTP.
pub struct HttpQuoteFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpQuoteFetcher {
    /// Create a new fetcher from a validated configuration.
    pub fn new(config: FetchConfig) -> FxResult<Self> {
        config.validate().map_err(FxError::Configuration)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FxError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Load the configuration from the environment.
    pub fn from_env() -> FxResult<Self> {
        Self::new(FetchConfig::from_env())
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Full URL for a request's date token.
    pub fn url_for(&self, request: &QuoteRequest) -> String {
        let mut url = self.config.base_url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&request.date.to_string());
        url
    }

    fn query(&self, request: &QuoteRequest) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(3);
        if let Some(key) = &self.config.access_key {
            query.push(("access_key", key.clone()));
        }
        query.push(("base", request.base.to_string()));
        if let Some(symbols) = request.symbols_param() {
            query.push(("symbols", symbols));
        }
        query
    }
}

impl QuoteFetcher for HttpQuoteFetcher {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self), fields(date = %request.date, base = %request.base))]
    fn fetch(&self, request: &QuoteRequest) -> FxResult<Quote> {
        let url = self.url_for(request);
        debug!(url = %url, "Requesting quote");

        let body = self
            .client
            .get(&url)
            .query(&self.query(request))
            .send()
            .and_then(|response| response.text())
            .map_err(|e| FxError::RemoteQuote(format!("request failed: {}", e)))?;

        RawQuoteResponse::from_json(&body)?.into_quote()
    }
}
