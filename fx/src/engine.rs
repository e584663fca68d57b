//! Main FX engine implementation.

use std::sync::Arc;

use fxquote_common::{
    now, resolve_update_date_at, validate_date_at, Currency, CurrencySpec, DateToken, IntoAmount,
    Quote, Rates, Timestamp, ValidationError,
};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use crate::cache::{CacheStats, QuoteCache};
use crate::config::FxEngineConfig;
use crate::conversion::{Conversion, ConversionRequest};
use crate::error::{FxError, FxResult};
use crate::persistence::Snapshot;
use crate::provider::{QuoteFetcher, QuoteRequest};

/// The main FX engine: validates requests, answers from the cache when it can
/// and fetches otherwise.
pub struct FxEngine {
    fetcher: Arc<dyn QuoteFetcher>,
    cache: QuoteCache,
    config: FxEngineConfig,
    clock: fn() -> Timestamp,
}

impl FxEngine {
    /// Create a new FX engine with the given fetcher and an empty cache.
    pub fn new(fetcher: Arc<dyn QuoteFetcher>, config: FxEngineConfig) -> Self {
        Self {
            fetcher,
            cache: QuoteCache::with_config(config.cache.clone()),
            config,
            clock: now,
        }
    }

    /// Validate `config` and seed the cache from its snapshot file, if any.
    pub fn open(fetcher: Arc<dyn QuoteFetcher>, config: FxEngineConfig) -> FxResult<Self> {
        config.validate().map_err(FxError::Configuration)?;

        let cache = match &config.seed {
            Some(seed) => QuoteCache::load(seed, config.cache.clone())?,
            None => QuoteCache::with_config(config.cache.clone()),
        };

        Ok(Self {
            fetcher,
            cache,
            config,
            clock: now,
        })
    }

    /// Replace the clock used to resolve `latest` and bound dates.
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    /// Rates for `base` on `date`, restricted to `symbols`.
    ///
    /// Every argument is validated before the cache or the fetcher is touched.
    /// A fetched quote is cached under the date the service reports for it.
    #[instrument(skip(self), fields(date = %date, base = %base, symbols = %symbols))]
    pub fn get_rates(
        &self,
        date: DateToken,
        base: &Currency,
        symbols: &CurrencySpec,
    ) -> FxResult<Rates> {
        let now = (self.clock)();
        validate_date_at(date, now)?;
        validate_base(base)?;
        symbols.validate()?;

        let resolved = resolve_update_date_at(date, now);
        if self.config.use_cache {
            if let Some(rates) = self.cache.lookup(base, symbols, resolved) {
                debug!(resolved = %resolved, "Using cached rates");
                return Ok(rates);
            }
        }

        let quote = self.fetch_and_store(date, base, symbols)?;
        Ok(quote.rates)
    }

    /// Convert `amount` of `base` into `target`.
    pub fn convert(
        &self,
        amount: impl IntoAmount,
        base: &Currency,
        target: &Currency,
        date: DateToken,
    ) -> FxResult<Decimal> {
        Ok(self.convert_detailed(amount, base, target, date)?.output)
    }

    /// Convert and return the full conversion record.
    ///
    /// Same-currency conversions return the amount before any currency
    /// validation, cache lookup or fetch.
    #[instrument(skip(self, amount), fields(base = %base, target = %target, date = %date))]
    pub fn convert_detailed(
        &self,
        amount: impl IntoAmount,
        base: &Currency,
        target: &Currency,
        date: DateToken,
    ) -> FxResult<Conversion> {
        if target.code().is_empty() {
            return Err(ValidationError::InvalidCurrency("missing target currency".to_string()).into());
        }

        let amount = amount.into_amount()?;
        if base == target {
            return Ok(Conversion::identity(amount, base.clone()));
        }

        CurrencySpec::List(vec![base.clone(), target.clone()]).validate()?;
        let now = (self.clock)();
        validate_date_at(date, now)?;

        let symbols = CurrencySpec::Single(target.clone());
        let resolved = resolve_update_date_at(date, now);

        let cached = if self.config.use_cache {
            self.cache
                .lookup(base, &symbols, resolved)
                .and_then(|rates| rates.get(target).copied())
        } else {
            None
        };

        let conversion = match cached {
            Some(rate) => Conversion::at_rate(amount, base.clone(), target.clone(), resolved, rate)?,
            None => {
                let quote = self.fetch_and_store(date, base, &symbols)?;
                let rate = quote.rate(target).ok_or_else(|| {
                    FxError::RemoteQuote(format!("response has no {} rate for {}", target, base))
                })?;
                Conversion::at_rate(amount, base.clone(), target.clone(), quote.date, rate)?
            }
        };

        info!(
            rate = %conversion.rate,
            output = %conversion.output,
            "Conversion completed"
        );

        Ok(conversion)
    }

    /// Convert using a request, falling back to the default base.
    pub fn convert_request(&self, request: &ConversionRequest) -> FxResult<Conversion> {
        let base = request
            .base
            .clone()
            .unwrap_or_else(|| self.config.default_base.clone());
        self.convert_detailed(request.amount, &base, &request.target, request.date)
    }

    /// Get the quote cache.
    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Copy of every cached quote.
    pub fn snapshot(&self) -> Snapshot {
        self.cache.snapshot()
    }

    /// Drop every cached quote.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn default_base(&self) -> &Currency {
        &self.config.default_base
    }

    /// Get engine statistics.
    pub fn stats(&self) -> FxEngineStats {
        FxEngineStats {
            fetcher: self.fetcher.name().to_string(),
            cache_stats: self.cache.stats(),
        }
    }

    fn fetch_and_store(
        &self,
        date: DateToken,
        base: &Currency,
        symbols: &CurrencySpec,
    ) -> FxResult<Quote> {
        let request = QuoteRequest::new(date, base.clone(), symbols.normalize());
        let quote = self.fetcher.fetch(&request)?;

        info!(
            fetcher = self.fetcher.name(),
            base = %quote.base,
            date = %quote.date,
            rates = quote.rates.len(),
            "Fetched quote"
        );

        if self.config.use_cache {
            self.cache.put(quote.clone())?;
        }

        Ok(quote)
    }
}

fn validate_base(base: &Currency) -> Result<(), ValidationError> {
    if base.is_known() {
        Ok(())
    } else {
        Err(ValidationError::InvalidCurrency(base.to_string()))
    }
}

/// Engine statistics.
#[derive(Debug, Clone)]
pub struct FxEngineStats {
    pub fetcher: String,
    pub cache_stats: CacheStats,
}
