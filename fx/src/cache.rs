//! Quote cache keyed by base currency and publication date.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use fxquote_common::{Currency, CurrencySpec, Quote, Rates};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::era::EraTable;
use crate::error::{FxError, FxResult};
use crate::persistence::{self, Snapshot, SnapshotFile};

/// Configuration for the quote cache.
#[derive(Debug, Clone, Default)]
pub struct QuoteCacheConfig {
    /// File rewritten with the full snapshot after every insert.
    pub mirror: Option<SnapshotFile>,
    /// Completeness rules for "all rates" requests.
    pub eras: EraTable,
}

/// Thread-safe quote cache.
///
/// Holds at most one rate map per (base, date). Entries never expire; callers
/// clear the cache when freshness matters, notably once a resolved `latest`
/// date has rolled over.
pub struct QuoteCache {
    entries: Mutex<Snapshot>,
    config: QuoteCacheConfig,
}

impl QuoteCache {
    /// Create an empty cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(QuoteCacheConfig::default())
    }

    /// Create an empty cache with custom configuration.
    pub fn with_config(config: QuoteCacheConfig) -> Self {
        Self::from_snapshot(Snapshot::new(), config)
    }

    /// Create a cache holding `snapshot`.
    pub fn from_snapshot(snapshot: Snapshot, config: QuoteCacheConfig) -> Self {
        Self {
            entries: Mutex::new(snapshot),
            config,
        }
    }

    /// Seed a cache from a snapshot file.
    pub fn load(file: &SnapshotFile, config: QuoteCacheConfig) -> FxResult<Self> {
        let snapshot = persistence::read_snapshot(file)?;
        debug!(
            path = %file.path.display(),
            bases = snapshot.len(),
            "Loaded cache snapshot"
        );
        Ok(Self::from_snapshot(snapshot, config))
    }

    /// Whether the cached entry for (base, date) covers the requested symbols.
    ///
    /// An `All` request must cover every currency the service quoted on that
    /// date, apart from `base` itself.
    pub fn has(&self, base: &Currency, symbols: &CurrencySpec, date: NaiveDate) -> bool {
        let entries = self.entries.lock();
        self.covering_entry(&entries, base, symbols, date).is_some()
    }

    /// Cached rates restricted to the requested symbols.
    ///
    /// Fails with `CacheMiss` unless `has` holds for the same arguments.
    pub fn get(&self, base: &Currency, symbols: &CurrencySpec, date: NaiveDate) -> FxResult<Rates> {
        self.lookup(base, symbols, date)
            .ok_or_else(|| FxError::CacheMiss {
                base: base.clone(),
                date,
            })
    }

    /// `has` followed by `get` under a single lock acquisition.
    pub fn lookup(&self, base: &Currency, symbols: &CurrencySpec, date: NaiveDate) -> Option<Rates> {
        let entries = self.entries.lock();
        match self.covering_entry(&entries, base, symbols, date) {
            Some(rates) => {
                debug!(base = %base, date = %date, symbols = %symbols, "Cache hit");
                Some(restrict(rates, symbols))
            }
            None => {
                debug!(base = %base, date = %date, symbols = %symbols, "Cache miss");
                None
            }
        }
    }

    /// Insert a quote, replacing any rate map held for its (base, date).
    ///
    /// With a mirror configured the snapshot file is rewritten; a failed write
    /// is returned but the in-memory entry is kept.
    pub fn put(&self, quote: Quote) -> FxResult<()> {
        let mut entries = self.entries.lock();
        debug!(
            base = %quote.base,
            date = %quote.date,
            rates = quote.rates.len(),
            "Caching quote"
        );
        entries
            .entry(quote.base)
            .or_default()
            .insert(quote.date, quote.rates);

        if let Some(mirror) = &self.config.mirror {
            if let Err(e) = persistence::write_snapshot(mirror, &entries) {
                warn!(path = %mirror.path.display(), error = %e, "Failed to mirror cache");
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Clear all cached quotes.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Copy of the full cache contents.
    pub fn snapshot(&self) -> Snapshot {
        self.entries.lock().clone()
    }

    /// Number of cached (base, date) entries.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(|dates| dates.len()).sum()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            bases: entries.len(),
            entries: entries.values().map(|dates| dates.len()).sum(),
            rates: entries
                .values()
                .flat_map(|dates| dates.values())
                .map(|rates| rates.len())
                .sum(),
        }
    }

    pub fn config(&self) -> &QuoteCacheConfig {
        &self.config
    }

    fn covering_entry<'a>(
        &self,
        entries: &'a Snapshot,
        base: &Currency,
        symbols: &CurrencySpec,
        date: NaiveDate,
    ) -> Option<&'a Rates> {
        if symbols.is_malformed() {
            return None;
        }
        let rates = entries.get(base)?.get(&date)?;
        let required = self.required_codes(base, symbols, date);
        required
            .iter()
            .all(|code| rates.contains_key(code))
            .then_some(rates)
    }

    fn required_codes(&self, base: &Currency, symbols: &CurrencySpec, date: NaiveDate) -> BTreeSet<Currency> {
        match symbols.normalize() {
            Some(codes) => codes.into_iter().collect(),
            None => self.config.eras.complete_set(date, base),
        }
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new()
    }
}

fn restrict(rates: &Rates, symbols: &CurrencySpec) -> Rates {
    match symbols.normalize() {
        None => rates.clone(),
        Some(codes) => rates
            .iter()
            .filter(|(code, _)| codes.contains(code))
            .map(|(code, rate)| (code.clone(), *rate))
            .collect(),
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub bases: usize,
    pub entries: usize,
    pub rates: usize,
}

/// Shared quote cache.
pub type SharedQuoteCache = Arc<QuoteCache>;

#[cfg(test)]
mod tests {
    use super::*;
    use fxquote_common::{known_currencies, ValidationError};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn jpy_quote() -> Quote {
        let mut rates = Rates::new();
        rates.insert(Currency::jpy(), dec!(110.5));
        rates.insert(Currency::eur(), dec!(0.8341));
        Quote::new(Currency::usd(), day(2018, 1, 10), rates)
    }

    /// Every known code except `base` and `missing`.
    fn full_quote(base: &str, date: NaiveDate, missing: &[&str]) -> Quote {
        let rates = known_currencies()
            .filter(|c| c.code() != base && !missing.contains(&c.code()))
            .map(|c| (c, dec!(1.5)))
            .collect();
        Quote::new(Currency::new(base), date, rates)
    }

    fn spec(text: &str) -> CurrencySpec {
        CurrencySpec::parse(text).unwrap()
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = QuoteCache::new();
        assert!(!cache.has(&Currency::usd(), &spec("JPY"), day(2018, 1, 10)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_then_has_symbol() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();

        assert!(cache.has(&Currency::usd(), &spec("JPY"), day(2018, 1, 10)));
        assert!(cache.has(&Currency::usd(), &spec("JPY,EUR"), day(2018, 1, 10)));
        assert!(!cache.has(&Currency::usd(), &spec("JPY,GBP"), day(2018, 1, 10)));
        assert!(!cache.has(&Currency::usd(), &spec("JPY"), day(2018, 1, 11)));
        assert!(!cache.has(&Currency::eur(), &spec("JPY"), day(2018, 1, 10)));
    }

    #[test]
    fn test_get_restricts_to_symbols() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();

        let rates = cache
            .get(&Currency::usd(), &spec("JPY"), day(2018, 1, 10))
            .unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[&Currency::jpy()], dec!(110.5));
    }

    #[test]
    fn test_get_on_miss_is_an_error() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();

        let result = cache.get(&Currency::usd(), &spec("GBP"), day(2018, 1, 10));
        assert!(matches!(result, Err(FxError::CacheMiss { .. })));
    }

    #[test]
    fn test_partial_entry_is_incomplete_for_all() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();
        assert!(!cache.has(&Currency::usd(), &CurrencySpec::All, day(2018, 1, 10)));
    }

    #[test]
    fn test_full_entry_round_trips_for_all() {
        let cache = QuoteCache::new();
        let quote = full_quote("USD", day(2018, 3, 1), &[]);
        cache.put(quote.clone()).unwrap();

        assert!(cache.has(&Currency::usd(), &CurrencySpec::All, quote.date));
        assert_eq!(
            cache.get(&Currency::usd(), &CurrencySpec::All, quote.date).unwrap(),
            quote.rates
        );
    }

    #[test]
    fn test_era_completeness() {
        let cache = QuoteCache::new();
        let early = full_quote("USD", day(2010, 6, 1), &["ISK", "ILS"]);
        cache.put(early.clone()).unwrap();
        assert!(cache.has(&Currency::usd(), &CurrencySpec::All, early.date));

        let middle = full_quote("USD", day(2015, 6, 1), &["ISK", "ILS"]);
        cache.put(middle.clone()).unwrap();
        assert!(!cache.has(&Currency::usd(), &CurrencySpec::All, middle.date));

        let middle = full_quote("USD", day(2015, 6, 1), &["ISK"]);
        cache.put(middle.clone()).unwrap();
        assert!(cache.has(&Currency::usd(), &CurrencySpec::All, middle.date));

        let late = full_quote("USD", day(2018, 2, 1), &["ISK"]);
        cache.put(late.clone()).unwrap();
        assert!(!cache.has(&Currency::usd(), &CurrencySpec::All, late.date));
    }

    #[test]
    fn test_put_replaces_whole_map() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();

        let mut rates = Rates::new();
        rates.insert(Currency::gbp(), dec!(0.74));
        cache
            .put(Quote::new(Currency::usd(), day(2018, 1, 10), rates))
            .unwrap();

        assert!(cache.has(&Currency::usd(), &spec("GBP"), day(2018, 1, 10)));
        assert!(!cache.has(&Currency::usd(), &spec("JPY"), day(2018, 1, 10)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();
        cache.put(full_quote("EUR", day(2018, 1, 10), &[])).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.has(&Currency::usd(), &spec("JPY"), day(2018, 1, 10)));
    }

    #[test]
    fn test_stats() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();
        let mut later = jpy_quote();
        later.date = day(2018, 1, 11);
        cache.put(later).unwrap();

        assert_eq!(
            cache.stats(),
            CacheStats {
                bases: 1,
                entries: 2,
                rates: 4
            }
        );
    }

    #[test]
    fn test_mirror_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::csv(dir.path().join("cache.csv"));
        let cache = QuoteCache::with_config(QuoteCacheConfig {
            mirror: Some(file.clone()),
            ..Default::default()
        });
        cache.put(jpy_quote()).unwrap();

        let reloaded = QuoteCache::load(&file, QuoteCacheConfig::default()).unwrap();
        assert_eq!(reloaded.snapshot(), cache.snapshot());
        assert!(reloaded.has(&Currency::usd(), &spec("JPY"), day(2018, 1, 10)));
    }

    #[test]
    fn test_mirror_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::json(dir.path().join("missing").join("cache.json"));
        let cache = QuoteCache::with_config(QuoteCacheConfig {
            mirror: Some(file),
            ..Default::default()
        });

        let result = cache.put(jpy_quote());
        assert!(matches!(result, Err(FxError::Persistence(_))));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_symbols_never_hit() {
        let cache = QuoteCache::new();
        cache.put(jpy_quote()).unwrap();
        let unknown = spec("XYZ");
        assert_eq!(
            unknown.validate(),
            Err(ValidationError::InvalidCurrency("XYZ".into()))
        );
        assert!(!cache.has(&Currency::usd(), &unknown, day(2018, 1, 10)));
    }

    #[test]
    fn test_short_symbol_text_never_hits_full_entry() {
        let cache = QuoteCache::new();
        let quote = full_quote("USD", day(2018, 3, 1), &[]);
        cache.put(quote.clone()).unwrap();

        let short = spec("US");
        assert!(!cache.has(&Currency::usd(), &short, quote.date));
        assert!(matches!(
            cache.get(&Currency::usd(), &short, quote.date),
            Err(FxError::CacheMiss { .. })
        ));
    }

    proptest! {
        #[test]
        fn pre_2011_entries_without_isk_ils_are_complete(offset in 0i64..4381) {
            let date = day(1999, 1, 4) + chrono::Duration::days(offset);
            prop_assume!(date < day(2011, 1, 3));

            let cache = QuoteCache::new();
            cache.put(full_quote("USD", date, &["ISK", "ILS"])).unwrap();
            prop_assert!(cache.has(&Currency::usd(), &CurrencySpec::All, date));

            let late = day(2018, 2, 1) + chrono::Duration::days(offset);
            cache.put(full_quote("USD", late, &["ISK", "ILS"])).unwrap();
            prop_assert!(!cache.has(&Currency::usd(), &CurrencySpec::All, late));
        }
    }
}
