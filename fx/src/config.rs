//! Fetcher and engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use fxquote_common::Currency;
use tracing::warn;

use crate::cache::QuoteCacheConfig;
use crate::persistence::{SnapshotFile, SnapshotFormat};

/// Keyless endpoint.
pub const OPEN_BASE_URL: &str = "https://api.fixer.io/";
/// Free-plan endpoint.
pub const FREE_BASE_URL: &str = "http://data.fixer.io/api/";
/// Paid-plan endpoint.
pub const PAID_BASE_URL: &str = "https://data.fixer.io/api/";

/// Base currency used when a request names none.
pub const DEFAULT_BASE: &str = "USD";

/// Configuration for the HTTP quote fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// URL the date token is appended to.
    pub base_url: String,
    /// Access key sent as `access_key`.
    pub access_key: Option<String>,
    /// Paid plans require an access key.
    pub paid_membership: bool,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_BASE_URL.to_string(),
            access_key: None,
            paid_membership: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetchConfig {
    /// Paid-plan configuration.
    pub fn paid(access_key: impl Into<String>) -> Self {
        Self {
            base_url: PAID_BASE_URL.to_string(),
            access_key: Some(access_key.into()),
            paid_membership: true,
            ..Default::default()
        }
    }

    /// Free-plan configuration.
    pub fn free(access_key: impl Into<String>) -> Self {
        Self {
            base_url: FREE_BASE_URL.to_string(),
            access_key: Some(access_key.into()),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(paid) = lookup("FXQUOTE_PAID_MEMBERSHIP").and_then(|v| parse_flag(&v)) {
            config.paid_membership = paid;
            if paid {
                config.base_url = PAID_BASE_URL.to_string();
            }
        }

        if let Some(url) = lookup("FXQUOTE_BASE_URL") {
            config.base_url = url;
        }

        if let Some(key) = lookup("FXQUOTE_ACCESS_KEY") {
            config.access_key = Some(key);
        }

        if let Some(secs) = lookup("FXQUOTE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.trim().parse() {
                config.timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if self.paid_membership && self.access_key.is_none() {
            return Err("A paid membership requires an access key".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    /// Base used when a request names none.
    pub default_base: Currency,
    /// Whether to consult and fill the cache.
    pub use_cache: bool,
    /// Cache configuration.
    pub cache: QuoteCacheConfig,
    /// Snapshot file to seed the cache from.
    pub seed: Option<SnapshotFile>,
}

impl Default for FxEngineConfig {
    fn default() -> Self {
        Self {
            default_base: Currency::new(DEFAULT_BASE),
            use_cache: true,
            cache: QuoteCacheConfig::default(),
            seed: None,
        }
    }
}

impl FxEngineConfig {
    /// Configuration that fetches on every call and stores nothing.
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(base) = lookup("FXQUOTE_DEFAULT_BASE") {
            config.default_base = Currency::new(base);
        }

        if let Some(use_cache) = lookup("FXQUOTE_USE_CACHE").and_then(|v| parse_flag(&v)) {
            config.use_cache = use_cache;
        }

        config.cache.mirror = snapshot_file(&lookup, "FXQUOTE_CACHE_FILE", "FXQUOTE_CACHE_FORMAT");
        config.seed = snapshot_file(&lookup, "FXQUOTE_SEED_FILE", "FXQUOTE_SEED_FORMAT");

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_base.is_known() {
            return Err(format!("Unknown default base currency {}", self.default_base));
        }

        if !self.use_cache && self.cache.mirror.is_some() {
            return Err("A cache mirror requires the cache to be enabled".to_string());
        }

        Ok(())
    }
}

fn snapshot_file(
    lookup: &impl Fn(&str) -> Option<String>,
    path_key: &str,
    format_key: &str,
) -> Option<SnapshotFile> {
    let path = PathBuf::from(lookup(path_key)?);
    let named = lookup(format_key).and_then(|text| match text.parse::<SnapshotFormat>() {
        Ok(format) => Some(format),
        Err(e) => {
            warn!(key = format_key, value = %text, error = %e, "Ignoring snapshot format");
            None
        }
    });
    let format = named
        .or_else(|| SnapshotFormat::from_path(&path))
        .unwrap_or_default();
    Some(SnapshotFile::new(path, format))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        assert!(FetchConfig::default().validate().is_ok());
        assert!(FxEngineConfig::default().validate().is_ok());
        assert_eq!(FxEngineConfig::default().default_base, Currency::usd());
    }

    #[test]
    fn test_paid_membership_requires_key() {
        let config = FetchConfig {
            paid_membership: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(FetchConfig::paid("secret").validate().is_ok());
    }

    #[test]
    fn test_fetch_config_from_lookup() {
        let config = FetchConfig::from_lookup(lookup(&[
            ("FXQUOTE_PAID_MEMBERSHIP", "true"),
            ("FXQUOTE_ACCESS_KEY", "secret"),
            ("FXQUOTE_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(config.base_url, PAID_BASE_URL);
        assert_eq!(config.access_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_from_lookup() {
        let config = FxEngineConfig::from_lookup(lookup(&[
            ("FXQUOTE_DEFAULT_BASE", "EUR"),
            ("FXQUOTE_CACHE_FILE", "/tmp/rates.csv"),
            ("FXQUOTE_CACHE_FORMAT", "csv"),
            ("FXQUOTE_SEED_FILE", "/tmp/seed.json"),
        ]));

        assert_eq!(config.default_base, Currency::eur());
        assert!(config.use_cache);
        assert_eq!(
            config.cache.mirror,
            Some(SnapshotFile::csv("/tmp/rates.csv"))
        );
        assert_eq!(config.seed, Some(SnapshotFile::json("/tmp/seed.json")));
    }

    #[test]
    fn test_unrecognized_format_falls_back_to_extension() {
        let config = FxEngineConfig::from_lookup(lookup(&[
            ("FXQUOTE_CACHE_FILE", "/tmp/rates.csv"),
            ("FXQUOTE_CACHE_FORMAT", "cvs"),
            ("FXQUOTE_SEED_FILE", "/tmp/seed.dat"),
            ("FXQUOTE_SEED_FORMAT", "cvs"),
        ]));

        assert_eq!(config.cache.mirror, Some(SnapshotFile::csv("/tmp/rates.csv")));
        assert_eq!(config.seed, Some(SnapshotFile::json("/tmp/seed.dat")));
    }

    #[test]
    fn test_missing_format_follows_extension() {
        let config = FxEngineConfig::from_lookup(lookup(&[("FXQUOTE_SEED_FILE", "seed.CSV")]));
        assert_eq!(config.seed, Some(SnapshotFile::csv("seed.CSV")));
    }

    #[test]
    fn test_invalid_engine_config() {
        let mut config = FxEngineConfig::default();
        config.default_base = Currency::new("XYZ");
        assert!(config.validate().is_err());

        let mut config = FxEngineConfig::uncached();
        config.cache.mirror = Some(SnapshotFile::json("/tmp/rates.json"));
        assert!(config.validate().is_err());
    }
}
