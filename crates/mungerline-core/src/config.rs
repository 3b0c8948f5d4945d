//! Normalizer configuration and per-market fallback policy.
//!
//! | Variable | Default | Effect |
//! |----------|---------|--------|
//! | `MUNGERLINE_TIMEOUT_MS` | `8000` | Per-request upstream timeout |
//! | `MUNGERLINE_CACHE_TTL_SECS` | `600` | Quote cache lifetime, `0` disables |
//! | `MUNGERLINE_HISTORY_DAYS` | `250` | Trading days of closes to fetch |
//! | `MUNGERLINE_DOMESTIC_GROWTH` | `0.12` | Assumed growth for A-shares without data |
//! | `MUNGERLINE_SECONDARY_GROWTH` | `0.10` | Assumed growth for Hong Kong without data |
//! | `MUNGERLINE_FOREIGN_GROWTH` | `0.15` | Assumed growth for US tickers without data |
//! | `YAHOO_COOKIE` | unset | Pre-authenticated Yahoo session cookie |
//!
//! Growth variables accept a fraction (`0.12`), a percentage (`12%`) or
//! `none` to disable the market default.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::MarketKind;

pub const DEFAULT_TIMEOUT_MS: u64 = 8_000;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_HISTORY_DAYS: u32 = 250;
pub const MAX_HISTORY_DAYS: u32 = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name}='{value}' is invalid: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Fallbacks applied when a provider omits an engine input.
///
/// `None` means "no assumption": the normalizer fails with
/// `IncompleteFinancials` instead of inventing a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketPolicy {
    pub pe_fallback: Option<f64>,
    pub default_growth: Option<f64>,
}

impl MarketPolicy {
    pub const fn default_for(market: MarketKind) -> Self {
        match market {
            MarketKind::Domestic => Self {
                pe_fallback: None,
                default_growth: Some(0.12),
            },
            MarketKind::Secondary => Self {
                pe_fallback: None,
                default_growth: Some(0.10),
            },
            MarketKind::Foreign => Self {
                pe_fallback: None,
                default_growth: Some(0.15),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub history_days: u32,
    /// Fetch daily closes alongside the quote.
    pub include_history: bool,
    pub domestic: MarketPolicy,
    pub secondary: MarketPolicy,
    pub foreign: MarketPolicy,
    pub yahoo_cookie: Option<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            cache_ttl: DEFAULT_CACHE_TTL,
            history_days: DEFAULT_HISTORY_DAYS,
            include_history: true,
            domestic: MarketPolicy::default_for(MarketKind::Domestic),
            secondary: MarketPolicy::default_for(MarketKind::Secondary),
            foreign: MarketPolicy::default_for(MarketKind::Foreign),
            yahoo_cookie: None,
        }
    }
}

impl NormalizerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset or blank
    /// variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        };

        let mut config = Self::default();

        if let Some((name, value)) = read("MUNGERLINE_TIMEOUT_MS") {
            let millis = parse_u64(name, &value)?;
            if millis == 0 {
                return Err(invalid(name, value, "must be greater than zero"));
            }
            config.timeout = Duration::from_millis(millis);
        }
        if let Some((name, value)) = read("MUNGERLINE_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(parse_u64(name, &value)?);
        }
        if let Some((name, value)) = read("MUNGERLINE_HISTORY_DAYS") {
            let days = u32::try_from(parse_u64(name, &value)?)
                .map_err(|_| invalid(name, value.clone(), "out of range"))?;
            config.history_days = days.min(MAX_HISTORY_DAYS);
        }
        if let Some((name, value)) = read("MUNGERLINE_DOMESTIC_GROWTH") {
            config.domestic.default_growth = parse_optional_rate(name, &value)?;
        }
        if let Some((name, value)) = read("MUNGERLINE_SECONDARY_GROWTH") {
            config.secondary.default_growth = parse_optional_rate(name, &value)?;
        }
        if let Some((name, value)) = read("MUNGERLINE_FOREIGN_GROWTH") {
            config.foreign.default_growth = parse_optional_rate(name, &value)?;
        }
        config.yahoo_cookie = read("YAHOO_COOKIE").map(|(_, value)| value);

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_history_days(mut self, days: u32) -> Self {
        self.history_days = days.min(MAX_HISTORY_DAYS);
        self
    }

    pub fn with_include_history(mut self, include_history: bool) -> Self {
        self.include_history = include_history;
        self
    }

    pub fn with_market_policy(mut self, market: MarketKind, policy: MarketPolicy) -> Self {
        match market {
            MarketKind::Domestic => self.domestic = policy,
            MarketKind::Secondary => self.secondary = policy,
            MarketKind::Foreign => self.foreign = policy,
        }
        self
    }

    pub const fn policy(&self, market: MarketKind) -> MarketPolicy {
        match market {
            MarketKind::Domestic => self.domestic,
            MarketKind::Secondary => self.secondary,
            MarketKind::Foreign => self.foreign,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

fn invalid(name: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value,
        reason,
    }
}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| invalid(name, value.to_owned(), "expected a non-negative integer"))
}

fn parse_optional_rate(name: &'static str, value: &str) -> Result<Option<f64>, ConfigError> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_rate(name, value).map(Some)
}

/// Accepts a fraction (`0.12`) or a percentage (`12%`).
fn parse_rate(name: &'static str, value: &str) -> Result<f64, ConfigError> {
    let (number, scale) = match value.strip_suffix('%') {
        Some(percent) => (percent.trim(), 100.0),
        None => (value, 1.0),
    };

    let rate = number
        .parse::<f64>()
        .map_err(|_| invalid(name, value.to_owned(), "expected a number such as 0.12 or 12%"))?
        / scale;

    if !rate.is_finite() || rate <= -1.0 {
        return Err(invalid(name, value.to_owned(), "rate must be finite and above -100%"));
    }
    Ok(rate)
}
