//! Ticker → canonical [`QuoteRecord`].
//!
//! # Pipeline
//!
//! 1. Trim, upper-case and classify the ticker (`InvalidFormat` on failure).
//! 2. Serve from the quote cache when the [`CacheMode`] allows it.
//! 3. Call the adapter registered for the ticker's market, bounded by the
//!    configured timeout.
//! 4. Apply the market's fallback policy to P/E and growth, tagging every
//!    assumed value as [`Sourced::Defaulted`].
//! 5. Cache the record. Failures are never cached.
//!
//! # Fallback order
//!
//! | Input | Order |
//! |-------|-------|
//! | P/E | trailing → forward → `MarketPolicy::pe_fallback` → `IncompleteFinancials` |
//! | Growth | reported → net-income growth → `MarketPolicy::default_growth` → `IncompleteFinancials` |

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::{EastmoneyAdapter, YahooAdapter};
use crate::cache::{CacheMode, QuoteCache};
use crate::config::{ConfigError, MarketPolicy, NormalizerConfig};
use crate::data_source::{
    FetchOptions, MarketDataSource, RawProviderResponse, SourceError, SourceErrorKind,
};
use crate::domain::sort_history;
use crate::growth::net_income_growth;
use crate::http_client::{HttpClient, NoopHttpClient, ReqwestHttpClient};
use crate::{
    validate_currency_code, DefaultReason, FetchError, PartialQuote, ProviderId, QuoteRecord,
    Sourced, Ticker, ValueOrigin,
};

/// Reconciles provider payloads into canonical quote records.
#[derive(Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    sources: Vec<Arc<dyn MarketDataSource>>,
    cache: QuoteCache,
}

impl Normalizer {
    pub fn builder() -> NormalizerBuilder {
        NormalizerBuilder::new()
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub async fn normalize(&self, ticker: &str) -> Result<QuoteRecord, FetchError> {
        self.normalize_with(ticker, CacheMode::Use).await
    }

    pub async fn normalize_with(
        &self,
        ticker: &str,
        cache_mode: CacheMode,
    ) -> Result<QuoteRecord, FetchError> {
        let ticker = Ticker::parse(ticker)?;

        if cache_mode.reads() {
            if let Some(record) = self.cache.get(ticker.as_str()).await {
                debug!(ticker = %ticker, "quote cache hit");
                return Ok(record);
            }
        }

        let source = self
            .sources
            .iter()
            .find(|source| source.supports(ticker.market()))
            .ok_or_else(|| {
                FetchError::UpstreamError(format!(
                    "no data source registered for the {} market",
                    ticker.market()
                ))
            })?;

        let options = FetchOptions {
            include_history: self.config.include_history,
            history_days: self.config.history_days,
            timeout_ms: self.config.timeout_ms(),
        };

        let raw = tokio::time::timeout(self.config.timeout, source.fetch_quote(&ticker, options))
            .await
            .map_err(|_| {
                warn!(ticker = %ticker, provider = %source.id(), "upstream call timed out");
                FetchError::timeout()
            })?
            .map_err(|error| source_to_fetch_error(&ticker, error))?;

        let policy = self.config.policy(ticker.market());
        let record = build_record(ticker, source.id(), raw, policy)?;

        if cache_mode.writes() {
            self.cache
                .put(record.ticker.as_str().to_owned(), record.clone())
                .await;
        }

        info!(
            ticker = %record.ticker,
            provider = %record.provider,
            price = record.price,
            pe = record.trailing_pe.value(),
            growth = record.growth_rate.value(),
            defaulted = record.has_defaults(),
            "quote normalized"
        );
        Ok(record)
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("config", &self.config)
            .field(
                "sources",
                &self.sources.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("cache", &self.cache)
            .finish()
    }
}

/// Wires adapters, cache and config into a [`Normalizer`].
///
/// Without [`with_real_clients`](Self::with_real_clients) or an injected
/// client, adapters use [`NoopHttpClient`] and never touch the network.
#[derive(Default)]
pub struct NormalizerBuilder {
    config: NormalizerConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    sources: Vec<Arc<dyn MarketDataSource>>,
}

impl NormalizerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from [`NormalizerConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new().with_config(NormalizerConfig::from_env()?))
    }

    pub fn with_config(mut self, config: NormalizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config_mut(&mut self) -> &mut NormalizerConfig {
        &mut self.config
    }

    /// Uses a shared reqwest client (with cookie jar) for every adapter.
    pub fn with_real_clients(self) -> Self {
        self.with_http_client(Arc::new(ReqwestHttpClient::new()))
    }

    /// Uses `http_client` for the built-in adapters.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Registers a custom adapter. Custom adapters take precedence over the
    /// built-in ones for the markets they serve.
    pub fn with_source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(self) -> Normalizer {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(NoopHttpClient) as Arc<dyn HttpClient>);

        let mut sources = self.sources;
        sources.push(Arc::new(EastmoneyAdapter::with_http_client(Arc::clone(
            &http_client,
        ))));
        sources.push(Arc::new(YahooAdapter::with_http_client(
            http_client,
            self.config.yahoo_cookie.clone(),
        )));

        Normalizer {
            cache: QuoteCache::new(self.config.cache_ttl),
            config: self.config,
            sources,
        }
    }
}

/// Provider messages and status codes stay in the debug log. Callers get a
/// fixed, provider-neutral detail per error kind.
fn source_to_fetch_error(ticker: &Ticker, error: SourceError) -> FetchError {
    debug!(ticker = %ticker, code = error.code(), error = %error, "data source failed");
    match error.kind() {
        SourceErrorKind::RateLimited => FetchError::RateLimited {
            retry_after: error.retry_after(),
        },
        SourceErrorKind::Timeout => FetchError::timeout(),
        SourceErrorKind::NotFound => FetchError::PriceUnavailable {
            ticker: ticker.as_str().to_owned(),
        },
        SourceErrorKind::Unavailable => FetchError::UpstreamError(String::from("unavailable")),
        SourceErrorKind::Unauthorized => FetchError::UpstreamError(String::from("unauthorized")),
        SourceErrorKind::Malformed => {
            FetchError::UpstreamError(String::from("malformed response"))
        }
        SourceErrorKind::Internal => FetchError::UpstreamError(String::from("internal")),
    }
}

/// Applies the market fallback policy to an adapter payload.
pub fn build_record(
    ticker: Ticker,
    provider: ProviderId,
    raw: RawProviderResponse,
    policy: MarketPolicy,
) -> Result<QuoteRecord, FetchError> {
    let Some(price) = raw.price.filter(|price| price.is_finite() && *price > 0.0) else {
        return Err(FetchError::PriceUnavailable {
            ticker: ticker.as_str().to_owned(),
        });
    };

    // Both chains only read the payload; resolve them before it is taken apart.
    let trailing_pe = resolve_pe(&raw, policy);
    let growth_rate = resolve_growth(&raw, policy);

    let RawProviderResponse {
        display_name,
        currency,
        price_history,
        ..
    } = raw;
    let currency = currency
        .as_deref()
        .and_then(|code| validate_currency_code(code).ok())
        .unwrap_or_else(|| ticker.market().currency().to_owned());
    let price_history = price_history
        .map(sort_history)
        .filter(|points| !points.is_empty());

    let inputs = trailing_pe
        .ok_or_else(|| String::from("no trailing or forward P/E reported"))
        .and_then(|pe| growth_rate.map(|growth| (pe, growth)));
    let (trailing_pe, growth_rate) = match inputs {
        Ok(inputs) => inputs,
        Err(detail) => {
            let partial = PartialQuote {
                ticker: ticker.as_str().to_owned(),
                display_name: display_name.unwrap_or_else(|| ticker.as_str().to_owned()),
                price,
                currency,
                price_history,
            };
            return Err(FetchError::incomplete(detail).with_partial(partial));
        }
    };
    if trailing_pe.is_defaulted() {
        warn!(ticker = %ticker, pe = trailing_pe.value(), "using market default P/E");
    }
    if growth_rate.is_defaulted() {
        warn!(ticker = %ticker, growth = growth_rate.value(), "using market default growth rate");
    }

    QuoteRecord::new(
        ticker,
        provider,
        display_name,
        price,
        currency,
        trailing_pe,
        growth_rate,
        price_history,
    )
    .map_err(|error| FetchError::UpstreamError(error.to_string()))
}

fn resolve_pe(raw: &RawProviderResponse, policy: MarketPolicy) -> Option<Sourced<f64>> {
    let usable = |pe: &f64| pe.is_finite() && *pe != 0.0;

    raw.trailing_pe
        .filter(usable)
        .map(|pe| Sourced::observed(pe, ValueOrigin::TrailingPe))
        .or_else(|| {
            raw.forward_pe
                .filter(usable)
                .map(|pe| Sourced::observed(pe, ValueOrigin::ForwardPe))
        })
        .or_else(|| {
            policy
                .pe_fallback
                .map(|pe| Sourced::defaulted(pe, DefaultReason::NoPeData))
        })
}

fn resolve_growth(raw: &RawProviderResponse, policy: MarketPolicy) -> Result<Sourced<f64>, String> {
    if let Some(rate) = raw.growth_rate.filter(|rate| rate.is_finite()) {
        return Ok(Sourced::observed(rate, ValueOrigin::ReportedGrowth));
    }

    let detail = if raw.net_income.is_empty() {
        String::from("no growth rate or net income history reported")
    } else {
        match net_income_growth(&raw.net_income) {
            Ok(estimate) => return Ok(Sourced::observed(estimate.rate, estimate.method.origin())),
            Err(error) => error.to_string(),
        }
    };

    policy
        .default_growth
        .map(|rate| Sourced::defaulted(rate, DefaultReason::NoGrowthData))
        .ok_or(detail)
}
