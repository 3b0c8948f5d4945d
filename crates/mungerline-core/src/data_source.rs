//! Provider adapter contract and the raw payload adapters hand back.
//!
//! Adapters only extract. Fallback policy (forward P/E, net-income growth,
//! market defaults) belongs to the normalizer, so a [`RawProviderResponse`]
//! keeps every field optional and reports exactly what the provider said.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::http_client::{HttpError, HttpResponse};
use crate::{AnnualNetIncome, MarketKind, PricePoint, ProviderId, Ticker};

/// Per-call fetch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub include_history: bool,
    pub history_days: u32,
    pub timeout_ms: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            include_history: true,
            history_days: 250,
            timeout_ms: 8_000,
        }
    }
}

/// Everything an adapter could extract for one ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawProviderResponse {
    pub price: Option<f64>,
    pub display_name: Option<String>,
    pub currency: Option<String>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    /// Reported fractional growth, e.g. `0.12` for 12%.
    pub growth_rate: Option<f64>,
    pub net_income: Vec<AnnualNetIncome>,
    /// `None` when history was not requested or its sub-fetch failed.
    pub price_history: Option<Vec<PricePoint>>,
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Timeout,
    Malformed,
    NotFound,
    Unauthorized,
    Internal,
}

/// Structured adapter failure, mapped onto `FetchError` by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
    retry_after: Option<Duration>,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            retry_after: None,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message, true)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(SourceErrorKind::RateLimited, message, false)
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message, true)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Malformed, message, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, message, false)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unauthorized, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Internal, message, false)
    }

    /// Classifies a non-2xx response.
    pub fn from_status(provider: ProviderId, response: &HttpResponse) -> Self {
        match response.status {
            429 => Self::rate_limited(
                format!("{provider} returned HTTP 429"),
                response.retry_after(),
            ),
            401 | 403 => {
                Self::unauthorized(format!("{provider} returned HTTP {}", response.status))
            }
            404 => Self::not_found(format!("{provider} returned HTTP 404")),
            status if status >= 500 => {
                Self::unavailable(format!("{provider} returned HTTP {status}"))
            }
            status => Self::internal(format!("{provider} returned HTTP {status}")),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unauthorized => "source.unauthorized",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl From<HttpError> for SourceError {
    fn from(error: HttpError) -> Self {
        if error.is_timeout() {
            Self::timeout(error.message())
        } else {
            Self::unavailable(error.message())
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

pub type SourceFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawProviderResponse, SourceError>> + Send + 'a>>;

/// Market data adapter contract. One implementation per upstream provider.
pub trait MarketDataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Markets this adapter can address.
    fn markets(&self) -> &'static [MarketKind];

    fn fetch_quote<'a>(&'a self, ticker: &'a Ticker, options: FetchOptions) -> SourceFuture<'a>;

    fn supports(&self, market: MarketKind) -> bool {
        self.markets().contains(&market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_carries_retry_after() {
        let response = HttpResponse::with_status(429, "").with_header("retry-after", "7");
        let error = SourceError::from_status(ProviderId::Yahoo, &response);

        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
        assert!(!error.retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let error = SourceError::from_status(
            ProviderId::Eastmoney,
            &HttpResponse::with_status(503, "busy"),
        );
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.retryable());
        assert_eq!(error.to_string(), "eastmoney returned HTTP 503 (source.unavailable)");
    }

    #[test]
    fn transport_timeout_keeps_its_kind() {
        let error = SourceError::from(HttpError::timeout("request timeout"));
        assert_eq!(error.kind(), SourceErrorKind::Timeout);
    }
}
