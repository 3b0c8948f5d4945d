use std::time::Duration;

use thiserror::Error;

use crate::domain::PartialQuote;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("calendar date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("field '{field}' must be greater than zero")]
    NonPositiveValue { field: &'static str },
}

/// Terminal outcome of a failed normalization request.
///
/// Every upstream failure is converted into one of these variants at the
/// normalizer boundary. Provider status codes and payloads never leak past it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FetchError {
    #[error("ticker '{ticker}' does not match any known market shape")]
    InvalidFormat { ticker: String },

    #[error("no usable price for '{ticker}'")]
    PriceUnavailable { ticker: String },

    #[error("upstream rate limit reached{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("incomplete financials: {detail}")]
    IncompleteFinancials {
        detail: String,
        /// Price, name and history that were fetched before the gap was hit.
        partial: Option<Box<PartialQuote>>,
    },

    #[error("upstream error: {0}")]
    UpstreamError(String),
}

impl FetchError {
    pub fn invalid_format(ticker: impl Into<String>) -> Self {
        Self::InvalidFormat {
            ticker: ticker.into(),
        }
    }

    pub fn incomplete(detail: impl Into<String>) -> Self {
        Self::IncompleteFinancials {
            detail: detail.into(),
            partial: None,
        }
    }

    pub fn timeout() -> Self {
        Self::UpstreamError(String::from("timeout"))
    }

    /// Attaches the degraded partial record to an `IncompleteFinancials` error.
    /// Other variants are returned unchanged.
    pub fn with_partial(self, partial: PartialQuote) -> Self {
        match self {
            Self::IncompleteFinancials { detail, .. } => Self::IncompleteFinancials {
                detail,
                partial: Some(Box::new(partial)),
            },
            other => other,
        }
    }

    pub fn partial(&self) -> Option<&PartialQuote> {
        match self {
            Self::IncompleteFinancials { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } => "fetch.invalid_format",
            Self::PriceUnavailable { .. } => "fetch.price_unavailable",
            Self::RateLimited { .. } => "fetch.rate_limited",
            Self::IncompleteFinancials { .. } => "fetch.incomplete_financials",
            Self::UpstreamError(_) => "fetch.upstream_error",
        }
    }

    /// Short guidance for the person who issued the request.
    pub fn user_hint(&self) -> String {
        match self {
            Self::InvalidFormat { .. } => String::from(
                "use a 6-digit A-share code (600519), a 5-digit Hong Kong code (00700) or a US ticker (AAPL)",
            ),
            Self::PriceUnavailable { .. } => {
                String::from("the quote may be suspended or unknown; retry later or try another ticker")
            }
            Self::RateLimited {
                retry_after: Some(delay),
            } => format!("wait {} seconds before retrying", delay.as_secs().max(1)),
            Self::RateLimited { retry_after: None } => {
                String::from("wait a minute before retrying")
            }
            Self::IncompleteFinancials { .. } => String::from(
                "earnings data is insufficient for a valuation; price data may still be shown",
            ),
            Self::UpstreamError(_) => String::from("the data provider failed; retry shortly"),
        }
    }
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!(", retry after {}s", delay.as_secs().max(1)),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_message_includes_delay() {
        let error = FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(12)),
        };
        assert_eq!(error.to_string(), "upstream rate limit reached, retry after 12s");
        assert_eq!(error.user_hint(), "wait 12 seconds before retrying");
    }

    #[test]
    fn with_partial_only_touches_incomplete_financials() {
        let partial = PartialQuote {
            ticker: String::from("AAPL"),
            display_name: String::from("Apple Inc."),
            price: 190.0,
            currency: String::from("USD"),
            price_history: None,
        };

        let incomplete = FetchError::incomplete("no P/E").with_partial(partial.clone());
        assert_eq!(incomplete.partial(), Some(&partial));

        let upstream = FetchError::timeout().with_partial(partial);
        assert_eq!(upstream, FetchError::UpstreamError(String::from("timeout")));
    }
}
