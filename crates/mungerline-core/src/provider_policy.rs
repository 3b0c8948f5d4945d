use std::time::Duration;

use crate::retry::{Backoff, RetryConfig};
use crate::ProviderId;

/// Client-side request budget and retry behaviour for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry: RetryConfig,
}

impl ProviderPolicy {
    /// The quote push servers tolerate bursts but throttle sustained scraping.
    pub fn eastmoney_default() -> Self {
        Self {
            provider_id: ProviderId::Eastmoney,
            quota_window: Duration::from_secs(60),
            quota_limit: 120,
            retry: RetryConfig::default(),
        }
    }

    /// Unauthenticated quoteSummary access answers 429 quickly; stay well under it.
    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
            retry: RetryConfig {
                backoff: Backoff::Exponential {
                    base: Duration::from_millis(500),
                    factor: 2.0,
                    max: Duration::from_secs(4),
                    jitter: true,
                },
                ..RetryConfig::default()
            },
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Eastmoney => Self::eastmoney_default(),
            ProviderId::Yahoo => Self::yahoo_default(),
        }
    }
}
