//! Provider adapters.
//!
//! | Adapter | Markets | Notes |
//! |---------|---------|-------|
//! | [`EastmoneyAdapter`] | Domestic, Secondary | Scaled integer prices, `"-"` placeholders |
//! | [`YahooAdapter`] | Foreign | `{raw, fmt}` number wrappers, cookie/crumb session |

mod eastmoney;
mod yahoo;

pub use eastmoney::EastmoneyAdapter;
pub use yahoo::{YahooAdapter, YahooAuthManager};

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::provider_policy::ProviderPolicy;
use crate::retry::execute_with_retry;
use crate::throttling::ThrottlingQueue;
use crate::ProviderId;

/// Shared request path for one provider: local budget, bounded retry and
/// status classification.
#[derive(Clone)]
pub(crate) struct ProviderTransport {
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    throttle: ThrottlingQueue,
    policy: ProviderPolicy,
}

impl ProviderTransport {
    pub(crate) fn new(http_client: Arc<dyn HttpClient>, policy: ProviderPolicy) -> Self {
        Self {
            provider: policy.provider_id,
            throttle: ThrottlingQueue::from_policy(&policy),
            http_client,
            policy,
        }
    }

    pub(crate) fn http_client(&self) -> &dyn HttpClient {
        self.http_client.as_ref()
    }

    /// Sends `request` and returns the response only if it was a 2xx.
    pub(crate) async fn get(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        self.throttle.acquire().map_err(|wait| {
            SourceError::rate_limited(
                format!("{} request budget exhausted", self.provider),
                Some(wait),
            )
        })?;

        debug!(provider = %self.provider, url = %request.url, "upstream request");
        let response =
            execute_with_retry(self.http_client.as_ref(), request, &self.policy.retry).await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(SourceError::from_status(self.provider, &response))
        }
    }
}

impl std::fmt::Debug for ProviderTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTransport")
            .field("provider", &self.provider)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Reads a number the way providers actually send them: plain JSON numbers,
/// numeric strings, Yahoo `{"raw": .., "fmt": ..}` wrappers. Placeholders such
/// as `"-"`, empty strings, `null` and `{}` read as missing.
pub(crate) fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let text = text.trim().trim_end_matches('%').replace(',', "");
            text.parse::<f64>().ok()
        }
        Value::Object(map) => return lenient_f64(map.get("raw")),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Like [`lenient_f64`], but zero and negative values also read as missing.
pub(crate) fn lenient_positive(value: Option<&Value>) -> Option<f64> {
    lenient_f64(value).filter(|number| *number > 0.0)
}

pub(crate) fn lenient_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty() && text != "-").then(|| text.to_owned())
        }
        _ => None,
    }
}

pub(crate) fn parse_json(provider: ProviderId, body: &str) -> Result<Value, SourceError> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse {provider} response: {e}")))
}
