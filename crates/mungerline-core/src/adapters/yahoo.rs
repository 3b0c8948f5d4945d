use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{lenient_f64, lenient_positive, lenient_string, parse_json, ProviderTransport};
use crate::data_source::{
    FetchOptions, MarketDataSource, RawProviderResponse, SourceError, SourceErrorKind,
    SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::{AnnualNetIncome, MarketKind, PricePoint, ProviderId, Ticker, UtcDateTime};

const REFERER: &str = "https://finance.yahoo.com/";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const SUMMARY_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,financialData,incomeStatementHistory";
const CRUMB_TTL: Duration = Duration::from_secs(3_600);

#[derive(Debug, Clone)]
struct Crumb {
    value: String,
    fetched_at: Instant,
}

/// Yahoo session handling.
///
/// quoteSummary requires a session cookie (set by `fc.yahoo.com` and kept in
/// the reqwest cookie jar) plus a crumb query parameter tied to it. A cookie
/// supplied up front (`YAHOO_COOKIE`) is sent explicitly on every call.
#[derive(Debug, Clone)]
pub struct YahooAuthManager {
    crumb: Arc<Mutex<Option<Crumb>>>,
    cookie: Option<String>,
    ttl: Duration,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl YahooAuthManager {
    pub fn new(cookie: Option<String>) -> Self {
        Self {
            crumb: Arc::new(Mutex::new(None)),
            cookie: cookie.filter(|cookie| !cookie.trim().is_empty()),
            ttl: CRUMB_TTL,
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Cached crumb, or a fresh one. Concurrent callers wait on the same
    /// refresh instead of each starting their own.
    pub async fn crumb(&self, http_client: &dyn HttpClient) -> Result<String, SourceError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            if crumb.fetched_at.elapsed() < self.ttl {
                return Ok(crumb.value.clone());
            }
        }

        let value = self.fetch_crumb(http_client).await?;
        *cached = Some(Crumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }

    async fn fetch_crumb(&self, http_client: &dyn HttpClient) -> Result<String, SourceError> {
        if self.cookie.is_none() {
            // fc.yahoo.com answers 404 but sets the session cookie; only
            // transport failures matter here.
            let request = HttpRequest::get(COOKIE_URL).with_header("referer", REFERER);
            http_client.execute(request).await.map_err(|e| {
                SourceError::unavailable(format!("failed to fetch yahoo cookie: {}", e.message()))
            })?;
        }

        for url in CRUMB_URLS {
            let request = HttpRequest::get(url)
                .with_header("referer", REFERER)
                .with_cookie(self.cookie());

            let response = match http_client.execute(request).await {
                Ok(response) => response,
                Err(error) => {
                    debug!(url, error = %error, "yahoo crumb endpoint failed");
                    continue;
                }
            };

            if response.status == 429 {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited the crumb request",
                    response.retry_after(),
                ));
            }

            let body = response.body.trim();
            if response.is_success() && is_plausible_crumb(body) {
                return Ok(body.to_owned());
            }
        }

        Err(SourceError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<')
        && !body.contains('{')
}

/// US equities from Yahoo Finance quoteSummary and chart endpoints.
#[derive(Debug, Clone)]
pub struct YahooAdapter {
    transport: ProviderTransport,
    auth: YahooAuthManager,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient), None)
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>, cookie: Option<String>) -> Self {
        Self::with_policy(http_client, cookie, ProviderPolicy::yahoo_default())
    }

    pub fn with_policy(
        http_client: Arc<dyn HttpClient>,
        cookie: Option<String>,
        policy: ProviderPolicy,
    ) -> Self {
        Self {
            transport: ProviderTransport::new(http_client, policy),
            auth: YahooAuthManager::new(cookie),
        }
    }

    async fn fetch(
        &self,
        ticker: &Ticker,
        options: FetchOptions,
    ) -> Result<RawProviderResponse, SourceError> {
        let summary = self.fetch_summary(ticker, options.timeout_ms);
        let history = async {
            if options.include_history && options.history_days > 0 {
                Some(
                    self.fetch_history(ticker, options.history_days, options.timeout_ms)
                        .await,
                )
            } else {
                None
            }
        };
        let (summary, history) = tokio::join!(summary, history);

        let mut response = summary?;
        response.price_history = match history {
            Some(Ok(points)) => Some(points),
            Some(Err(error)) => {
                warn!(ticker = %ticker, error = %error, "price history unavailable");
                None
            }
            None => None,
        };
        Ok(response)
    }

    async fn fetch_summary(
        &self,
        ticker: &Ticker,
        timeout_ms: u64,
    ) -> Result<RawProviderResponse, SourceError> {
        let body = match self.summary_request(ticker, timeout_ms).await {
            Err(error) if is_auth_rejection(&error) => {
                // Stale crumb: drop it and try once with a fresh one.
                self.auth.invalidate().await;
                self.summary_request(ticker, timeout_ms).await?
            }
            other => other?,
        };

        parse_summary(&parse_json(ProviderId::Yahoo, &body)?)
    }

    async fn summary_request(&self, ticker: &Ticker, timeout_ms: u64) -> Result<String, SourceError> {
        let mut url = format!(
            "{SUMMARY_URL}/{}?modules={SUMMARY_MODULES}",
            urlencoding::encode(ticker.as_str())
        );
        match self.auth.crumb(self.transport.http_client()).await {
            Ok(crumb) => {
                url.push_str("&crumb=");
                url.push_str(&urlencoding::encode(&crumb));
            }
            Err(error) if error.kind() == SourceErrorKind::RateLimited => return Err(error),
            // Without a crumb Yahoo may still answer, or reject with 401.
            Err(error) => warn!(error = %error, "continuing without yahoo crumb"),
        }

        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_cookie(self.auth.cookie())
            .with_timeout_ms(timeout_ms);

        self.transport.get(request).await.map(|response| response.body)
    }

    async fn fetch_history(
        &self,
        ticker: &Ticker,
        days: u32,
        timeout_ms: u64,
    ) -> Result<Vec<PricePoint>, SourceError> {
        let url = format!(
            "{CHART_URL}/{}?range={}&interval=1d",
            urlencoding::encode(ticker.as_str()),
            chart_range(days)
        );
        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_cookie(self.auth.cookie())
            .with_timeout_ms(timeout_ms);
        let response = self.transport.get(request).await?;

        let mut points = parse_chart(&parse_json(ProviderId::Yahoo, &response.body)?)?;
        let keep = usize::try_from(days).unwrap_or(usize::MAX);
        if points.len() > keep {
            points.drain(..points.len() - keep);
        }
        Ok(points)
    }
}

impl MarketDataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn markets(&self) -> &'static [MarketKind] {
        &[MarketKind::Foreign]
    }

    fn fetch_quote<'a>(&'a self, ticker: &'a Ticker, options: FetchOptions) -> SourceFuture<'a> {
        Box::pin(self.fetch(ticker, options))
    }
}

fn is_auth_rejection(error: &SourceError) -> bool {
    error.kind() == SourceErrorKind::Unauthorized
}

/// Smallest chart range covering `days` trading days.
fn chart_range(days: u32) -> &'static str {
    match days {
        0..=5 => "5d",
        6..=21 => "1mo",
        22..=63 => "3mo",
        64..=126 => "6mo",
        127..=252 => "1y",
        253..=504 => "2y",
        505..=1_260 => "5y",
        1_261..=2_520 => "10y",
        _ => "max",
    }
}

fn parse_summary(payload: &Value) -> Result<RawProviderResponse, SourceError> {
    let Some(summary) = payload.get("quoteSummary") else {
        return Ok(RawProviderResponse::default());
    };

    if let Some(error) = summary.get("error").filter(|error| !error.is_null()) {
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(if code.eq_ignore_ascii_case("Not Found") {
            SourceError::not_found(format!("yahoo: {description}"))
        } else {
            SourceError::unavailable(format!("yahoo API error {code}: {description}"))
        });
    }

    let Some(result) = summary
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
    else {
        return Ok(RawProviderResponse::default());
    };

    let module = |name: &str| result.get(name);
    let field = |module_name: &str, key: &str| module(module_name).and_then(|m| m.get(key));

    let display_name = lenient_string(field("price", "longName"))
        .or_else(|| lenient_string(field("price", "shortName")));

    let trailing_pe = lenient_f64(field("summaryDetail", "trailingPE"))
        .filter(|ratio| *ratio != 0.0);
    let forward_pe = lenient_f64(field("summaryDetail", "forwardPE"))
        .or_else(|| lenient_f64(field("defaultKeyStatistics", "forwardPE")))
        .filter(|ratio| *ratio != 0.0);

    Ok(RawProviderResponse {
        price: lenient_positive(field("price", "regularMarketPrice")),
        display_name,
        currency: lenient_string(field("price", "currency")).map(|c| c.to_ascii_uppercase()),
        trailing_pe,
        forward_pe,
        growth_rate: lenient_f64(field("financialData", "earningsGrowth")),
        net_income: parse_income_statements(module("incomeStatementHistory")),
        price_history: None,
    })
}

fn parse_income_statements(module: Option<&Value>) -> Vec<AnnualNetIncome> {
    module
        .and_then(|m| m.get("incomeStatementHistory"))
        .and_then(Value::as_array)
        .map(|statements| {
            statements
                .iter()
                .filter_map(|statement| {
                    let end = unix_seconds(statement.get("endDate"))?;
                    let year = UtcDateTime::from_unix_timestamp(end).ok()?.year();
                    let net_income = lenient_f64(statement.get("netIncome"))?;
                    Some(AnnualNetIncome::new(year, net_income))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Whole epoch seconds, bare or in a `{raw, fmt}` wrapper. Fractional or
/// out-of-range values are rejected rather than truncated.
fn unix_seconds(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value.get("raw").unwrap_or(value).as_i64()
}

fn parse_chart(payload: &Value) -> Result<Vec<PricePoint>, SourceError> {
    let Some(chart) = payload.get("chart") else {
        return Ok(Vec::new());
    };

    if let Some(error) = chart.get("error").filter(|error| !error.is_null()) {
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(SourceError::unavailable(format!("yahoo chart error: {description}")));
    }

    let Some(result) = chart
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
    else {
        return Ok(Vec::new());
    };

    let timestamps = result
        .get("timestamp")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let closes = result
        .pointer("/indicators/quote/0/close")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    // Halted sessions come back as null closes; skip them.
    Ok(timestamps
        .iter()
        .zip(closes.iter())
        .filter_map(|(ts, close)| {
            let ts = UtcDateTime::from_unix_timestamp(ts.as_i64()?).ok()?;
            Some(PricePoint {
                ts,
                close: lenient_positive(Some(close))?,
            })
        })
        .collect())
}
