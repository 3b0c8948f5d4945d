use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::{lenient_positive, lenient_string, parse_json, ProviderTransport};
use crate::data_source::{
    FetchOptions, MarketDataSource, RawProviderResponse, SourceError, SourceFuture,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::{DomesticExchange, MarketKind, PricePoint, ProviderId, Ticker, UtcDateTime};

const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
/// f43 price, f57 code, f58 name, f162 dynamic P/E, f164 trailing P/E.
const QUOTE_FIELDS: &str = "f43,f57,f58,f162,f164";

/// A-share and Hong Kong quotes from the Eastmoney push servers.
///
/// Requests use `fltt=2` so prices and ratios arrive as decimals rather than
/// scaled integers. Suspended or unknown codes answer with `"data": null` or
/// `"-"` placeholders.
#[derive(Clone)]
pub struct EastmoneyAdapter {
    transport: ProviderTransport,
}

impl Default for EastmoneyAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(NoopHttpClient))
    }
}

impl EastmoneyAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_policy(http_client, ProviderPolicy::eastmoney_default())
    }

    pub fn with_policy(http_client: Arc<dyn HttpClient>, policy: ProviderPolicy) -> Self {
        Self {
            transport: ProviderTransport::new(http_client, policy),
        }
    }

    /// Market-prefixed security id used by every Eastmoney endpoint.
    pub fn secid(ticker: &Ticker) -> Result<String, SourceError> {
        let prefix = match (ticker.market(), ticker.domestic_exchange()) {
            (MarketKind::Domestic, Some(DomesticExchange::Shanghai)) => "1",
            (MarketKind::Domestic, Some(_)) => "0",
            (MarketKind::Secondary, _) => "116",
            _ => {
                return Err(SourceError::internal(format!(
                    "eastmoney cannot address '{ticker}' in the {} market",
                    ticker.market().as_str()
                )))
            }
        };
        Ok(format!("{prefix}.{}", ticker.as_str()))
    }

    async fn fetch(
        &self,
        ticker: &Ticker,
        options: FetchOptions,
    ) -> Result<RawProviderResponse, SourceError> {
        let secid = Self::secid(ticker)?;

        let quote = self.fetch_snapshot(&secid, options.timeout_ms);
        let history = async {
            if options.include_history && options.history_days > 0 {
                Some(
                    self.fetch_history(&secid, options.history_days, options.timeout_ms)
                        .await,
                )
            } else {
                None
            }
        };
        let (quote, history) = tokio::join!(quote, history);

        let mut response = quote?;
        response.currency = Some(ticker.market().currency().to_owned());
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

    async fn fetch_snapshot(
        &self,
        secid: &str,
        timeout_ms: u64,
    ) -> Result<RawProviderResponse, SourceError> {
        let url = format!(
            "{QUOTE_URL}?secid={}&fields={QUOTE_FIELDS}&fltt=2&invt=2",
            urlencoding::encode(secid)
        );
        let response = self
            .transport
            .get(HttpRequest::get(url).with_timeout_ms(timeout_ms))
            .await?;

        parse_snapshot(&parse_json(ProviderId::Eastmoney, &response.body)?)
    }

    async fn fetch_history(
        &self,
        secid: &str,
        days: u32,
        timeout_ms: u64,
    ) -> Result<Vec<PricePoint>, SourceError> {
        // fqt=1: forward-adjusted closes, so splits do not show as crashes.
        let url = format!(
            "{KLINE_URL}?secid={}&fields1=f1,f2,f3&fields2=f51,f53&klt=101&fqt=1&end=20500101&lmt={days}",
            urlencoding::encode(secid)
        );
        let response = self
            .transport
            .get(HttpRequest::get(url).with_timeout_ms(timeout_ms))
            .await?;

        parse_klines(&parse_json(ProviderId::Eastmoney, &response.body)?)
    }
}

impl std::fmt::Debug for EastmoneyAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EastmoneyAdapter")
            .field("transport", &self.transport)
            .finish()
    }
}

impl MarketDataSource for EastmoneyAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Eastmoney
    }

    fn markets(&self) -> &'static [MarketKind] {
        &[MarketKind::Domestic, MarketKind::Secondary]
    }

    fn fetch_quote<'a>(&'a self, ticker: &'a Ticker, options: FetchOptions) -> SourceFuture<'a> {
        Box::pin(self.fetch(ticker, options))
    }
}

fn parse_snapshot(payload: &Value) -> Result<RawProviderResponse, SourceError> {
    let Some(data) = payload.get("data").filter(|data| data.is_object()) else {
        // `{"rc":0,"data":null}` is how unknown codes answer.
        return Ok(RawProviderResponse::default());
    };

    Ok(RawProviderResponse {
        price: lenient_positive(data.get("f43")),
        display_name: lenient_string(data.get("f58")),
        trailing_pe: nonzero_ratio(data.get("f164")),
        forward_pe: nonzero_ratio(data.get("f162")),
        ..RawProviderResponse::default()
    })
}

/// Loss-making issuers report negative P/E; keep the sign, drop zero.
fn nonzero_ratio(value: Option<&Value>) -> Option<f64> {
    super::lenient_f64(value).filter(|ratio| *ratio != 0.0)
}

fn parse_klines(payload: &Value) -> Result<Vec<PricePoint>, SourceError> {
    let Some(klines) = payload
        .get("data")
        .and_then(|data| data.get("klines"))
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    klines
        .iter()
        .filter_map(Value::as_str)
        .map(|line| {
            let mut columns = line.split(',');
            let (Some(date), Some(close)) = (columns.next(), columns.next()) else {
                return Err(SourceError::malformed(format!(
                    "eastmoney kline row has too few columns: '{line}'"
                )));
            };
            let ts = UtcDateTime::from_calendar_date(date)
                .map_err(|e| SourceError::malformed(e.to_string()))?;
            let close = close.trim().parse::<f64>().map_err(|_| {
                SourceError::malformed(format!("eastmoney kline close is not numeric: '{line}'"))
            })?;
            Ok(PricePoint { ts, close })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};

    const MOUTAI_QUOTE: &str = r#"{"rc":0,"rt":4,"data":{"f43":1685.01,"f57":"600519","f58":"贵州茅台","f162":24.12,"f164":23.45}}"#;
    const MOUTAI_KLINES: &str = r#"{"rc":0,"data":{"code":"600519","klines":["2024-01-03,1690.00","2024-01-02,1685.01"]}}"#;

    fn ticker(code: &str) -> Ticker {
        Ticker::parse(code).expect("valid ticker")
    }

    #[test]
    fn secid_follows_exchange_prefixes() {
        let cases = [
            ("600519", "1.600519"),
            ("900901", "1.900901"),
            ("000001", "0.000001"),
            ("300750", "0.300750"),
            ("830799", "0.830799"),
            ("00700", "116.00700"),
        ];
        for (code, expected) in cases {
            assert_eq!(EastmoneyAdapter::secid(&ticker(code)).expect("secid"), expected);
        }
        assert!(EastmoneyAdapter::secid(&ticker("AAPL")).is_err());
    }

    #[tokio::test]
    async fn parses_snapshot_and_history() {
        let client = RecordingHttpClient::default()
            .json("stock/get", MOUTAI_QUOTE)
            .json("kline/get", MOUTAI_KLINES);
        let adapter = EastmoneyAdapter::with_http_client(Arc::new(client.clone()));

        let raw = adapter
            .fetch_quote(&ticker("600519"), FetchOptions::default())
            .await
            .expect("quote parses");

        assert_eq!(raw.price, Some(1685.01));
        assert_eq!(raw.display_name.as_deref(), Some("贵州茅台"));
        assert_eq!(raw.trailing_pe, Some(23.45));
        assert_eq!(raw.forward_pe, Some(24.12));
        assert_eq!(raw.currency.as_deref(), Some("CNY"));
        assert_eq!(raw.growth_rate, None);
        assert_eq!(raw.price_history.as_ref().map(Vec::len), Some(2));

        let urls = client.urls();
        assert!(urls.iter().any(|url| url.contains("secid=1.600519")));
        assert!(urls.iter().any(|url| url.contains("lmt=250")));
    }

    #[tokio::test]
    async fn placeholders_read_as_missing() {
        let client = RecordingHttpClient::default().json(
            "stock/get",
            r#"{"rc":0,"data":{"f43":"-","f58":"停牌股","f162":"-","f164":0}}"#,
        );
        let adapter = EastmoneyAdapter::with_http_client(Arc::new(client));
        let options = FetchOptions {
            include_history: false,
            ..FetchOptions::default()
        };

        let raw = adapter
            .fetch_quote(&ticker("000001"), options)
            .await
            .expect("payload parses");
        assert_eq!(raw.price, None);
        assert_eq!(raw.trailing_pe, None);
        assert_eq!(raw.forward_pe, None);
        assert_eq!(raw.price_history, None);
    }

    #[tokio::test]
    async fn null_data_is_an_empty_response() {
        let client = RecordingHttpClient::default()
            .json("stock/get", r#"{"rc":0,"data":null}"#)
            .json("kline/get", r#"{"rc":0,"data":null}"#);
        let adapter = EastmoneyAdapter::with_http_client(Arc::new(client));

        let raw = adapter
            .fetch_quote(&ticker("99999"), FetchOptions::default())
            .await
            .expect("null data is not an error");
        assert_eq!(raw.price, None);
        assert_eq!(raw.currency.as_deref(), Some("HKD"));
    }

    #[tokio::test]
    async fn history_failure_degrades_to_none() {
        let client = RecordingHttpClient::default()
            .json("stock/get", MOUTAI_QUOTE)
            .route("kline/get", Err(HttpError::new("connection reset")));
        let adapter = EastmoneyAdapter::with_http_client(Arc::new(client));

        let raw = adapter
            .fetch_quote(&ticker("600519"), FetchOptions::default())
            .await
            .expect("quote still succeeds");
        assert_eq!(raw.price, Some(1685.01));
        assert_eq!(raw.price_history, None);
    }

    #[tokio::test]
    async fn rate_limit_status_is_classified() {
        let client = RecordingHttpClient::default().route(
            "stock/get",
            Ok(HttpResponse::with_status(429, "").with_header("Retry-After", "5")),
        );
        let adapter = EastmoneyAdapter::with_http_client(Arc::new(client));
        let options = FetchOptions {
            include_history: false,
            ..FetchOptions::default()
        };

        let error = adapter
            .fetch_quote(&ticker("600519"), options)
            .await
            .expect_err("429 must fail");
        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    }

    #[test]
    fn malformed_kline_rows_are_rejected() {
        let payload: Value =
            serde_json::from_str(r#"{"data":{"klines":["2024-01-02"]}}"#).expect("json");
        let error = parse_klines(&payload).expect_err("row without close");
        assert_eq!(error.kind(), SourceErrorKind::Malformed);
    }
}
