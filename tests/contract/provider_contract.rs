use std::sync::Arc;

use mungerline_core::{
    EastmoneyAdapter, FetchOptions, MarketDataSource, MarketKind, NoopHttpClient, ProviderId,
    SourceErrorKind, Ticker, YahooAdapter,
};

#[derive(Clone)]
struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn MarketDataSource>,
    markets: &'static [MarketKind],
    sample: &'static str,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Eastmoney,
            source: Arc::new(EastmoneyAdapter::default()),
            markets: &[MarketKind::Domestic, MarketKind::Secondary],
            sample: "600519",
        },
        ProviderCase {
            id: ProviderId::Yahoo,
            source: Arc::new(YahooAdapter::with_http_client(Arc::new(NoopHttpClient), None)),
            markets: &[MarketKind::Foreign],
            sample: "AAPL",
        },
    ]
}

fn ticker(code: &str) -> Ticker {
    Ticker::parse(code).expect("valid ticker")
}

#[test]
fn every_market_has_exactly_one_provider() {
    let cases = provider_cases();
    for market in MarketKind::ALL {
        let serving = cases
            .iter()
            .filter(|case| case.source.supports(market))
            .count();
        assert_eq!(serving, 1, "{market}");
    }
}

#[test]
fn providers_report_their_identity() {
    for case in provider_cases() {
        assert_eq!(case.source.id(), case.id);
        assert_eq!(case.source.markets(), case.markets);
    }
}

#[tokio::test]
async fn empty_payloads_yield_no_price() {
    for case in provider_cases() {
        let raw = case
            .source
            .fetch_quote(&ticker(case.sample), FetchOptions::default())
            .await
            .unwrap_or_else(|error| panic!("{}: {error}", case.id));

        assert_eq!(raw.price, None, "{}", case.id);
        assert_eq!(raw.trailing_pe, None, "{}", case.id);
        assert_eq!(raw.growth_rate, None, "{}", case.id);
    }
}

#[tokio::test]
async fn eastmoney_refuses_foreign_tickers() {
    let adapter = EastmoneyAdapter::default();

    let error = adapter
        .fetch_quote(&ticker("AAPL"), FetchOptions::default())
        .await
        .expect_err("eastmoney does not serve US listings");

    assert_eq!(error.kind(), SourceErrorKind::Internal);
}
