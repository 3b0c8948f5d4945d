//! # Mungerline Core
//!
//! Market data normalization and the "years to regress" valuation engine.
//!
//! ## Overview
//!
//! Given a ticker and a target P/E, answers: how many years of compounding
//! earnings growth must pass before today's price implies only the target
//! multiple? The crate has two halves:
//!
//! - **Normalizer**: classifies the ticker, calls the provider for its market
//!   and reconciles the payload into one [`QuoteRecord`], tagging every
//!   assumed value as [`Sourced::Defaulted`]
//! - **Engine**: the pure [`diagnose`] function and the [`analyze`]
//!   convenience over a record
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Eastmoney (A-share, Hong Kong) and Yahoo (US) adapters |
//! | [`band`] | Presentation bands over a diagnosis |
//! | [`cache`] | Short-lived quote cache |
//! | [`config`] | Normalizer configuration and market fallback policy |
//! | [`data_source`] | Adapter trait, raw payload and source errors |
//! | [`domain`] | Ticker, quote record and timestamp types |
//! | [`engine`] | Valuation regression |
//! | [`error`] | Fetch and validation errors |
//! | [`growth`] | Multi-year net-income growth |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalizer`] | Ticker → record pipeline |
//! | [`provider_policy`] | Per-provider budgets and retry |
//! | [`retry`] | Bounded retry with jitter |
//! | [`source`] | Provider identifiers |
//! | [`throttling`] | Local rate limiting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mungerline_core::{analyze, Normalizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let normalizer = Normalizer::builder().with_real_clients().build();
//!     let record = normalizer.normalize("600519").await?;
//!     let analysis = analyze(&record, 20.0);
//!     println!("{}: {:?}", record.display_name, analysis.diagnosis);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod band;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod engine;
pub mod error;
pub mod growth;
pub mod http_client;
pub mod normalizer;
pub mod provider_policy;
pub mod retry;
pub mod source;
pub mod throttling;

// Adapters
pub use adapters::{EastmoneyAdapter, YahooAdapter, YahooAuthManager};

// Engine and bands
pub use band::{BandThresholds, ValuationBand};
pub use engine::{analyze, analyze_with, diagnose, Analysis, DiagnosisResult, NotApplicableReason};

// Cache
pub use cache::{CacheMode, QuoteCache};

// Configuration
pub use config::{ConfigError, MarketPolicy, NormalizerConfig};

// Data source contract
pub use data_source::{
    FetchOptions, MarketDataSource, RawProviderResponse, SourceError, SourceErrorKind,
    SourceFuture,
};

// Domain types
pub use domain::{
    classify, validate_currency_code, AnnualNetIncome, Classification, DefaultReason,
    DomesticExchange, MarketKind, PartialQuote, PricePoint, QuoteRecord, Sourced, Ticker,
    UtcDateTime, ValueOrigin,
};

// Error types
pub use error::{FetchError, ValidationError};

// Growth estimation
pub use growth::{net_income_growth, GrowthError, GrowthEstimate, GrowthMethod};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Normalizer
pub use normalizer::{build_record, Normalizer, NormalizerBuilder};

// Provider policies, retry and throttling
pub use provider_policy::ProviderPolicy;
pub use retry::{Backoff, RetryConfig};
pub use throttling::ThrottlingQueue;

// Source identifiers
pub use source::ProviderId;
