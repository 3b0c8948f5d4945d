//! # Domain Models
//!
//! Canonical types produced by the normalizer and consumed by the engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Trimmed, upper-cased, classified market identifier |
//! | [`MarketKind`] | Domestic (A-share), secondary (Hong Kong) or foreign (US) |
//! | [`QuoteRecord`] | Normalized price, P/E, growth and optional history |
//! | [`Sourced`] | Observed-or-defaulted wrapper for values that may be assumed |
//! | [`PartialQuote`] | Degraded record offered when financials are incomplete |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates invariants: prices are positive and finite, price
//! history is ascending, and the display name never ends up empty.

mod record;
mod ticker;
mod timestamp;

pub use record::{
    validate_currency_code, AnnualNetIncome, DefaultReason, PartialQuote, PricePoint,
    QuoteRecord, Sourced, ValueOrigin,
};
pub(crate) use record::sort_history;
pub use ticker::{classify, Classification, DomesticExchange, MarketKind, Ticker};
pub use timestamp::UtcDateTime;
