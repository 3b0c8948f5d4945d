use serde::{Deserialize, Serialize};

use crate::{MarketKind, ProviderId, Ticker, UtcDateTime, ValidationError};

/// Where an observed value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    TrailingPe,
    ForwardPe,
    ReportedGrowth,
    NetIncomeCagr,
    NetIncomeLinear,
}

/// Why a configured constant stands in for upstream data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReason {
    NoGrowthData,
    NoPeData,
}

impl DefaultReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoGrowthData => "no_growth_data",
            Self::NoPeData => "no_pe_data",
        }
    }
}

/// A value tagged with whether it was observed upstream or assumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sourced<T> {
    Observed { value: T, origin: ValueOrigin },
    Defaulted { value: T, reason: DefaultReason },
}

impl<T: Copy> Sourced<T> {
    pub const fn observed(value: T, origin: ValueOrigin) -> Self {
        Self::Observed { value, origin }
    }

    pub const fn defaulted(value: T, reason: DefaultReason) -> Self {
        Self::Defaulted { value, reason }
    }

    pub fn value(&self) -> T {
        match self {
            Self::Observed { value, .. } | Self::Defaulted { value, .. } => *value,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }

    pub fn origin(&self) -> Option<ValueOrigin> {
        match self {
            Self::Observed { origin, .. } => Some(*origin),
            Self::Defaulted { .. } => None,
        }
    }
}

/// Daily close used for charting only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: UtcDateTime,
    pub close: f64,
}

/// One fiscal year of reported net income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnualNetIncome {
    pub fiscal_year: i32,
    pub net_income: f64,
}

impl AnnualNetIncome {
    pub const fn new(fiscal_year: i32, net_income: f64) -> Self {
        Self {
            fiscal_year,
            net_income,
        }
    }
}

/// Canonical normalized quote consumed by the regression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub ticker: Ticker,
    pub market: MarketKind,
    pub provider: ProviderId,
    pub display_name: String,
    pub price: f64,
    pub currency: String,
    pub trailing_pe: Sourced<f64>,
    pub growth_rate: Sourced<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_history: Option<Vec<PricePoint>>,
    pub fetched_at: UtcDateTime,
}

impl QuoteRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: Ticker,
        provider: ProviderId,
        display_name: Option<String>,
        price: f64,
        currency: impl AsRef<str>,
        trailing_pe: Sourced<f64>,
        growth_rate: Sourced<f64>,
        price_history: Option<Vec<PricePoint>>,
    ) -> Result<Self, ValidationError> {
        validate_positive("price", price)?;
        validate_finite("trailing_pe", trailing_pe.value())?;
        validate_finite("growth_rate", growth_rate.value())?;

        let display_name = display_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ticker.as_str().to_owned());

        Ok(Self {
            market: ticker.market(),
            ticker,
            provider,
            display_name,
            price,
            currency: validate_currency_code(currency.as_ref())?,
            trailing_pe,
            growth_rate,
            price_history: price_history.map(sort_history),
            fetched_at: UtcDateTime::now(),
        })
    }

    /// True when either engine input is an assumption rather than upstream data.
    pub fn has_defaults(&self) -> bool {
        self.trailing_pe.is_defaulted() || self.growth_rate.is_defaulted()
    }
}

/// What could still be shown when earnings data is too thin to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialQuote {
    pub ticker: String,
    pub display_name: String,
    pub price: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_history: Option<Vec<PricePoint>>,
}

pub fn validate_currency_code(value: &str) -> Result<String, ValidationError> {
    let is_valid = value.len() == 3 && value.bytes().all(|byte| byte.is_ascii_uppercase());
    if is_valid {
        Ok(value.to_owned())
    } else {
        Err(ValidationError::InvalidCurrency {
            value: value.to_owned(),
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue { field })
    }
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveValue { field })
    }
}

/// Orders closes ascending by timestamp and keeps the last close per timestamp.
pub(crate) fn sort_history(mut points: Vec<PricePoint>) -> Vec<PricePoint> {
    points.retain(|point| point.close.is_finite() && point.close > 0.0);
    points.sort_by_key(|point| point.ts);
    points.dedup_by(|later, earlier| {
        if later.ts == earlier.ts {
            earlier.close = later.close;
            true
        } else {
            false
        }
    });
    points
}
