use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::FetchError;

/// Market tier a ticker belongs to, inferred purely from its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    /// Mainland A-share, six decimal digits.
    Domestic,
    /// Hong Kong, five decimal digits.
    Secondary,
    /// US listing, alphabetic.
    Foreign,
}

impl MarketKind {
    pub const ALL: [Self; 3] = [Self::Domestic, Self::Secondary, Self::Foreign];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::Secondary => "secondary",
            Self::Foreign => "foreign",
        }
    }

    pub const fn currency(self) -> &'static str {
        match self {
            Self::Domestic => "CNY",
            Self::Secondary => "HKD",
            Self::Foreign => "USD",
        }
    }
}

impl Display for MarketKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of shape classification. Every input maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Domestic,
    Secondary,
    Foreign,
    Invalid,
}

impl Classification {
    pub const fn market(self) -> Option<MarketKind> {
        match self {
            Self::Domestic => Some(MarketKind::Domestic),
            Self::Secondary => Some(MarketKind::Secondary),
            Self::Foreign => Some(MarketKind::Foreign),
            Self::Invalid => None,
        }
    }
}

/// Classifies a raw ticker string by shape.
///
/// Surrounding whitespace is ignored. Only ASCII digits and letters count,
/// so suffixed forms like `600519.SS` or `BRK.B` are `Invalid`.
pub fn classify(input: &str) -> Classification {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Classification::Invalid;
    }

    if trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return match trimmed.len() {
            6 => Classification::Domestic,
            5 => Classification::Secondary,
            _ => Classification::Invalid,
        };
    }

    if trimmed.bytes().all(|byte| byte.is_ascii_alphabetic()) {
        return Classification::Foreign;
    }

    Classification::Invalid
}

/// Mainland exchange a domestic code is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomesticExchange {
    Shanghai,
    Shenzhen,
    Beijing,
}

/// Normalized, classified market identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    code: String,
    market: MarketKind,
}

impl Ticker {
    /// Trims, upper-cases alphabetic tickers and classifies the input.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let market = classify(input)
            .market()
            .ok_or_else(|| FetchError::invalid_format(input.trim()))?;

        Ok(Self {
            code: input.trim().to_ascii_uppercase(),
            market,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub const fn market(&self) -> MarketKind {
        self.market
    }

    /// Listing venue for domestic codes, `None` for other markets.
    pub fn domestic_exchange(&self) -> Option<DomesticExchange> {
        if self.market != MarketKind::Domestic {
            return None;
        }

        Some(match self.code.as_bytes().first() {
            Some(b'6') | Some(b'9') => DomesticExchange::Shanghai,
            Some(b'4') | Some(b'8') => DomesticExchange::Beijing,
            _ => DomesticExchange::Shenzhen,
        })
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Ticker {
    type Error = FetchError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_reference_shapes() {
        assert_eq!(classify("600519"), Classification::Domestic);
        assert_eq!(classify("00700"), Classification::Secondary);
        assert_eq!(classify("AAPL"), Classification::Foreign);
        assert_eq!(classify("600519.SS"), Classification::Invalid);
    }

    #[test]
    fn digit_strings_of_other_lengths_are_invalid() {
        assert_eq!(classify("1234"), Classification::Invalid);
        assert_eq!(classify("1234567"), Classification::Invalid);
        assert_eq!(classify(""), Classification::Invalid);
        assert_eq!(classify("   "), Classification::Invalid);
    }

    #[test]
    fn mixed_and_non_ascii_inputs_are_invalid() {
        assert_eq!(classify("BRK.B"), Classification::Invalid);
        assert_eq!(classify("A1"), Classification::Invalid);
        assert_eq!(classify("茅台"), Classification::Invalid);
        assert_eq!(classify("６００５１９"), Classification::Invalid);
    }

    #[test]
    fn parse_trims_and_uppercases() {
        let ticker = Ticker::parse("  msft ").expect("ticker should parse");
        assert_eq!(ticker.as_str(), "MSFT");
        assert_eq!(ticker.market(), MarketKind::Foreign);
    }

    #[test]
    fn parse_rejects_invalid_shape() {
        let error = Ticker::parse("600519.SS").expect_err("must fail");
        assert!(matches!(error, FetchError::InvalidFormat { ref ticker } if ticker == "600519.SS"));
    }

    #[test]
    fn domestic_exchange_follows_code_prefix() {
        let exchange = |code: &str| {
            Ticker::parse(code)
                .expect("valid domestic code")
                .domestic_exchange()
        };

        assert_eq!(exchange("600519"), Some(DomesticExchange::Shanghai));
        assert_eq!(exchange("688981"), Some(DomesticExchange::Shanghai));
        assert_eq!(exchange("000001"), Some(DomesticExchange::Shenzhen));
        assert_eq!(exchange("300750"), Some(DomesticExchange::Shenzhen));
        assert_eq!(exchange("830799"), Some(DomesticExchange::Beijing));
        assert_eq!(
            Ticker::parse("00700")
                .expect("valid secondary code")
                .domestic_exchange(),
            None
        );
    }
}
