use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::engine::DiagnosisResult;

/// Presentation bucket for a diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationBand {
    Undervalued,
    HighlyAttractive,
    Fair,
    Overheated,
}

impl ValuationBand {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undervalued => "undervalued",
            Self::HighlyAttractive => "highly_attractive",
            Self::Fair => "fair",
            Self::Overheated => "overheated",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Undervalued => "Undervalued",
            Self::HighlyAttractive => "Highly attractive",
            Self::Fair => "Fair",
            Self::Overheated => "Overheated",
        }
    }
}

impl Display for ValuationBand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Year cut-offs between bands. Boundaries fall into the middle band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub attractive_below: f64,
    pub overheated_above: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            attractive_below: 3.0,
            overheated_above: 7.0,
        }
    }
}

impl BandThresholds {
    /// `None` for `NotApplicable`; the model says nothing about those inputs.
    pub fn classify(&self, diagnosis: &DiagnosisResult) -> Option<ValuationBand> {
        match diagnosis {
            DiagnosisResult::AlreadyAttractive => Some(ValuationBand::Undervalued),
            DiagnosisResult::YearsToRegress { years } => Some(self.band_for_years(*years)),
            DiagnosisResult::NotApplicable { .. } => None,
        }
    }

    pub fn band_for_years(&self, years: f64) -> ValuationBand {
        if years < self.attractive_below {
            ValuationBand::HighlyAttractive
        } else if years > self.overheated_above {
            ValuationBand::Overheated
        } else {
            ValuationBand::Fair
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NotApplicableReason;

    #[test]
    fn boundaries_belong_to_fair() {
        let thresholds = BandThresholds::default();
        assert_eq!(thresholds.band_for_years(2.99), ValuationBand::HighlyAttractive);
        assert_eq!(thresholds.band_for_years(3.0), ValuationBand::Fair);
        assert_eq!(thresholds.band_for_years(7.0), ValuationBand::Fair);
        assert_eq!(thresholds.band_for_years(7.01), ValuationBand::Overheated);
    }

    #[test]
    fn not_applicable_has_no_band() {
        let thresholds = BandThresholds::default();
        assert_eq!(
            thresholds.classify(&DiagnosisResult::NotApplicable {
                reason: NotApplicableReason::PeInvalid
            }),
            None
        );
        assert_eq!(
            thresholds.classify(&DiagnosisResult::AlreadyAttractive),
            Some(ValuationBand::Undervalued)
        );
    }
}
