//! Valuation regression engine.
//!
//! Answers: after how many years of compounding earnings growth does the
//! current price imply only the target P/E? From
//! `current_pe / (1 + g)^years = target_pe` the closed form is
//! `years = ln(current_pe / target_pe) / ln(1 + g)`.
//!
//! # Evaluation order
//!
//! | Step | Condition | Result |
//! |------|-----------|--------|
//! | 1 | `target_pe` not finite or `<= 0` | `NotApplicable(target_pe_invalid)` |
//! | 2 | `current_pe` not finite or `<= 0` | `NotApplicable(pe_invalid)` |
//! | 3 | `growth_rate` not `> 0` | `NotApplicable(non_positive_growth)` |
//! | 4 | `current_pe <= target_pe` | `AlreadyAttractive` |
//! | 5 | `1 + growth_rate <= 0` | `NotApplicable(growth_below_floor)` |
//! | 6 | otherwise | `YearsToRegress(years)` |
//!
//! The growth check runs before the valuation check, so a cheap stock with
//! shrinking earnings is `NotApplicable`, not `AlreadyAttractive`.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::band::{BandThresholds, ValuationBand};
use crate::{DefaultReason, QuoteRecord, Sourced};

/// Why the compounding model does not apply to an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotApplicableReason {
    PeInvalid,
    NonPositiveGrowth,
    GrowthBelowFloor,
    TargetPeInvalid,
}

impl NotApplicableReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PeInvalid => "pe_invalid",
            Self::NonPositiveGrowth => "non_positive_growth",
            Self::GrowthBelowFloor => "growth_below_floor",
            Self::TargetPeInvalid => "target_pe_invalid",
        }
    }
}

impl Display for NotApplicableReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine output. Exactly one variant per `(current_pe, growth_rate, target_pe)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosisResult {
    AlreadyAttractive,
    YearsToRegress { years: f64 },
    NotApplicable { reason: NotApplicableReason },
}

impl DiagnosisResult {
    pub const fn years(&self) -> Option<f64> {
        match self {
            Self::YearsToRegress { years } => Some(*years),
            _ => None,
        }
    }

    pub const fn is_applicable(&self) -> bool {
        !matches!(self, Self::NotApplicable { .. })
    }
}

/// Computes years-to-regress. Pure, total and deterministic.
pub fn diagnose(current_pe: f64, growth_rate: f64, target_pe: f64) -> DiagnosisResult {
    if !(target_pe.is_finite() && target_pe > 0.0) {
        return not_applicable(NotApplicableReason::TargetPeInvalid);
    }
    if !(current_pe.is_finite() && current_pe > 0.0) {
        return not_applicable(NotApplicableReason::PeInvalid);
    }
    if !(growth_rate.is_finite() && growth_rate > 0.0) {
        return not_applicable(NotApplicableReason::NonPositiveGrowth);
    }
    if current_pe <= target_pe {
        return DiagnosisResult::AlreadyAttractive;
    }

    if growth_rate <= -1.0 {
        return not_applicable(NotApplicableReason::GrowthBelowFloor);
    }

    // ln_1p keeps precision for tiny rates where 1.0 + g rounds to 1.0, and
    // the log difference cannot overflow the way pe / target can.
    let years = (current_pe.ln() - target_pe.ln()) / growth_rate.ln_1p();
    if !years.is_finite() {
        return not_applicable(NotApplicableReason::GrowthBelowFloor);
    }
    DiagnosisResult::YearsToRegress { years }
}

fn not_applicable(reason: NotApplicableReason) -> DiagnosisResult {
    debug!(reason = reason.as_str(), "valuation model not applicable");
    DiagnosisResult::NotApplicable { reason }
}

/// Diagnosis of a normalized record plus the presentation-facing extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub target_pe: f64,
    pub current_pe: f64,
    pub growth_rate: f64,
    pub diagnosis: DiagnosisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<ValuationBand>,
    /// One entry per engine input that was assumed rather than observed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Runs [`diagnose`] on a record with the default band thresholds.
pub fn analyze(record: &QuoteRecord, target_pe: f64) -> Analysis {
    analyze_with(record, target_pe, &BandThresholds::default())
}

pub fn analyze_with(record: &QuoteRecord, target_pe: f64, thresholds: &BandThresholds) -> Analysis {
    let current_pe = record.trailing_pe.value();
    let growth_rate = record.growth_rate.value();
    let diagnosis = diagnose(current_pe, growth_rate, target_pe);

    let mut warnings = Vec::new();
    if let Some(warning) = default_warning("P/E", &record.trailing_pe) {
        warnings.push(warning);
    }
    if let Some(warning) = default_warning("growth rate", &record.growth_rate) {
        warnings.push(warning);
    }

    Analysis {
        target_pe,
        current_pe,
        growth_rate,
        diagnosis,
        band: thresholds.classify(&diagnosis),
        warnings,
    }
}

fn default_warning(label: &str, value: &Sourced<f64>) -> Option<String> {
    match value {
        Sourced::Defaulted { value, reason } => Some(match reason {
            DefaultReason::NoGrowthData => format!(
                "{label} {:.1}% is an assumed market default ({})",
                value * 100.0,
                reason.as_str()
            ),
            DefaultReason::NoPeData => format!(
                "{label} {value:.2} is an assumed market default ({})",
                reason.as_str()
            ),
        }),
        Sourced::Observed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderId, Ticker, ValueOrigin};

    #[test]
    fn reference_scenario_regresses_in_about_three_years() {
        let result = diagnose(30.0, 0.15, 20.0);
        let years = result.years().expect("years expected");
        assert!((years - 2.901).abs() < 1e-3, "years={years}");
    }

    #[test]
    fn cheap_stock_is_already_attractive() {
        assert_eq!(diagnose(15.0, 0.12, 20.0), DiagnosisResult::AlreadyAttractive);
        assert_eq!(diagnose(20.0, 0.12, 20.0), DiagnosisResult::AlreadyAttractive);
    }

    #[test]
    fn growth_check_runs_before_valuation_check() {
        assert_eq!(
            diagnose(15.0, -0.05, 20.0),
            DiagnosisResult::NotApplicable {
                reason: NotApplicableReason::NonPositiveGrowth
            }
        );
        assert_eq!(
            diagnose(15.0, 0.0, 20.0),
            DiagnosisResult::NotApplicable {
                reason: NotApplicableReason::NonPositiveGrowth
            }
        );
    }

    #[test]
    fn invalid_pe_values_are_not_applicable() {
        for pe in [0.0, -12.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                diagnose(pe, 0.1, 20.0),
                DiagnosisResult::NotApplicable {
                    reason: NotApplicableReason::PeInvalid
                },
                "pe={pe}"
            );
        }
    }

    #[test]
    fn invalid_target_is_not_applicable() {
        assert_eq!(
            diagnose(30.0, 0.1, 0.0),
            DiagnosisResult::NotApplicable {
                reason: NotApplicableReason::TargetPeInvalid
            }
        );
    }

    #[test]
    fn nan_growth_is_treated_as_non_positive() {
        assert_eq!(
            diagnose(30.0, f64::NAN, 20.0),
            DiagnosisResult::NotApplicable {
                reason: NotApplicableReason::NonPositiveGrowth
            }
        );
    }

    #[test]
    fn tiny_growth_gives_finite_years() {
        let years = diagnose(30.0, 1e-9, 20.0).years().expect("years to regress");
        let exact = 1.5_f64.ln() / 1e-9_f64.ln_1p();
        assert!(years.is_finite());
        assert!(((years - exact) / exact).abs() < 1e-12);

        let years = diagnose(30.0, 1e-17, 20.0).years().expect("years to regress");
        assert!(years.is_finite() && years > 0.0);
        assert!(years > diagnose(30.0, 1e-9, 20.0).years().unwrap_or_default());
    }

    #[test]
    fn vanishing_growth_is_below_floor() {
        assert_eq!(
            diagnose(30.0, f64::MIN_POSITIVE * 1e-10, 20.0),
            DiagnosisResult::NotApplicable {
                reason: NotApplicableReason::GrowthBelowFloor
            }
        );
    }

    #[test]
    fn extreme_pe_ratio_does_not_overflow() {
        let years = diagnose(1e308, 0.10, 1e-10).years().expect("years to regress");
        assert!(years.is_finite() && years > 0.0);
    }

    #[test]
    fn analysis_flags_defaulted_growth() {
        let record = QuoteRecord::new(
            Ticker::parse("600519").expect("valid ticker"),
            ProviderId::Eastmoney,
            Some(String::from("贵州茅台")),
            1_650.0,
            "CNY",
            Sourced::observed(24.0, ValueOrigin::TrailingPe),
            Sourced::defaulted(0.12, DefaultReason::NoGrowthData),
            None,
        )
        .expect("record builds");

        let analysis = analyze(&record, 20.0);
        assert_eq!(analysis.current_pe, 24.0);
        assert!(analysis.diagnosis.years().is_some());
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("12.0%"), "{}", analysis.warnings[0]);
        assert_eq!(analysis.band, Some(ValuationBand::HighlyAttractive));
    }

    #[test]
    fn diagnosis_serializes_with_kind_tag() {
        let json = serde_json::to_value(DiagnosisResult::NotApplicable {
            reason: NotApplicableReason::PeInvalid,
        })
        .expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({"kind": "not_applicable", "reason": "pe_invalid"})
        );
    }
}
