//! Multi-year earnings growth from annual net-income series.
//!
//! Providers that report statements instead of a growth percentage are reduced
//! to a single rate here. Both endpoints positive gives a compound annual rate;
//! a sign change or non-positive endpoint falls back to a linear rate scaled by
//! the magnitude of the earliest year.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AnnualNetIncome, FetchError, ValueOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMethod {
    Cagr,
    Linear,
}

impl GrowthMethod {
    pub const fn origin(self) -> ValueOrigin {
        match self {
            Self::Cagr => ValueOrigin::NetIncomeCagr,
            Self::Linear => ValueOrigin::NetIncomeLinear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    pub rate: f64,
    pub method: GrowthMethod,
    pub earliest_year: i32,
    pub latest_year: i32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrowthError {
    #[error("need net income for at least two fiscal years, found {found}")]
    InsufficientHistory { found: usize },

    #[error("earliest net income ({year}) is zero; growth cannot be scaled")]
    ZeroBase { year: i32 },
}

impl From<GrowthError> for FetchError {
    fn from(error: GrowthError) -> Self {
        FetchError::incomplete(error.to_string())
    }
}

/// Estimates annual growth between the earliest and latest fiscal years.
///
/// Non-finite values are dropped. When a fiscal year appears more than once the
/// last entry wins.
pub fn net_income_growth(series: &[AnnualNetIncome]) -> Result<GrowthEstimate, GrowthError> {
    let by_year = series
        .iter()
        .filter(|entry| entry.net_income.is_finite())
        .map(|entry| (entry.fiscal_year, entry.net_income))
        .collect::<BTreeMap<_, _>>();

    let (Some((&earliest_year, &earliest)), Some((&latest_year, &latest))) =
        (by_year.first_key_value(), by_year.last_key_value())
    else {
        return Err(GrowthError::InsufficientHistory { found: 0 });
    };

    if by_year.len() < 2 {
        return Err(GrowthError::InsufficientHistory {
            found: by_year.len(),
        });
    }

    let years = f64::from((latest_year - earliest_year).max(1));

    if earliest > 0.0 && latest > 0.0 {
        return Ok(GrowthEstimate {
            rate: (latest / earliest).powf(1.0 / years) - 1.0,
            method: GrowthMethod::Cagr,
            earliest_year,
            latest_year,
        });
    }

    if earliest == 0.0 {
        return Err(GrowthError::ZeroBase {
            year: earliest_year,
        });
    }

    Ok(GrowthEstimate {
        rate: (latest - earliest) / earliest.abs() / years,
        method: GrowthMethod::Linear,
        earliest_year,
        latest_year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(i32, f64)]) -> Vec<AnnualNetIncome> {
        values
            .iter()
            .map(|&(year, income)| AnnualNetIncome::new(year, income))
            .collect()
    }

    #[test]
    fn compounds_between_positive_endpoints() {
        let estimate = net_income_growth(&series(&[
            (2020, 100.0),
            (2021, 100.0),
            (2022, 100.0),
            (2023, 200.0),
        ]))
        .expect("growth should compute");

        assert_eq!(estimate.method, GrowthMethod::Cagr);
        assert_eq!((estimate.earliest_year, estimate.latest_year), (2020, 2023));
        assert!((estimate.rate - 0.259_921).abs() < 1e-6, "rate={}", estimate.rate);
    }

    #[test]
    fn unsorted_input_is_ordered_by_year() {
        let estimate = net_income_growth(&series(&[(2023, 121.0), (2021, 100.0), (2022, 110.0)]))
            .expect("growth should compute");

        assert!((estimate.rate - 0.10).abs() < 1e-9, "rate={}", estimate.rate);
    }

    #[test]
    fn sign_change_uses_linear_rate() {
        let estimate =
            net_income_growth(&series(&[(2021, -50.0), (2023, 50.0)])).expect("linear growth");

        assert_eq!(estimate.method, GrowthMethod::Linear);
        assert!((estimate.rate - 1.0).abs() < 1e-12, "rate={}", estimate.rate);
    }

    #[test]
    fn shrinking_into_loss_is_negative_linear_rate() {
        let estimate =
            net_income_growth(&series(&[(2022, 80.0), (2023, -20.0)])).expect("linear growth");

        assert_eq!(estimate.method, GrowthMethod::Linear);
        assert!((estimate.rate + 1.25).abs() < 1e-12, "rate={}", estimate.rate);
    }

    #[test]
    fn single_year_is_insufficient() {
        let error = net_income_growth(&series(&[(2023, 10.0), (2023, 12.0)]))
            .expect_err("one distinct year must fail");
        assert_eq!(error, GrowthError::InsufficientHistory { found: 1 });

        let empty = net_income_growth(&[]).expect_err("empty must fail");
        assert_eq!(empty, GrowthError::InsufficientHistory { found: 0 });
    }

    #[test]
    fn non_finite_points_are_ignored() {
        let error = net_income_growth(&series(&[(2022, f64::NAN), (2023, 12.0)]))
            .expect_err("only one usable point");
        assert_eq!(error, GrowthError::InsufficientHistory { found: 1 });
    }

    #[test]
    fn zero_base_cannot_be_scaled() {
        let error =
            net_income_growth(&series(&[(2021, 0.0), (2023, 40.0)])).expect_err("zero base");
        assert_eq!(error, GrowthError::ZeroBase { year: 2021 });
    }

    #[test]
    fn growth_errors_become_incomplete_financials() {
        let error: FetchError = GrowthError::InsufficientHistory { found: 1 }.into();
        assert!(matches!(error, FetchError::IncompleteFinancials { partial: None, .. }));
    }
}
