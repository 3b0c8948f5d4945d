use serde::Serialize;

use mungerline_core::{diagnose, BandThresholds, DiagnosisResult, ValuationBand};

use crate::cli::DiagnoseArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct DiagnoseResponseData {
    current_pe: f64,
    growth_rate: f64,
    target_pe: f64,
    diagnosis: DiagnosisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    band: Option<ValuationBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    band_label: Option<&'static str>,
}

pub fn run(args: &DiagnoseArgs) -> Result<CommandResult, CliError> {
    let diagnosis = diagnose(args.pe, args.growth, args.target_pe);
    let band = BandThresholds::default().classify(&diagnosis);

    let data = serde_json::to_value(DiagnoseResponseData {
        current_pe: args.pe,
        growth_rate: args.growth,
        target_pe: args.target_pe,
        diagnosis,
        band,
        band_label: band.map(ValuationBand::label),
    })?;
    Ok(CommandResult::ok(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expensive_growth_stock_gets_years_and_band() {
        let result = run(&DiagnoseArgs {
            pe: 30.0,
            growth: 0.15,
            target_pe: 20.0,
        })
        .expect("diagnose never fails");

        assert_eq!(result.data["diagnosis"]["kind"], "years_to_regress");
        assert_eq!(result.data["band"], "highly_attractive");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn not_applicable_has_no_band() {
        let result = run(&DiagnoseArgs {
            pe: 15.0,
            growth: -0.05,
            target_pe: 20.0,
        })
        .expect("diagnose never fails");

        assert_eq!(result.data["diagnosis"]["kind"], "not_applicable");
        assert_eq!(result.data["diagnosis"]["reason"], "non_positive_growth");
        assert!(result.data.get("band").is_none());
    }
}
