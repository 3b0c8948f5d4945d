use serde::Serialize;

use mungerline_core::{classify, Classification};

use crate::cli::ClassifyArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ClassifiedTicker<'a> {
    input: &'a str,
    classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ClassifyResponseData<'a> {
    tickers: Vec<ClassifiedTicker<'a>>,
}

pub fn run(args: &ClassifyArgs) -> Result<CommandResult, CliError> {
    let tickers = args
        .tickers
        .iter()
        .map(|input| {
            let classification = classify(input);
            ClassifiedTicker {
                input,
                classification,
                currency: classification.market().map(|market| market.currency()),
            }
        })
        .collect::<Vec<_>>();

    let warnings = tickers
        .iter()
        .filter(|ticker| ticker.classification == Classification::Invalid)
        .map(|ticker| format!("'{}' does not match any known market shape", ticker.input))
        .collect();

    let data = serde_json::to_value(ClassifyResponseData { tickers })?;
    Ok(CommandResult::ok(data).with_warnings(warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_market_shape() {
        let args = ClassifyArgs {
            tickers: ["600519", "00700", "aapl", "BRK.B"]
                .map(String::from)
                .to_vec(),
        };
        let result = run(&args).expect("classify never fails");

        let kinds = result.data["tickers"]
            .as_array()
            .expect("array")
            .iter()
            .map(|entry| entry["classification"].as_str().unwrap_or_default().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(kinds, ["domestic", "secondary", "foreign", "invalid"]);
        assert_eq!(result.data["tickers"][1]["currency"], "HKD");
        assert_eq!(result.warnings.len(), 1);
    }
}
