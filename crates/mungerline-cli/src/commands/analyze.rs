use std::time::Duration;

use serde::Serialize;

use mungerline_core::{
    analyze, Analysis, CacheMode, FetchError, NormalizerBuilder, PartialQuote, QuoteRecord,
};

use crate::cli::AnalyzeArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct AnalyzeResponseData<'a> {
    record: &'a QuoteRecord,
    analysis: &'a Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    band_label: Option<&'static str>,
}

/// What is left to show when earnings data is too thin for the model.
#[derive(Debug, Serialize)]
struct DegradedResponseData<'a> {
    ticker: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial: Option<&'a PartialQuote>,
}

pub async fn run(args: &AnalyzeArgs, timeout_ms: Option<u64>) -> Result<CommandResult, CliError> {
    let mut builder = NormalizerBuilder::from_env()?.with_real_clients();
    let config = builder.config_mut();
    if let Some(timeout_ms) = timeout_ms {
        config.timeout = Duration::from_millis(timeout_ms.max(1));
    }
    if let Some(days) = args.history_days {
        *config = config.clone().with_history_days(days);
    }
    if args.no_history {
        config.include_history = false;
    }
    let normalizer = builder.build();

    let cache_mode = if args.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    };

    match normalizer.normalize_with(&args.ticker, cache_mode).await {
        Ok(record) => {
            let analysis = analyze(&record, args.target_pe);
            let data = serde_json::to_value(AnalyzeResponseData {
                record: &record,
                analysis: &analysis,
                band_label: analysis.band.map(|band| band.label()),
            })?;
            Ok(CommandResult::ok(data).with_warnings(analysis.warnings.clone()))
        }
        Err(error @ FetchError::InvalidFormat { .. }) => Err(error.into()),
        Err(error) => {
            let data = serde_json::to_value(DegradedResponseData {
                ticker: args.ticker.trim(),
                partial: error.partial(),
            })?;
            Ok(CommandResult::ok(data).with_error(&error))
        }
    }
}
