//! CLI argument definitions for mungerline.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `analyze` | Fetch a ticker and estimate its years to regress |
//! | `diagnose` | Run the regression on explicit inputs, no network |
//! | `classify` | Show the market tier each ticker shape maps to |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-ms` | env or `8000` | Upstream call budget in ms |
//! | `--log-level` | `warn` | Base tracing level, overridden by `RUST_LOG` |
//! | `--log-format` | `pretty` | Log line format on stderr (pretty, json) |
//!
//! # Examples
//!
//! ```bash
//! mungerline analyze 600519 --target-pe 25
//! mungerline analyze AAPL --format table
//! mungerline diagnose --pe 30 --growth 15% --target-pe 20
//! mungerline classify 600519 00700 AAPL BRK.B
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

pub const DEFAULT_TARGET_PE: f64 = 20.0;
pub const MIN_TARGET_PE: f64 = 10.0;
pub const MAX_TARGET_PE: f64 = 40.0;

/// How many years of earnings growth until today's price looks reasonable?
#[derive(Debug, Parser)]
#[command(
    name = "mungerline",
    author,
    version,
    about = "Years-to-regress valuation for A-share, Hong Kong and US tickers"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Upstream call budget in milliseconds. Overrides MUNGERLINE_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Base log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned key/value lines for terminal display.
    Table,
    /// Single JSON object.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a ticker and estimate the years until its P/E regresses to the target.
    ///
    /// # Examples
    ///
    ///   mungerline analyze 600519
    ///   mungerline analyze 00700 --target-pe 15 --no-history
    ///   mungerline analyze AAPL --refresh --pretty
    Analyze(AnalyzeArgs),

    /// Run the regression on explicit P/E and growth inputs.
    ///
    /// # Examples
    ///
    ///   mungerline diagnose --pe 30 --growth 0.15
    ///   mungerline diagnose --pe 45 --growth 12% --target-pe 25
    Diagnose(DiagnoseArgs),

    /// Classify ticker shapes without fetching anything.
    Classify(ClassifyArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// A-share code (600519), Hong Kong code (00700) or US ticker (AAPL).
    pub ticker: String,

    /// Target P/E multiple, between 10 and 40.
    #[arg(long, default_value_t = DEFAULT_TARGET_PE, value_parser = parse_target_pe)]
    pub target_pe: f64,

    /// Trading days of price history to request. Overrides MUNGERLINE_HISTORY_DAYS.
    #[arg(long, conflicts_with = "no_history")]
    pub history_days: Option<u32>,

    /// Skip the price-history sub-fetch.
    #[arg(long, default_value_t = false)]
    pub no_history: bool,

    /// Ignore any cached quote and fetch fresh data.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,
}

#[derive(Debug, Args)]
pub struct DiagnoseArgs {
    /// Current P/E. Negative values describe loss-making companies.
    #[arg(long, allow_hyphen_values = true)]
    pub pe: f64,

    /// Annual earnings growth as a fraction (0.15) or percentage (15%).
    #[arg(long, allow_hyphen_values = true, value_parser = parse_growth)]
    pub growth: f64,

    /// Target P/E multiple, between 10 and 40.
    #[arg(long, default_value_t = DEFAULT_TARGET_PE, value_parser = parse_target_pe)]
    pub target_pe: f64,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,
}

fn parse_target_pe(value: &str) -> Result<f64, String> {
    let target: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !(MIN_TARGET_PE..=MAX_TARGET_PE).contains(&target) {
        return Err(format!(
            "target P/E must be between {MIN_TARGET_PE} and {MAX_TARGET_PE}"
        ));
    }
    Ok(target)
}

fn parse_growth(value: &str) -> Result<f64, String> {
    let trimmed = value.trim();
    let (number, scale) = match trimmed.strip_suffix('%') {
        Some(number) => (number.trim(), 100.0),
        None => (trimmed, 1.0),
    };
    let rate = number
        .parse::<f64>()
        .map_err(|_| format!("'{value}' is not a growth rate"))?
        / scale;
    if !rate.is_finite() {
        return Err(format!("'{value}' is not a finite growth rate"));
    }
    Ok(rate)
}
