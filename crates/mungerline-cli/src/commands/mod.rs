mod analyze;
mod classify;
mod diagnose;

use mungerline_core::FetchError;
use serde::Serialize;
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<ErrorView>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_error(mut self, error: &FetchError) -> Self {
        self.errors.push(ErrorView::from(error));
        self
    }
}

/// Rendered form of a fetch failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorView {
    pub code: &'static str,
    pub message: String,
    pub hint: String,
}

impl From<&FetchError> for ErrorView {
    fn from(error: &FetchError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
            hint: error.user_hint(),
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Analyze(args) => analyze::run(args, cli.timeout_ms).await,
        Command::Diagnose(args) => diagnose::run(args),
        Command::Classify(args) => classify::run(args),
    }
}
