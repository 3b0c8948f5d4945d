use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::{CommandResult, ErrorView};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    data: &'a Value,
    #[serde(skip_serializing_if = "is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    errors: &'a [ErrorView],
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

pub fn render(result: &CommandResult, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", to_json(result, pretty)?),
        OutputFormat::Table => print!("{}", to_table(result)),
    }
    Ok(())
}

fn to_json(result: &CommandResult, pretty: bool) -> Result<String, CliError> {
    let output = JsonOutput {
        data: &result.data,
        warnings: &result.warnings,
        errors: &result.errors,
    };
    let payload = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    Ok(payload)
}

/// Flattens the data object into `path : value` lines. Price history is
/// summarized rather than listed point by point.
fn to_table(result: &CommandResult) -> String {
    let mut rows = Vec::new();
    flatten("", &result.data, &mut rows);

    let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (key, value) in &rows {
        out.push_str(&format!("{key:<width$} : {value}\n"));
    }

    if !result.warnings.is_empty() {
        out.push_str("warnings:\n");
        for warning in &result.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }

    if !result.errors.is_empty() {
        out.push_str("errors:\n");
        for error in &result.errors {
            out.push_str(&format!("  - {}: {}\n", error.code, error.message));
            out.push_str(&format!("    hint: {}\n", error.hint));
        }
    }

    out
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, rows);
            }
        }
        Value::Array(items) if key_is_history(prefix) => {
            let summary = match (items.first(), items.last()) {
                (Some(first), Some(last)) => format!(
                    "{} points, {} .. {}",
                    items.len(),
                    first["ts"].as_str().unwrap_or("?"),
                    last["ts"].as_str().unwrap_or("?")
                ),
                _ => String::from("0 points"),
            };
            rows.push((prefix.to_owned(), summary));
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{index}]"), child, rows);
            }
        }
        Value::String(text) => rows.push((prefix.to_owned(), text.clone())),
        Value::Number(number) => rows.push((prefix.to_owned(), format_number(number))),
        other => rows.push((prefix.to_owned(), other.to_string())),
    }
}

fn key_is_history(path: &str) -> bool {
    path.ends_with("price_history")
}

fn format_number(number: &serde_json::Number) -> String {
    match number.as_f64() {
        Some(value) if number.is_f64() => format!("{value:.4}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned(),
        _ => number.to_string(),
    }
}
