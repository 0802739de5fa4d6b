//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::cli::parse::{Commands, ConfigCommands, OutputFormat};
use crate::error::{CliError, PipelineError};
use serde_json::json;

/// Output format a command's errors should be reported in.
pub fn error_format(command: &Commands) -> OutputFormat {
    match command {
        Commands::Generate { format, .. } => *format,
        Commands::Config {
            command: ConfigCommands::Show { format },
        } => *format,
        _ => OutputFormat::Text,
    }
}

/// Map errors to a string for CLI output.
///
/// JSON errors carry `error`, `kind`, `stage` and `status` so callers can
/// branch on the failure kind and on which artifact could not be produced.
pub fn map_error(e: &CliError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Error: {}", e),
        OutputFormat::Json => {
            let body = match e {
                CliError::Pipeline(err) => pipeline_error_json(err),
                other => json!({
                    "error": other.to_string(),
                    "kind": "config",
                    "stage": null,
                    "status": null,
                }),
            };
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| e.to_string())
        }
    }
}

fn pipeline_error_json(err: &PipelineError) -> serde_json::Value {
    json!({
        "error": err.to_string(),
        "kind": err.kind().as_str(),
        "stage": err.stage().map(|stage| stage.artifact()),
        "status": err.status_code(),
    })
}
