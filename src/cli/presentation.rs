//! CLI presentation: text and json formatters per command.

use crate::budget::ModelFamily;
use crate::config::PostgenConfig;
use crate::error::CliError;
use crate::pipeline::GenerationResult;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Result of `postgen estimate`.
#[derive(Debug, Clone, Serialize)]
pub struct EstimateReport {
    pub model: String,
    pub family: ModelFamily,
    pub bytes_per_token: f64,
    pub bytes: usize,
    pub tokens: usize,
    pub remaining_input: usize,
}

impl EstimateReport {
    pub fn fits(&self) -> bool {
        self.tokens <= self.remaining_input
    }
}

fn heading(label: &str) -> String {
    format!("{}", label.bold().underline())
}

pub fn format_generation_text(result: &GenerationResult) -> String {
    format!(
        "{}\n{}\n\n{}\n{}\n\n{}\n{}",
        heading("Title"),
        result.title,
        heading("Meta description"),
        result.meta_description,
        heading("Post"),
        result.post_content
    )
}

pub fn format_generation_json(result: &GenerationResult) -> Result<String, CliError> {
    serde_json::to_string_pretty(result).map_err(|e| CliError::Render(e.to_string()))
}

pub fn format_config_text(config: &PostgenConfig) -> Result<String, CliError> {
    toml::to_string_pretty(&config.redacted()).map_err(|e| CliError::Render(e.to_string()))
}

pub fn format_config_json(config: &PostgenConfig) -> Result<String, CliError> {
    serde_json::to_string_pretty(&config.redacted()).map_err(|e| CliError::Render(e.to_string()))
}

pub fn format_validation_ok(config: &PostgenConfig) -> String {
    format!(
        "{} Configuration is valid (provider: {}, model: {}, input budget: {} tokens)",
        "✓".green(),
        config.generation.provider.as_str(),
        config.generation.model,
        config
            .budget
            .total_ceiling
            .saturating_sub(config.reserved_output())
    )
}

pub fn format_estimate_text(report: &EstimateReport) -> String {
    let verdict = if report.fits() {
        format!("{}", "fits".green())
    } else {
        format!("{}", "exceeds input budget".red())
    };
    format!(
        "Model: {} ({:?}, {} bytes/token)\nBytes: {}\nEstimated tokens: {}\nInput budget: {} tokens ({})",
        report.model,
        report.family,
        report.bytes_per_token,
        report.bytes,
        report.tokens,
        report.remaining_input,
        verdict
    )
}
