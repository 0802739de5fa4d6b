//! Merge rules: defaults, override order, conflict handling.
//!
//! Defaults are registered on the builder so that a file overriding a single
//! key of a table (e.g. only `stages.body.max_output_tokens`) keeps the rest.

use crate::config::{
    DEFAULT_MAX_HEADLINES, DEFAULT_MODEL, DEFAULT_NEWS_ENDPOINT, DEFAULT_NEWS_TIMEOUT_SECS,
    DEFAULT_PLACEHOLDER, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE, DEFAULT_TOTAL_CEILING,
};
use crate::pipeline::Stage;
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = Config::builder()
        .set_default("generation.provider", "openai")?
        .set_default("generation.model", DEFAULT_MODEL)?
        .set_default("generation.temperature", DEFAULT_TEMPERATURE)?
        .set_default(
            "generation.request_timeout_secs",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?
        .set_default("budget.total_ceiling", DEFAULT_TOTAL_CEILING as u64)?
        .set_default("news.endpoint", DEFAULT_NEWS_ENDPOINT)?
        .set_default("news.max_headlines", DEFAULT_MAX_HEADLINES as u64)?
        .set_default("news.timeout_secs", DEFAULT_NEWS_TIMEOUT_SECS)?
        .set_default("news.placeholder", DEFAULT_PLACEHOLDER)?;

    for stage in Stage::ALL {
        builder = builder
            .set_default(
                format!("stages.{}.max_output_tokens", stage.config_key()),
                u64::from(stage.default_max_output_tokens()),
            )?
            .set_default(
                format!("stages.{}.prompt", stage.config_key()),
                stage.default_prompt(),
            )?;
    }
    Ok(builder)
}
