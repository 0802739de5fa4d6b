//! Environment sources: `POSTGEN_<SECTION>__<KEY>` overrides and credential fallbacks.

use crate::config::PostgenConfig;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add `POSTGEN_*` variables, e.g. `POSTGEN_GENERATION__MODEL=gpt-4o`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("POSTGEN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    ))
}

/// Fill missing credentials from the conventional variables
/// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `NEWSAPI_KEY`).
pub fn apply_credential_fallbacks<F>(config: &mut PostgenConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    if config.generation.api_key.is_none() {
        if let Some(var) = config.generation.provider.api_key_env() {
            config.generation.api_key = present(lookup(var));
        }
    }
    if config.news.api_key.is_none() {
        config.news.api_key = present(lookup("NEWSAPI_KEY"));
    }
}
