//! Configuration loading: builds [`PostgenConfig`] from layered sources.

use crate::config::merge::merge_policy;
use crate::config::sources::{environment, global_file, workspace_file};
use crate::config::PostgenConfig;
use crate::error::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Loads configuration from defaults, config files and the environment.
///
/// Precedence, lowest first:
/// 1. built-in defaults
/// 2. global file (`$XDG_CONFIG_HOME/postgen/config.toml`)
/// 3. `<workspace>/postgen.toml`, then `<workspace>/config/{POSTGEN_ENV}.toml`
/// 4. `POSTGEN_<SECTION>__<KEY>` environment variables
///
/// Credentials left unset afterwards fall back to the conventional
/// `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `NEWSAPI_KEY` variables.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(workspace_root: &Path) -> Result<PostgenConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;

        let mut config: PostgenConfig = builder.build()?.try_deserialize()?;
        environment::apply_credential_fallbacks(&mut config, |name| std::env::var(name).ok());

        debug!(
            workspace = %workspace_root.display(),
            provider = config.generation.provider.as_str(),
            model = %config.generation.model,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load from one explicit file, skipping global and workspace discovery.
    pub fn load_from_file(path: &Path) -> Result<PostgenConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?.add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder)?;

        let mut config: PostgenConfig = builder.build()?.try_deserialize()?;
        environment::apply_credential_fallbacks(&mut config, |name| std::env::var(name).ok());

        debug!(config_path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }
}
