//! CLI route: single route table and run context. Dispatches to the pipeline and presentation.

use crate::budget::{BudgetAllocator, LengthEstimator};
use crate::cli::parse::{Commands, ConfigCommands, OutputFormat};
use crate::cli::presentation::{
    format_config_json, format_config_text, format_estimate_text, format_generation_json,
    format_generation_text, format_validation_ok, EstimateReport,
};
use crate::config::{ConfigLoader, PostgenConfig};
use crate::error::CliError;
use crate::news::NewsApiSource;
use crate::pipeline::StagedGenerator;
use crate::provider::ProviderFactory;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime context for CLI execution: workspace, config path and the loaded configuration.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config_path: Option<PathBuf>,
    config: PostgenConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config_path, config))
    }

    pub fn with_config(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        config: PostgenConfig,
    ) -> Self {
        Self {
            workspace_root,
            config_path,
            config,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &PostgenConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, CliError> {
        match command {
            Commands::Generate { topic, format } => self.handle_generate(topic, *format).await,
            Commands::Config { command } => match command {
                ConfigCommands::Show { format } => match format {
                    OutputFormat::Text => format_config_text(&self.config),
                    OutputFormat::Json => format_config_json(&self.config),
                },
                ConfigCommands::Validate => self.handle_validate(),
            },
            Commands::Estimate { text, model } => self.handle_estimate(text, model.as_deref()),
        }
    }

    async fn handle_generate(&self, topic: &str, format: OutputFormat) -> Result<String, CliError> {
        let generator = StagedGenerator::from_config(&self.config)?;
        let result = generator.generate(topic).await?;
        match format {
            OutputFormat::Text => Ok(format_generation_text(&result)),
            OutputFormat::Json => format_generation_json(&result),
        }
    }

    /// Full startup check: settings plus credentials and client construction.
    fn handle_validate(&self) -> Result<String, CliError> {
        self.config.validate()?;
        ProviderFactory::create_client(&self.config.generation)?;
        NewsApiSource::from_config(&self.config.news)?;
        info!(
            config_path = ?self.config_path,
            workspace = %self.workspace_root.display(),
            "Configuration validated"
        );
        Ok(format_validation_ok(&self.config))
    }

    fn handle_estimate(&self, text: &str, model: Option<&str>) -> Result<String, CliError> {
        let model = model.unwrap_or(&self.config.generation.model);
        let estimator = LengthEstimator::for_model(model, self.config.budget.bytes_per_token)?;
        let allocator = BudgetAllocator::new(self.config.budget()?, estimator);
        let report = EstimateReport {
            model: model.to_string(),
            family: estimator.family(),
            bytes_per_token: estimator.family().bytes_per_token(),
            bytes: text.len(),
            tokens: estimator.estimate(text),
            remaining_input: allocator.budget().remaining_input(),
        };
        Ok(format_estimate_text(&report))
    }
}
