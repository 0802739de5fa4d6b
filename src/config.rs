//! Configuration System
//!
//! Layered configuration read once at startup: merge-policy defaults, the global
//! config file, workspace files, `POSTGEN_*` environment variables and finally the
//! conventional credential variables. The resulting [`PostgenConfig`] is passed by
//! reference into the pipeline; nothing reads ambient process state afterwards.

use crate::budget::{Budget, LengthEstimator};
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use crate::pipeline::{PromptTemplate, Stage};
use crate::provider::ProviderType;
use serde::{Deserialize, Serialize};

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;
pub use sources::environment::apply_credential_fallbacks;
pub use sources::global_file::global_config_path;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TOTAL_CEILING: usize = 8192;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_NEWS_ENDPOINT: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_NEWS_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_HEADLINES: usize = 1;
/// NewsAPI's largest page size
pub const MAX_HEADLINES_LIMIT: usize = 100;
pub const DEFAULT_PLACEHOLDER: &str = "No recent news found.";

const REDACTED: &str = "***";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgenConfig {
    /// Generation service settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Token budget
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Per-stage output caps and prompt templates
    #[serde(default)]
    pub stages: StagesConfig,

    /// Headline service settings
    #[serde(default)]
    pub news: NewsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to the provider's conventional environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL; required for `local`, optional otherwise
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> ProviderType {
    ProviderType::OpenAI
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            endpoint: None,
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Token budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Context window of the model, input and output together
    #[serde(default = "default_total_ceiling")]
    pub total_ceiling: usize,

    /// Output allowance; defaults to the largest stage cap
    #[serde(default)]
    pub reserved_output: Option<usize>,

    /// Overrides the model family ratio; required for unrecognized models
    #[serde(default)]
    pub bytes_per_token: Option<f64>,
}

fn default_total_ceiling() -> usize {
    DEFAULT_TOTAL_CEILING
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_ceiling: default_total_ceiling(),
            reserved_output: None,
            bytes_per_token: None,
        }
    }
}

/// One stage's fixed parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub max_output_tokens: u32,
    pub prompt: String,
}

impl StageConfig {
    pub fn default_for(stage: Stage) -> Self {
        Self {
            max_output_tokens: stage.default_max_output_tokens(),
            prompt: stage.default_prompt().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "default_title_stage")]
    pub title: StageConfig,

    #[serde(default = "default_meta_stage")]
    pub meta_description: StageConfig,

    #[serde(default = "default_body_stage")]
    pub body: StageConfig,
}

fn default_title_stage() -> StageConfig {
    StageConfig::default_for(Stage::Title)
}

fn default_meta_stage() -> StageConfig {
    StageConfig::default_for(Stage::MetaDescription)
}

fn default_body_stage() -> StageConfig {
    StageConfig::default_for(Stage::Body)
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            title: default_title_stage(),
            meta_description: default_meta_stage(),
            body: default_body_stage(),
        }
    }
}

impl StagesConfig {
    pub fn get(&self, stage: Stage) -> &StageConfig {
        match stage {
            Stage::Title => &self.title,
            Stage::MetaDescription => &self.meta_description,
            Stage::Body => &self.body,
        }
    }
}

/// Headline service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,

    /// Falls back to NEWSAPI_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_max_headlines")]
    pub max_headlines: usize,

    #[serde(default = "default_news_timeout_secs")]
    pub timeout_secs: u64,

    /// Context used when the topic has no headlines
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Optional NewsAPI language filter (e.g. "en", "ru")
    #[serde(default)]
    pub language: Option<String>,
}

fn default_news_endpoint() -> String {
    DEFAULT_NEWS_ENDPOINT.to_string()
}

fn default_max_headlines() -> usize {
    DEFAULT_MAX_HEADLINES
}

fn default_news_timeout_secs() -> u64 {
    DEFAULT_NEWS_TIMEOUT_SECS
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_news_endpoint(),
            api_key: None,
            max_headlines: default_max_headlines(),
            timeout_secs: default_news_timeout_secs(),
            placeholder: default_placeholder(),
            language: None,
        }
    }
}

impl PostgenConfig {
    /// Output allowance: configured, or the largest stage cap.
    pub fn reserved_output(&self) -> usize {
        self.budget.reserved_output.unwrap_or_else(|| {
            Stage::ALL
                .iter()
                .map(|stage| self.stages.get(*stage).max_output_tokens as usize)
                .max()
                .unwrap_or_default()
        })
    }

    pub fn budget(&self) -> Result<Budget, ConfigError> {
        Budget::new(self.budget.total_ceiling, self.reserved_output())
    }

    pub fn estimator(&self) -> Result<LengthEstimator, ConfigError> {
        Ok(LengthEstimator::for_model(
            &self.generation.model,
            self.budget.bytes_per_token,
        )?)
    }

    /// Validate everything except credentials, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.generation.model.trim().is_empty() {
            problems.push("generation.model: must not be empty".to_string());
        }
        let max_temperature = self.generation.provider.max_temperature();
        if !(0.0..=max_temperature).contains(&self.generation.temperature) {
            problems.push(format!(
                "generation.temperature: {} is outside 0.0..={} for provider '{}'",
                self.generation.temperature,
                max_temperature,
                self.generation.provider.as_str()
            ));
        }
        if self.generation.request_timeout_secs == 0 {
            problems.push("generation.request_timeout_secs: must be positive".to_string());
        }
        if let Err(err) = self.estimator() {
            problems.push(format!("budget: {}", err));
        }

        let reserved = self.reserved_output();
        if self.budget.total_ceiling <= reserved {
            problems.push(format!(
                "budget.total_ceiling: {} leaves no input room after reserving {} output tokens",
                self.budget.total_ceiling, reserved
            ));
        }

        for stage in Stage::ALL {
            let stage_config = self.stages.get(stage);
            if stage_config.max_output_tokens == 0 {
                problems.push(format!(
                    "stages.{}.max_output_tokens: must be positive",
                    stage.config_key()
                ));
            } else if stage_config.max_output_tokens as usize > reserved {
                problems.push(format!(
                    "stages.{}.max_output_tokens: {} exceeds budget.reserved_output ({})",
                    stage.config_key(),
                    stage_config.max_output_tokens,
                    reserved
                ));
            }
            problems.extend(PromptTemplate::new(stage_config.prompt.as_str()).problems(stage));
        }

        if self.news.endpoint.trim().is_empty() {
            problems.push("news.endpoint: must not be empty".to_string());
        }
        if !(1..=MAX_HEADLINES_LIMIT).contains(&self.news.max_headlines) {
            problems.push(format!(
                "news.max_headlines: {} is outside 1..={}",
                self.news.max_headlines, MAX_HEADLINES_LIMIT
            ));
        }
        if self.news.timeout_secs == 0 {
            problems.push("news.timeout_secs: must be positive".to_string());
        }
        if self.news.placeholder.trim().is_empty() {
            problems.push("news.placeholder: must not be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Copy safe to print: credentials are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.generation.api_key.is_some() {
            copy.generation.api_key = Some(REDACTED.to_string());
        }
        if copy.news.api_key.is_some() {
            copy.news.api_key = Some(REDACTED.to_string());
        }
        copy
    }
}
