//! Generation Service Boundary
//!
//! The pipeline talks to text-generation vendors only through [`GenerationClient`].
//! Each adapter validates the vendor's response once and hands back a typed
//! [`Generation`]; vendor JSON never leaks past this module.

use crate::config::GenerationConfig;
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAICompatibleClient;

/// Supported generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        }
    }

    /// Environment variable consulted when no API key is configured.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }

    /// Highest sampling temperature the provider's API accepts.
    pub fn max_temperature(&self) -> f64 {
        match self {
            ProviderType::Anthropic => 1.0,
            ProviderType::OpenAI | ProviderType::Ollama | ProviderType::LocalCustom => 2.0,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderType::OpenAI | ProviderType::Anthropic)
    }

    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("https://api.openai.com/v1"),
            ProviderType::Anthropic => Some("https://api.anthropic.com/v1"),
            ProviderType::Ollama => Some("http://localhost:11434/v1"),
            ProviderType::LocalCustom => None,
        }
    }
}

/// One generation call: a single candidate is always requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub const CANDIDATES: u32 = 1;

    pub fn new(prompt: impl Into<String>, max_output_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
            temperature,
        }
    }
}

/// Token usage reported by the service, when it reports any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Validated result of one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<String>,
}

/// Generation service client
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate exactly one candidate for the request
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_http_client(request_timeout: Duration) -> Result<Client, ConfigError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))
}

/// Classify a non-success HTTP status from a generation service.
pub fn classify_status(status: u16, body: &str) -> ProviderError {
    let message = if body.trim().is_empty() {
        "no response body".to_string()
    } else {
        body.trim().to_string()
    };
    match status {
        401 | 403 => ProviderError::AuthFailed(message),
        429 => ProviderError::RateLimit(message),
        404 => ProviderError::ModelNotFound(message),
        408 | 504 => ProviderError::Timeout(message),
        _ => ProviderError::RequestFailed { status, message },
    }
}

pub(crate) fn map_http_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(error.to_string())
    } else if let Some(status) = error.status() {
        classify_status(status.as_u16(), &error.to_string())
    } else if error.is_decode() {
        ProviderError::Malformed(error.to_string())
    } else if error.is_connect() {
        ProviderError::Transport(format!("Connection error: {}", error))
    } else {
        ProviderError::Transport(error.to_string())
    }
}

/// Provider factory for creating generation clients from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(config: &GenerationConfig) -> Result<Arc<dyn GenerationClient>, ConfigError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let endpoint = config
            .endpoint
            .clone()
            .or_else(|| config.provider.default_endpoint().map(str::to_string))
            .ok_or_else(|| {
                ConfigError::Invalid(vec![format!(
                    "generation.endpoint: required for provider '{}'",
                    config.provider.as_str()
                )])
            })?;

        let api_key = match (config.provider.requires_api_key(), &config.api_key) {
            (true, None) => {
                return Err(ConfigError::MissingCredential {
                    service: "generation",
                    env_var: config.provider.api_key_env().unwrap_or("POSTGEN_GENERATION__API_KEY"),
                })
            }
            (_, key) => key.clone(),
        };

        match config.provider {
            ProviderType::Anthropic => Ok(Arc::new(AnthropicClient::new(
                config.model.clone(),
                api_key.unwrap_or_default(),
                endpoint,
                timeout,
            )?)),
            ProviderType::OpenAI | ProviderType::Ollama | ProviderType::LocalCustom => {
                Ok(Arc::new(OpenAICompatibleClient::new(
                    config.provider,
                    config.model.clone(),
                    api_key,
                    endpoint,
                    timeout,
                )?))
            }
        }
    }
}
