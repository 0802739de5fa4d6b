//! Error types for the postgen generation pipeline.
//!
//! Startup problems are [`ConfigError`]s and keep the process from running.
//! Everything that can go wrong inside a single run is a [`PipelineError`],
//! which always names the artifact that could not be produced.

use crate::pipeline::Stage;
use thiserror::Error;

/// Startup-time configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("Missing {service} credential: set {env_var} or configure it in postgen.toml")]
    MissingCredential {
        service: &'static str,
        env_var: &'static str,
    },

    #[error("Estimator setup failed: {0}")]
    Estimation(#[from] EstimationError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Length estimator errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("Unrecognized model identifier '{0}' (set budget.bytes_per_token to estimate it)")]
    UnknownModel(String),

    #[error("Invalid bytes_per_token override: {0} (must be a positive number)")]
    InvalidRatio(f64),
}

/// Generation service failures, already classified at the adapter boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("HTTP error: {0}")]
    Transport(String),
}

/// Context (news headline) service failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Network error while fetching headlines: {0}")]
    Transport(String),

    #[error("Headline request timed out: {0}")]
    Timeout(String),

    #[error("Headline service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode headline response: {0}")]
    Decode(String),
}

/// Failure kind of a pipeline run, used by callers to branch without matching on payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidTopic,
    Budget,
    Context,
    Service,
    EmptyOutput,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidTopic => "invalid_topic",
            FailureKind::Budget => "budget",
            FailureKind::Context => "context",
            FailureKind::Service => "service",
            FailureKind::EmptyOutput => "empty_output",
        }
    }
}

/// Terminal error of a single pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Topic must not be empty")]
    InvalidTopic,

    #[error("Could not produce the {stage}: prompt needs {cost} tokens but only {limit} are available for input")]
    BudgetExceeded {
        stage: Stage,
        cost: usize,
        limit: usize,
    },

    #[error("Could not fetch grounding context: {0}")]
    ContextFetch(#[from] ContextError),

    #[error("Could not produce the {stage}: {source}")]
    GenerationService {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("Could not produce the {stage}: generation service returned empty text")]
    EmptyOutput { stage: Stage },
}

impl PipelineError {
    /// Stage that failed, if the failure happened inside a generation stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::BudgetExceeded { stage, .. }
            | PipelineError::GenerationService { stage, .. }
            | PipelineError::EmptyOutput { stage } => Some(*stage),
            PipelineError::InvalidTopic | PipelineError::ContextFetch(_) => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::InvalidTopic => FailureKind::InvalidTopic,
            PipelineError::BudgetExceeded { .. } => FailureKind::Budget,
            PipelineError::ContextFetch(_) => FailureKind::Context,
            PipelineError::GenerationService { .. } => FailureKind::Service,
            PipelineError::EmptyOutput { .. } => FailureKind::EmptyOutput,
        }
    }

    /// HTTP status a request-facing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            FailureKind::InvalidTopic => 400,
            FailureKind::Budget => 422,
            FailureKind::Context | FailureKind::Service | FailureKind::EmptyOutput => 502,
        }
    }
}

/// Errors surfaced by the command-line front end
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Estimation(#[from] EstimationError),

    #[error("Failed to render output: {0}")]
    Render(String),
}
