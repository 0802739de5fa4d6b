//! Length estimation in the generation model's token unit.
//!
//! No tokenizer is shipped for the supported models, so cost is derived from the
//! UTF-8 byte length with a per-family ratio. Byte length (not char count) keeps
//! the estimate monotone for any two strings and stays conservative for
//! multi-byte scripts, which tokenize worse than ASCII.

use crate::error::EstimationError;
use serde::{Deserialize, Serialize};

/// Model families with a known bytes-per-token ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelFamily {
    /// OpenAI GPT / o-series models
    Gpt,
    /// Anthropic Claude models
    Claude,
    /// Open-weight models usually served by Ollama or a local server
    OpenWeight,
    /// Explicit ratio from configuration
    Custom(f64),
}

const GPT_PREFIXES: &[&str] = &["gpt-", "chatgpt", "o1", "o3", "o4"];
const CLAUDE_PREFIXES: &[&str] = &["claude"];
const OPEN_WEIGHT_PREFIXES: &[&str] = &[
    "llama", "mistral", "mixtral", "qwen", "gemma", "phi", "deepseek", "codellama",
];

impl ModelFamily {
    /// Resolve a family from a model identifier such as `gpt-4`, `openai/gpt-4o`
    /// or `llama3:8b`.
    pub fn resolve(model: &str) -> Result<Self, EstimationError> {
        let normalized = model.trim().to_ascii_lowercase();
        let name = normalized.rsplit('/').next().unwrap_or(normalized.as_str());

        let matches = |prefixes: &[&str]| prefixes.iter().any(|p| name.starts_with(p));
        if name.is_empty() {
            Err(EstimationError::UnknownModel(model.to_string()))
        } else if matches(GPT_PREFIXES) {
            Ok(ModelFamily::Gpt)
        } else if matches(CLAUDE_PREFIXES) {
            Ok(ModelFamily::Claude)
        } else if matches(OPEN_WEIGHT_PREFIXES) {
            Ok(ModelFamily::OpenWeight)
        } else {
            Err(EstimationError::UnknownModel(model.to_string()))
        }
    }

    pub fn bytes_per_token(&self) -> f64 {
        match self {
            ModelFamily::Gpt => 3.5,
            ModelFamily::Claude => 3.2,
            ModelFamily::OpenWeight => 3.0,
            ModelFamily::Custom(ratio) => *ratio,
        }
    }
}

/// Maps text to its estimated token cost. Cheap to clone; holds no state
/// beyond the resolved ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthEstimator {
    family: ModelFamily,
}

impl LengthEstimator {
    /// Build the estimator for the configured model. Meant to run once at startup.
    pub fn for_model(model: &str, bytes_per_token: Option<f64>) -> Result<Self, EstimationError> {
        let family = match bytes_per_token {
            Some(ratio) if ratio.is_finite() && ratio > 0.0 => ModelFamily::Custom(ratio),
            Some(ratio) => return Err(EstimationError::InvalidRatio(ratio)),
            None => ModelFamily::resolve(model)?,
        };
        Ok(Self { family })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Estimated cost of `text`. `estimate("") == 0`.
    pub fn estimate(&self, text: &str) -> usize {
        (text.len() as f64 / self.family.bytes_per_token()).ceil() as usize
    }
}
