//! Staged Generation Pipeline
//!
//! One run turns a topic into a title, a meta-description and a body through three
//! dependent generation stages, grounded in a single context fetch. Runs share
//! nothing mutable; the generator can be used from many tasks at once.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod generator;
pub mod stage;

pub use generator::{StageSettings, StagedGenerator};
pub use stage::{Placeholder, PromptTemplate, PromptVars, Stage};

/// Caller-supplied subject of one run. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: &str) -> Result<Self, PipelineError> {
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidTopic);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of a fully successful run. There is no partial variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub title: String,
    pub meta_description: String,
    pub post_content: String,
}
