//! Stages of the generation chain and their prompt templates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the dependent Title -> MetaDescription -> Body chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Title,
    MetaDescription,
    Body,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Title, Stage::MetaDescription, Stage::Body];

    /// Name of the artifact this stage produces, as shown to callers.
    pub fn artifact(&self) -> &'static str {
        match self {
            Stage::Title => "title",
            Stage::MetaDescription => "meta-description",
            Stage::Body => "body",
        }
    }

    /// Configuration key under `[stages]`.
    pub fn config_key(&self) -> &'static str {
        match self {
            Stage::Title => "title",
            Stage::MetaDescription => "meta_description",
            Stage::Body => "body",
        }
    }

    /// Placeholders a template for this stage must contain.
    pub fn required_placeholders(&self) -> &'static [Placeholder] {
        match self {
            Stage::Title => &[Placeholder::Topic],
            Stage::MetaDescription => &[Placeholder::Title],
            Stage::Body => &[Placeholder::Topic, Placeholder::Context],
        }
    }

    /// Placeholders a template for this stage may contain.
    pub fn allowed_placeholders(&self) -> &'static [Placeholder] {
        match self {
            Stage::Title => &[Placeholder::Topic],
            Stage::MetaDescription => &[Placeholder::Topic, Placeholder::Title],
            Stage::Body => &[Placeholder::Topic, Placeholder::Title, Placeholder::Context],
        }
    }

    pub fn default_max_output_tokens(&self) -> u32 {
        match self {
            Stage::Title => 15,
            Stage::MetaDescription => 30,
            Stage::Body => 300,
        }
    }

    pub fn default_prompt(&self) -> &'static str {
        match self {
            Stage::Title => "Come up with a catchy title for a blog post on the topic: {topic}",
            Stage::MetaDescription => {
                "Write a short but informative meta description for a blog post titled: {title}"
            }
            Stage::Body => {
                "Write a detailed and engaging blog post on the topic: {topic}, \
                 taking the following recent news into account:\n{context}\n\n\
                 Use short paragraphs, subheadings, examples and keywords for readability and SEO."
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact())
    }
}

/// Named slots a prompt template can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Topic,
    Title,
    Context,
}

impl Placeholder {
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Topic => "{topic}",
            Placeholder::Title => "{title}",
            Placeholder::Context => "{context}",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "topic" => Some(Placeholder::Topic),
            "title" => Some(Placeholder::Title),
            "context" => Some(Placeholder::Context),
            _ => None,
        }
    }
}

/// Values available when rendering a stage prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptVars<'a> {
    pub topic: &'a str,
    pub title: Option<&'a str>,
    pub context: Option<&'a str>,
}

impl<'a> PromptVars<'a> {
    fn value(&self, placeholder: Placeholder) -> &'a str {
        match placeholder {
            Placeholder::Topic => self.topic,
            Placeholder::Title => self.title.unwrap_or_default(),
            Placeholder::Context => self.context.unwrap_or_default(),
        }
    }
}

/// A stage prompt with `{topic}`, `{title}` and `{context}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Problems that make this template unusable for `stage`.
    pub fn problems(&self, stage: Stage) -> Vec<String> {
        let mut problems = Vec::new();
        if self.text.trim().is_empty() {
            problems.push(format!("stages.{}.prompt: must not be empty", stage.config_key()));
            return problems;
        }
        for placeholder in stage.required_placeholders() {
            if !self.text.contains(placeholder.token()) {
                problems.push(format!(
                    "stages.{}.prompt: must reference {}",
                    stage.config_key(),
                    placeholder.token()
                ));
            }
        }
        for placeholder in [Placeholder::Topic, Placeholder::Title, Placeholder::Context] {
            if self.text.contains(placeholder.token())
                && !stage.allowed_placeholders().contains(&placeholder)
            {
                problems.push(format!(
                    "stages.{}.prompt: {} is not available at this stage",
                    stage.config_key(),
                    placeholder.token()
                ));
            }
        }
        // Context is fitted to a single slot
        if self.text.matches(Placeholder::Context.token()).count() > 1 {
            problems.push(format!(
                "stages.{}.prompt: {} may appear only once",
                stage.config_key(),
                Placeholder::Context.token()
            ));
        }
        problems
    }

    /// Single-pass substitution: values are never re-scanned, so a topic that
    /// happens to contain `{title}` is inserted literally.
    pub fn render(&self, vars: &PromptVars<'_>) -> String {
        let mut out = String::with_capacity(self.text.len() + vars.topic.len());
        let mut rest = self.text.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let slot = tail
                .find('}')
                .and_then(|close| Placeholder::from_name(&tail[1..close]).map(|p| (p, close)));
            match slot {
                Some((placeholder, close)) => {
                    out.push_str(vars.value(placeholder));
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
