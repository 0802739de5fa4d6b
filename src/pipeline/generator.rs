//! Staged generator: Init -> TitleGenerated -> MetaGenerated -> Done.
//!
//! Every stage renders its prompt, passes the budget gate, makes exactly one
//! generation call and trims the answer. Any failure ends the run with a
//! [`PipelineError`] naming the stage; outputs of earlier stages are dropped.

use crate::budget::BudgetAllocator;
use crate::config::PostgenConfig;
use crate::error::{ConfigError, PipelineError, ProviderError};
use crate::news::{Context, ContextFetcher, HeadlineSource, NewsApiSource};
use crate::pipeline::stage::{PromptTemplate, PromptVars, Stage};
use crate::pipeline::{GenerationResult, Topic};
use crate::provider::{GenerationClient, GenerationRequest, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

/// Fixed per-stage parameters
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub max_output_tokens: u32,
    pub template: PromptTemplate,
}

enum RunState {
    Init,
    TitleGenerated {
        title: String,
    },
    MetaGenerated {
        title: String,
        meta_description: String,
    },
    Done(GenerationResult),
}

/// Runs the three dependent generation stages for one topic at a time.
pub struct StagedGenerator {
    client: Arc<dyn GenerationClient>,
    fetcher: ContextFetcher,
    allocator: BudgetAllocator,
    title: StageSettings,
    meta_description: StageSettings,
    body: StageSettings,
    temperature: f32,
    call_timeout: Duration,
}

impl StagedGenerator {
    /// Build the generator and its service adapters from validated configuration.
    pub fn from_config(config: &PostgenConfig) -> Result<Self, ConfigError> {
        let client = ProviderFactory::create_client(&config.generation)?;
        let source: Arc<dyn HeadlineSource> = Arc::new(NewsApiSource::from_config(&config.news)?);
        Self::with_services(config, client, source)
    }

    /// Build the generator around already constructed service clients.
    pub fn with_services(
        config: &PostgenConfig,
        client: Arc<dyn GenerationClient>,
        source: Arc<dyn HeadlineSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let allocator = BudgetAllocator::new(config.budget()?, config.estimator()?);
        let settings = |stage: Stage| {
            let stage_config = config.stages.get(stage);
            StageSettings {
                max_output_tokens: stage_config.max_output_tokens,
                template: PromptTemplate::new(stage_config.prompt.clone()),
            }
        };

        Ok(Self {
            client,
            fetcher: ContextFetcher::from_config(source, &config.news),
            allocator,
            title: settings(Stage::Title),
            meta_description: settings(Stage::MetaDescription),
            body: settings(Stage::Body),
            temperature: config.generation.temperature as f32,
            call_timeout: Duration::from_secs(config.generation.request_timeout_secs),
        })
    }

    pub fn allocator(&self) -> &BudgetAllocator {
        &self.allocator
    }

    pub fn settings(&self, stage: Stage) -> &StageSettings {
        match stage {
            Stage::Title => &self.title,
            Stage::MetaDescription => &self.meta_description,
            Stage::Body => &self.body,
        }
    }

    /// Run the full pipeline for `topic`.
    ///
    /// Dropping the returned future cancels the run: no further stage is
    /// started and the result of an in-flight call is discarded.
    pub async fn generate(&self, topic: &str) -> Result<GenerationResult, PipelineError> {
        let topic = Topic::new(topic)?;
        let span = info_span!(
            "generate",
            topic = %topic,
            provider = self.client.provider_name(),
            model = self.client.model_name()
        );
        self.run(topic).instrument(span).await
    }

    async fn run(&self, topic: Topic) -> Result<GenerationResult, PipelineError> {
        let started = Instant::now();
        info!(
            remaining_input = self.allocator.budget().remaining_input(),
            "Run started"
        );

        let context = match self.fetcher.fetch(&topic).await {
            Ok(context) => context,
            Err(err) => {
                warn!(error = %err, "Context fetch failed");
                return Err(err.into());
            }
        };
        info!(
            headlines = context.headline_count(),
            placeholder = context.is_placeholder(),
            "Context fetched"
        );

        let mut state = RunState::Init;
        loop {
            state = match state {
                RunState::Init => {
                    let prompt = self.title.template.render(&PromptVars {
                        topic: topic.as_str(),
                        ..Default::default()
                    });
                    let title = self.run_stage(Stage::Title, prompt).await?;
                    RunState::TitleGenerated { title }
                }
                RunState::TitleGenerated { title } => {
                    let prompt = self.meta_description.template.render(&PromptVars {
                        topic: topic.as_str(),
                        title: Some(&title),
                        context: None,
                    });
                    let meta_description = self.run_stage(Stage::MetaDescription, prompt).await?;
                    RunState::MetaGenerated {
                        title,
                        meta_description,
                    }
                }
                RunState::MetaGenerated {
                    title,
                    meta_description,
                } => {
                    let prompt = self.body_prompt(&topic, &title, &context);
                    let post_content = self.run_stage(Stage::Body, prompt).await?;
                    RunState::Done(GenerationResult {
                        title,
                        meta_description,
                        post_content,
                    })
                }
                RunState::Done(result) => {
                    info!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Run completed"
                    );
                    return Ok(result);
                }
            };
        }
    }

    /// Body prompt with the context cut to whatever the rest of the prompt leaves over.
    fn body_prompt(&self, topic: &Topic, title: &str, context: &Context) -> String {
        let vars = PromptVars {
            topic: topic.as_str(),
            title: Some(title),
            context: Some(""),
        };
        let wrapper = self.body.template.render(&vars);
        let fitted = self.allocator.fit_context(context.as_str(), &wrapper);
        if fitted.len() < context.as_str().len() {
            warn!(
                original_bytes = context.as_str().len(),
                kept_bytes = fitted.len(),
                limit = self.allocator.context_limit(&wrapper),
                "Context truncated to fit the input budget"
            );
        }
        self.body.template.render(&PromptVars {
            context: Some(fitted),
            ..vars
        })
    }

    async fn run_stage(&self, stage: Stage, prompt: String) -> Result<String, PipelineError> {
        let started = Instant::now();
        info!(stage = %stage, "Stage started");
        let outcome = self.attempt_stage(stage, prompt).await;
        match &outcome {
            Ok(text) => info!(
                stage = %stage,
                chars = text.chars().count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Stage completed"
            ),
            Err(err) => warn!(
                stage = %stage,
                kind = err.kind().as_str(),
                error = %err,
                "Stage failed"
            ),
        }
        outcome
    }

    async fn attempt_stage(&self, stage: Stage, prompt: String) -> Result<String, PipelineError> {
        let settings = self.settings(stage);
        let admission = self.allocator.check(&prompt, stage)?;
        debug!(
            stage = %stage,
            cost = admission.cost,
            limit = self.allocator.budget().remaining_input(),
            max_output_tokens = settings.max_output_tokens,
            "Prompt admitted"
        );

        let request = GenerationRequest::new(prompt, settings.max_output_tokens, self.temperature);
        let generation =
            match tokio::time::timeout(self.call_timeout, self.client.generate(&request)).await {
                Ok(outcome) => {
                    outcome.map_err(|source| PipelineError::GenerationService { stage, source })?
                }
                Err(_) => {
                    return Err(PipelineError::GenerationService {
                        stage,
                        source: ProviderError::Timeout(format!(
                            "no response within {}s",
                            self.call_timeout.as_secs()
                        )),
                    })
                }
            };

        let text = generation.text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyOutput { stage });
        }
        Ok(text.to_string())
    }
}
