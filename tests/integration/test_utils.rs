//! Shared test utilities for integration tests
//!
//! Scripted service doubles for the generation and headline boundaries, plus
//! isolated environment setup for configuration tests.

use async_trait::async_trait;
use postgen::config::PostgenConfig;
use postgen::error::{ContextError, ProviderError};
use postgen::news::HeadlineSource;
use postgen::pipeline::{StagedGenerator, Topic};
use postgen::provider::{Generation, GenerationClient, GenerationRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Variables cleared for every isolated test, besides everything prefixed `POSTGEN_`.
const ISOLATED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "NEWSAPI_KEY",
];

const POSTGEN_PREFIX: &str = "POSTGEN_";

/// Names of every `POSTGEN_*` variable currently set.
pub fn postgen_vars() -> Vec<String> {
    std::env::vars_os()
        .filter_map(|(name, _)| name.into_string().ok())
        .filter(|name| name.starts_with(POSTGEN_PREFIX))
        .collect()
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into a fresh temp dir and every
/// postgen-related variable cleared. The original environment is restored afterwards.
pub fn with_isolated_env<F, R>(f: F) -> R
where
    F: FnOnce(&TempDir) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let names: Vec<String> = ISOLATED_VARS
        .iter()
        .map(|name| name.to_string())
        .chain(postgen_vars())
        .collect();
    let saved: Vec<(String, Option<std::ffi::OsString>)> = names
        .into_iter()
        .map(|name| {
            let value = std::env::var_os(&name);
            (name, value)
        })
        .collect();
    for (name, _) in &saved {
        std::env::remove_var(name);
    }

    let temp_dir = TempDir::new().unwrap();
    std::env::set_var("HOME", temp_dir.path().join("home"));
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join("xdg-config"));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&temp_dir)));

    for name in postgen_vars() {
        std::env::remove_var(name);
    }
    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Answers with scripted outcomes in order and records every request.
pub struct ScriptedClient {
    outcomes: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    pub fn new(outcomes: Vec<Result<&str, ProviderError>>) -> Arc<Self> {
        let mut outcomes: Vec<_> = outcomes
            .into_iter()
            .map(|outcome| outcome.map(str::to_string))
            .collect();
        outcomes.reverse();
        Arc::new(Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ProviderError::Transport("unscripted call".to_string())));
        outcome.map(|text| Generation {
            text,
            model: "gpt-4".to_string(),
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "gpt-4"
    }
}

/// Answers every request with the first line of its prompt.
pub struct EchoClient;

#[async_trait]
impl GenerationClient for EchoClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        tokio::task::yield_now().await;
        let first_line = request.prompt.lines().next().unwrap_or_default();
        Ok(Generation {
            text: format!("echo: {}", first_line),
            model: "gpt-4".to_string(),
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "echo"
    }

    fn model_name(&self) -> &str {
        "gpt-4"
    }
}

/// Headline source with a fixed answer and a call counter.
pub struct FixedHeadlines {
    result: Result<Vec<String>, ContextError>,
    calls: AtomicUsize,
}

impl FixedHeadlines {
    pub fn new(headlines: &[&str]) -> Arc<Self> {
        Self::with_result(Ok(headlines.iter().map(|h| h.to_string()).collect()))
    }

    pub fn failing(error: ContextError) -> Arc<Self> {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Vec<String>, ContextError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeadlineSource for FixedHeadlines {
    async fn headlines(&self, _topic: &Topic, _limit: usize) -> Result<Vec<String>, ContextError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn source_name(&self) -> &str {
        "fixed"
    }
}

/// Default configuration with one token per byte, so prompt costs are easy to reason about.
pub fn test_config() -> PostgenConfig {
    let mut config = PostgenConfig::default();
    config.budget.bytes_per_token = Some(1.0);
    config
}

pub fn generator(
    config: &PostgenConfig,
    client: Arc<dyn GenerationClient>,
    source: Arc<dyn HeadlineSource>,
) -> StagedGenerator {
    StagedGenerator::with_services(config, client, source).unwrap()
}
