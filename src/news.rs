//! Grounding context from recent news headlines.
//!
//! A [`HeadlineSource`] is the external boundary (topic in, ordered headlines
//! out). [`ContextFetcher`] turns that list into the run's [`Context`]: an empty
//! list is a valid outcome and becomes the configured placeholder, while a
//! transport or service failure is fatal for the run.

use crate::config::NewsConfig;
use crate::error::{ConfigError, ContextError};
use crate::pipeline::Topic;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Title NewsAPI substitutes for articles that were taken down.
const REMOVED_MARKER: &str = "[Removed]";

/// Headline service boundary
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Ordered headlines for `topic`, most relevant first; possibly empty.
    async fn headlines(&self, topic: &Topic, limit: usize) -> Result<Vec<String>, ContextError>;

    fn source_name(&self) -> &str;
}

/// Grounding text for the Body stage. Owned by a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    text: String,
    headline_count: usize,
}

impl Context {
    pub fn from_headlines(headlines: &[String]) -> Self {
        Self {
            text: headlines.join("\n"),
            headline_count: headlines.len(),
        }
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            headline_count: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn headline_count(&self) -> usize {
        self.headline_count
    }

    pub fn is_placeholder(&self) -> bool {
        self.headline_count == 0
    }
}

/// Fetches exactly one context per call, bounded by a timeout.
pub struct ContextFetcher {
    source: Arc<dyn HeadlineSource>,
    max_headlines: usize,
    placeholder: String,
    timeout: Duration,
}

impl ContextFetcher {
    pub fn new(
        source: Arc<dyn HeadlineSource>,
        max_headlines: usize,
        placeholder: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            max_headlines: max_headlines.max(1),
            placeholder: placeholder.into(),
            timeout,
        }
    }

    pub fn from_config(source: Arc<dyn HeadlineSource>, config: &NewsConfig) -> Self {
        Self::new(
            source,
            config.max_headlines,
            config.placeholder.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub async fn fetch(&self, topic: &Topic) -> Result<Context, ContextError> {
        let fetched = tokio::time::timeout(
            self.timeout,
            self.source.headlines(topic, self.max_headlines),
        )
        .await
        .map_err(|_| {
            ContextError::Timeout(format!("no response within {}s", self.timeout.as_secs()))
        })??;

        let headlines: Vec<String> = fetched
            .into_iter()
            .map(|headline| headline.trim().to_string())
            .filter(|headline| !headline.is_empty() && headline != REMOVED_MARKER)
            .take(self.max_headlines)
            .collect();

        if headlines.is_empty() {
            warn!(
                source = self.source.source_name(),
                "No headlines found, using placeholder context"
            );
            return Ok(Context::placeholder(self.placeholder.clone()));
        }

        debug!(
            source = self.source.source_name(),
            headlines = headlines.len(),
            "Headlines fetched"
        );
        Ok(Context::from_headlines(&headlines))
    }
}

#[derive(Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    title: Option<String>,
}

#[derive(Deserialize)]
struct NewsApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Extract article titles from a NewsAPI `/v2/everything` body, in order.
pub fn parse_headlines(body: &str) -> Result<Vec<String>, ContextError> {
    let response: EverythingResponse =
        serde_json::from_str(body).map_err(|e| ContextError::Decode(e.to_string()))?;
    Ok(response
        .articles
        .into_iter()
        .filter_map(|article| article.title)
        .collect())
}

fn status_error(status: u16, body: &str) -> ContextError {
    let message = serde_json::from_str::<NewsApiErrorBody>(body)
        .ok()
        .and_then(|err| match (err.code, err.message) {
            (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
            (None, Some(message)) => Some(message),
            (Some(code), None) => Some(code),
            (None, None) => None,
        })
        .unwrap_or_else(|| body.trim().to_string());
    ContextError::Status { status, message }
}

fn map_http_error(error: reqwest::Error) -> ContextError {
    if error.is_timeout() {
        ContextError::Timeout(error.to_string())
    } else {
        ContextError::Transport(error.to_string())
    }
}

/// Page size to request for `limit` headlines. A few extra so removed
/// articles do not starve the result; NewsAPI caps pages at 100.
fn page_size(limit: usize) -> usize {
    limit.saturating_add(4).min(100)
}

/// NewsAPI client (`https://newsapi.org/v2/everything`)
pub struct NewsApiSource {
    client: Client,
    endpoint: String,
    api_key: String,
    language: Option<String>,
}

impl NewsApiSource {
    pub fn new(
        endpoint: String,
        api_key: String,
        language: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            language,
        })
    }

    pub fn from_config(config: &NewsConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigError::MissingCredential {
                service: "news",
                env_var: "NEWSAPI_KEY",
            })?;
        Self::new(
            config.endpoint.clone(),
            api_key,
            config.language.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl HeadlineSource for NewsApiSource {
    async fn headlines(&self, topic: &Topic, limit: usize) -> Result<Vec<String>, ContextError> {
        let page_size = page_size(limit).to_string();
        let mut query = vec![("q", topic.as_str()), ("pageSize", page_size.as_str())];
        if let Some(language) = &self.language {
            query.push(("language", language.as_str()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_http_error)?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        parse_headlines(&body)
    }

    fn source_name(&self) -> &str {
        "newsapi"
    }
}
