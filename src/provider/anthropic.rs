//! Anthropic messages API adapter.

use super::{
    build_http_client, classify_status, map_http_error, Generation, GenerationClient,
    GenerationRequest, TokenUsage,
};
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: Option<String>,
    usage: Option<MessagesUsage>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

pub(crate) fn build_request(model: &str, request: &GenerationRequest) -> Value {
    json!({
        "model": model,
        "max_tokens": request.max_output_tokens,
        "temperature": request.temperature,
        "messages": [{"role": "user", "content": request.prompt}],
    })
}

/// Validate a messages API body into a [`Generation`]. Text blocks are concatenated.
pub fn parse_response(body: &str, requested_model: &str) -> Result<Generation, ProviderError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("Failed to parse response: {}", e)))?;

    let texts: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if texts.is_empty() {
        return Err(ProviderError::Malformed(
            "No text content in response".to_string(),
        ));
    }

    Ok(Generation {
        text: texts.concat(),
        model: response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        usage: response.usage.map(|usage| TokenUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
        }),
        finish_reason: response.stop_reason,
    })
}

/// Anthropic provider client
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        model: String,
        api_key: String,
        base_url: String,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_http_client(request_timeout)?,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&build_request(&self.model, request))
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_http_error)?;
        debug!(
            provider = "anthropic",
            status = status.as_u16(),
            bytes = body.len(),
            "Messages response received"
        );

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }
        parse_response(&body, &self.model)
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
