//! OpenAI-compatible chat completions adapter (OpenAI, Ollama `/v1`, custom local servers).

use super::{
    build_http_client, classify_status, map_http_error, Generation, GenerationClient,
    GenerationRequest, ProviderType, TokenUsage,
};
use crate::error::{ConfigError, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    n: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub(crate) fn build_request<'a>(
    model: &'a str,
    request: &'a GenerationRequest,
) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: [ChatMessage {
            role: "user",
            content: &request.prompt,
        }],
        max_tokens: request.max_output_tokens,
        n: GenerationRequest::CANDIDATES,
        temperature: request.temperature,
        stream: false,
    }
}

/// Validate a chat completions body into a [`Generation`].
pub fn parse_response(body: &str, requested_model: &str) -> Result<Generation, ProviderError> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("Failed to parse response: {}", e)))?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("No choices in response".to_string()))?;

    let text = choice
        .message
        .and_then(|message| message.content)
        .ok_or_else(|| ProviderError::Malformed("Choice has no message content".to_string()))?;

    Ok(Generation {
        text,
        model: completion
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        usage: completion.usage.map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }),
        finish_reason: choice.finish_reason,
    })
}

/// Client for any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAICompatibleClient {
    client: Client,
    provider: ProviderType,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAICompatibleClient {
    pub fn new(
        provider: ProviderType,
        model: String,
        api_key: Option<String>,
        base_url: String,
        request_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_http_client(request_timeout)?,
            provider,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GenerationClient for OpenAICompatibleClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .json(&build_request(&self.model, request));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(map_http_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_http_error)?;
        debug!(
            provider = self.provider.as_str(),
            status = status.as_u16(),
            bytes = body.len(),
            "Chat completion response received"
        );

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }
        parse_response(&body, &self.model)
    }

    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
