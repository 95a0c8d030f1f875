//! OpenAI-compatible chat-completion client.

use async_trait::async_trait;
use promql_core::{with_cancellation, CancellationToken, LlmConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{AdapterError, AdapterResult};

/// Single-turn text completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends `prompt` as one user message and returns the reply text.
    async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> AdapterResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for `/chat/completions`
pub struct ChatCompletionClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    client: Client,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> AdapterResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(organization) = &config.organization {
            headers.insert(
                HeaderName::from_static("openai-organization"),
                header_value(organization)?,
            );
        }
        for header in &config.custom_headers {
            let name = HeaderName::from_bytes(header.key.as_bytes())
                .map_err(|e| AdapterError::Configuration(format!("header {}: {}", header.key, e)))?;
            headers.insert(name, header_value(&header.value)?);
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| AdapterError::Configuration(format!("proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| AdapterError::Configuration(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            client,
        })
    }

    async fn send_request(&self, prompt: &str) -> AdapterResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        debug!("Sending completion request to {}", self.endpoint);
        let mut req_builder = self.client.post(&self.endpoint).json(&request);
        if !self.api_key.is_empty() {
            req_builder = req_builder.bearer_auth(&self.api_key);
        }

        let response = req_builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::RequestFailed(format!(
                "Request failed with status {}: {}",
                status, body
            )));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::SerializationError(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AdapterError::InvalidResponse("completion has no choices".to_string()))
    }
}

fn header_value(value: &str) -> AdapterResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AdapterError::Configuration(e.to_string()))
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    #[instrument(skip(self, prompt, cancel), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> AdapterResult<String> {
        let content = with_cancellation(cancel, self.send_request(prompt)).await?;
        debug!(response = %content, "Completion received");
        Ok(content)
    }
}
