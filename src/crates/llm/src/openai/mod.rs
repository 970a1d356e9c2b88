//! OpenAI and Azure OpenAI chat-completions client
//!
//! ```rust,ignore
//! use llm::{OpenAiClient, OpenAiConfig};
//! use parley_core::llm::{ChatModel, ChatRequest};
//! use parley_core::messages::Message;
//!
//! let client = OpenAiClient::new(OpenAiConfig::from_env("gpt-4o")?)?;
//! let response = client
//!     .chat(ChatRequest::new(vec![Message::human("hola")]))
//!     .await?;
//! ```

mod stream;
mod wire;

use crate::config::OpenAiConfig;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use parley_core::error::{GraphError, Result as GraphResult};
use parley_core::llm::{ChatModel, ChatRequest, ChatResponse, ChatStream, StreamChunk};
use reqwest::{Client, Response};
use stream::{SseEvent, SseLines, StreamAccumulator};
use tooling::async_utils::{with_retry_if, RetryPolicy};
use tooling::logging::timed;
use wire::{build_request, from_completion, CompletionRequest, CompletionResponse, StreamOptions};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("failed to build HTTP client: {}", e)))?;
        let retry = RetryPolicy::new(config.max_retries as usize + 1);
        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Replace the retry policy derived from `max_retries`
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn completion_request(&self, request: &ChatRequest, stream: bool) -> CompletionRequest {
        let mut body = build_request(request, &self.config.model, stream);
        // older Azure API versions reject stream_options
        if stream && !self.config.is_azure() {
            body.stream_options = Some(StreamOptions { include_usage: true });
        }
        body
    }

    async fn send_once(&self, body: &CompletionRequest) -> Result<Response> {
        let mut req = self
            .client
            .post(self.config.completions_url())
            .json(body);

        req = if self.config.is_azure() {
            req.header("api-key", &self.config.api_key)
        } else {
            req.bearer_auth(&self.config.api_key)
        };
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(e.to_string())
            } else {
                LlmError::HttpError(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::from_status(status.as_u16(), body))
    }

    /// POST with retries for transient failures
    async fn send(&self, body: &CompletionRequest) -> Result<Response> {
        with_retry_if(&self.retry, LlmError::is_retryable, || self.send_once(body)).await
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.completion_request(request, false);
        tracing::debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "chat completion"
        );
        let response: CompletionResponse = timed("chat_completion", self.send(&body))
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        from_completion(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        Ok(self.complete(&request).await?)
    }

    async fn stream(&self, request: ChatRequest) -> GraphResult<ChatStream> {
        let body = self.completion_request(&request, true);
        tracing::debug!(model = %body.model, "streamed chat completion");
        let response = self.send(&body).await?;

        let chunks = async_stream::stream! {
            let mut bytes = Box::pin(response.bytes_stream());
            let mut lines = SseLines::default();
            let mut acc = StreamAccumulator::default();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(GraphError::from(LlmError::HttpError(e)));
                        return;
                    }
                };
                for line in lines.feed(&chunk) {
                    match acc.push_line(&line) {
                        Ok(SseEvent::Token(token)) => yield Ok(StreamChunk::Token(token)),
                        Ok(SseEvent::Skip) => {}
                        Ok(SseEvent::Done) => break 'read,
                        Err(e) => {
                            yield Err(GraphError::from(e));
                            return;
                        }
                    }
                }
            }

            yield acc.finish().map(StreamChunk::Done).map_err(GraphError::from);
        };
        Ok(Box::pin(chunks))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
