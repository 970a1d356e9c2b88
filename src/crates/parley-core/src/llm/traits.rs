//! The [`ChatModel`] trait
//!
//! Implementations convert a [`ChatRequest`] into a provider call and the provider's reply
//! into an AI [`Message`](crate::messages::Message). Streaming is optional: the default
//! `stream` delivers the whole response as one token followed by `Done`.

use super::config::ChatRequest;
use super::response::ChatResponse;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::pin::Pin;

/// Piece of a streamed response
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Text delta
    Token(String),
    /// Final assembled response; always the last item
    Done(ChatResponse),
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Single request/response invocation
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Streamed invocation
    async fn stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let response = self.chat(request).await?;
        let mut chunks = Vec::with_capacity(2);
        let content = response.message.content().to_string();
        if !content.is_empty() {
            chunks.push(Ok(StreamChunk::Token(content)));
        }
        chunks.push(Ok(StreamChunk::Done(response)));
        Ok(Box::pin(stream::iter(chunks)))
    }

    /// Default model name used when a request does not override it
    fn model_name(&self) -> &str;

    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }
}
