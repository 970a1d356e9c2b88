//! Node trait and execution context
//!
//! A node reads the current state and returns a [`NodeOutcome`]. It never mutates state
//! directly; the engine folds the returned update in after the whole step finishes.
//!
//! ```rust
//! use parley_core::node::{node_fn, NodeContext};
//! use parley_core::command::NodeOutcome;
//! use parley_core::state::{ConversationState, StateDelta};
//! use parley_core::messages::Message;
//!
//! let greet = node_fn(|_state: &ConversationState, _ctx: &NodeContext| {
//!     Ok(NodeOutcome::update(StateDelta::append(Message::ai("hola"))))
//! });
//! ```

use crate::command::NodeOutcome;
use crate::config::RunConfig;
use crate::error::Result;
use crate::interrupt::value_to_text;
use crate::state::GraphState;
use crate::stream::TokenSink;
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;

/// A unit of work in a graph
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    async fn run(&self, state: &S, ctx: &NodeContext) -> Result<NodeOutcome<S::Update>>;
}

/// What a node knows about the invocation it runs in
#[derive(Debug, Clone)]
pub struct NodeContext {
    pub thread_id: String,

    /// Name the node is registered under
    pub node: String,

    /// Superstep within this invocation, starting at 1
    pub step: usize,

    /// The human's answer, set only when this node is re-entered by a resume
    pub resume: Option<Value>,

    pub config: RunConfig,

    pub(crate) tokens: Option<TokenSink>,
}

impl NodeContext {
    pub fn new(node: impl Into<String>, config: RunConfig) -> Self {
        Self {
            thread_id: config.thread_id.clone(),
            node: node.into(),
            step: 1,
            resume: None,
            config,
            tokens: None,
        }
    }

    pub fn with_resume(mut self, value: Value) -> Self {
        self.resume = Some(value);
        self
    }

    pub fn with_token_sink(mut self, sink: TokenSink) -> Self {
        self.tokens = Some(sink);
        self
    }

    pub fn resume_value(&self) -> Option<&Value> {
        self.resume.as_ref()
    }

    /// The resume value as text
    pub fn resume_string(&self) -> Option<String> {
        self.resume.as_ref().map(value_to_text)
    }

    /// Whether tokens emitted by this node reach a consumer
    pub fn streams_tokens(&self) -> bool {
        self.config.stream_tokens && self.tokens.is_some()
    }

    /// Forward a model token to the stream consumer, if any
    pub fn emit_token(&self, token: &str) {
        if let Some(sink) = &self.tokens {
            sink.emit(&self.node, token);
        }
    }

    /// Model name requested for this invocation
    pub fn model_override(&self) -> Option<&str> {
        self.config.model()
    }
}

/// Node backed by a synchronous closure
pub struct FnNode<S, F> {
    f: F,
    _state: PhantomData<fn(&S)>,
}

/// Wrap a closure as a [`Node`]
pub fn node_fn<S, F>(f: F) -> FnNode<S, F>
where
    S: GraphState,
    F: Fn(&S, &NodeContext) -> Result<NodeOutcome<S::Update>> + Send + Sync,
{
    FnNode {
        f,
        _state: PhantomData,
    }
}

#[async_trait]
impl<S, F> Node<S> for FnNode<S, F>
where
    S: GraphState,
    F: Fn(&S, &NodeContext) -> Result<NodeOutcome<S::Update>> + Send + Sync,
{
    async fn run(&self, state: &S, ctx: &NodeContext) -> Result<NodeOutcome<S::Update>> {
        (self.f)(state, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use crate::state::{ConversationState, StateDelta};
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_node_reads_resume() {
        let node = node_fn(|_state: &ConversationState, ctx: &NodeContext| {
            let answer = ctx.resume_string().unwrap_or_default();
            Ok(NodeOutcome::update(StateDelta::append(Message::human(answer))))
        });

        let ctx = NodeContext::new("ask_human", RunConfig::new("t1")).with_resume(json!("septiembre"));
        match node.run(&ConversationState::default(), &ctx).await.unwrap() {
            NodeOutcome::Continue(cmd) => {
                assert_eq!(cmd.update.appended().next().map(Message::content), Some("septiembre"))
            }
            NodeOutcome::Suspend(_) => panic!("Expected Continue variant"),
        }
    }

    #[test]
    fn test_emit_without_sink_is_noop() {
        let ctx = NodeContext::new("agent", RunConfig::new("t1").with_stream_tokens(true));
        assert!(!ctx.streams_tokens());
        ctx.emit_token("ignored");
    }
}
