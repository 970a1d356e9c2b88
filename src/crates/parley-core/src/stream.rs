//! Events emitted while a turn runs
//!
//! [`CompiledGraph::stream`](crate::compiled::CompiledGraph::stream) yields a
//! [`GraphEventStream`]. Events arrive in execution order:
//!
//! ```text
//! Token* ─► Update (per node, per step) ─► ... ─► Completed | Interrupted
//! ```
//!
//! `Token` events are only produced by nodes that emit them (model nodes with token
//! streaming enabled). A failed turn ends the stream with an `Err` item.

use crate::error::Result;
use crate::interrupt::Interrupt;
use futures::stream::Stream;
use serde::Serialize;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

/// One observable step of a running turn
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GraphEvent<S, U> {
    /// A chunk of model output produced inside `node`
    Token { node: String, content: String },

    /// `node` finished in `step` and produced `update`
    Update { node: String, step: usize, update: U },

    /// The turn suspended waiting for human input
    Interrupted { interrupt: Interrupt },

    /// The turn reached END
    Completed { state: S },
}

impl<S, U> GraphEvent<S, U> {
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::Token { node, .. } | Self::Update { node, .. } => Some(node),
            Self::Interrupted { interrupt } => Some(&interrupt.node),
            Self::Completed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Interrupted { .. } | Self::Completed { .. })
    }
}

/// Stream of graph events for one turn
pub type GraphEventStream<S, U> = Pin<Box<dyn Stream<Item = Result<GraphEvent<S, U>>> + Send>>;

/// Callback receiving `(node, token)` pairs from running nodes
#[derive(Clone)]
pub struct TokenSink(Arc<dyn Fn(&str, &str) + Send + Sync>);

impl TokenSink {
    pub fn new(f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn emit(&self, node: &str, token: &str) {
        (self.0)(node, token)
    }
}

impl fmt::Debug for TokenSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenSink")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_token_sink_forwards_pairs() {
        let collected: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
        let sink = {
            let collected = collected.clone();
            TokenSink::new(move |node, token| {
                collected.lock().unwrap().push((node.to_string(), token.to_string()));
            })
        };

        sink.emit("analyst", "Hola");
        sink.emit("analyst", " mundo");

        let seen = collected.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], ("analyst".to_string(), " mundo".to_string()));
    }

    #[test]
    fn test_event_serialization_tag() {
        let event: GraphEvent<(), ()> = GraphEvent::Token {
            node: "agent".to_string(),
            content: "x".to_string(),
        };
        let raw = serde_json::to_value(&event).unwrap();
        assert_eq!(raw["event"], "token");
        assert_eq!(event.node(), Some("agent"));
        assert!(!event.is_terminal());
    }
}
