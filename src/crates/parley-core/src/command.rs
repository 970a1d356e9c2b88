//! Node outcomes: continue with an update, or suspend for human input
//!
//! Every node returns a [`NodeOutcome`]:
//!
//! - [`NodeOutcome::Continue`] carries a [`Command`]: the state update to apply and where
//!   execution goes next ([`Goto`]).
//! - [`NodeOutcome::Suspend`] carries the prompt for the human. The engine records the
//!   suspension on the thread's checkpoint and returns to the caller. A later resume
//!   re-enters the same node with the human's answer in its
//!   [`NodeContext`](crate::node::NodeContext).
//!
//! ```rust
//! use parley_core::command::{Command, Goto, NodeOutcome};
//! use parley_core::state::StateDelta;
//! use parley_core::messages::Message;
//!
//! // Follow the graph's edges
//! let next: NodeOutcome<StateDelta> = NodeOutcome::update(StateDelta::append(Message::ai("hola")));
//!
//! // Fan out to two nodes
//! let fan_out: NodeOutcome<StateDelta> = NodeOutcome::goto(
//!     StateDelta::default(),
//!     vec!["guidance_agent", "process_context"],
//! );
//!
//! // Ask the human
//! let ask: NodeOutcome<StateDelta> = NodeOutcome::suspend("¿Para qué periodo?");
//! assert!(ask.is_suspend());
//! ```

use crate::END;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where execution continues after a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Goto {
    /// Follow the static and conditional edges declared on the graph
    #[default]
    Edges,
    /// Jump to a single node
    Node(String),
    /// Fan out to several nodes, run concurrently in the next step
    Nodes(Vec<String>),
    /// Stop this branch
    End,
}

impl Goto {
    /// Explicit targets of this goto, `None` when edges decide
    pub fn targets(&self) -> Option<Vec<String>> {
        match self {
            Self::Edges => None,
            Self::Node(node) => Some(vec![node.clone()]),
            Self::Nodes(nodes) => Some(nodes.clone()),
            Self::End => Some(Vec::new()),
        }
    }
}

impl From<&str> for Goto {
    fn from(node: &str) -> Self {
        if node == END {
            Self::End
        } else {
            Self::Node(node.to_string())
        }
    }
}

impl From<String> for Goto {
    fn from(node: String) -> Self {
        Self::from(node.as_str())
    }
}

impl From<Vec<String>> for Goto {
    fn from(nodes: Vec<String>) -> Self {
        Self::Nodes(nodes)
    }
}

impl From<Vec<&str>> for Goto {
    fn from(nodes: Vec<&str>) -> Self {
        Self::Nodes(nodes.into_iter().map(String::from).collect())
    }
}

/// A state update plus a routing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command<U> {
    pub update: U,
    pub goto: Goto,
}

impl<U: Default> Command<U> {
    pub fn new() -> Self {
        Self {
            update: U::default(),
            goto: Goto::Edges,
        }
    }
}

impl<U: Default> Default for Command<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Command<U> {
    pub fn with_update(update: U) -> Self {
        Self {
            update,
            goto: Goto::Edges,
        }
    }

    pub fn goto(mut self, goto: impl Into<Goto>) -> Self {
        self.goto = goto.into();
        self
    }
}

/// Result of running one node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome<U> {
    Continue(Command<U>),
    Suspend(Value),
}

impl<U> NodeOutcome<U> {
    /// Apply `update` and follow the graph's edges
    pub fn update(update: U) -> Self {
        Self::Continue(Command::with_update(update))
    }

    /// Apply `update` and jump to `goto`
    pub fn goto(update: U, goto: impl Into<Goto>) -> Self {
        Self::Continue(Command::with_update(update).goto(goto))
    }

    /// Halt the turn and wait for human input
    pub fn suspend(prompt: impl Into<Value>) -> Self {
        Self::Suspend(prompt.into())
    }

    pub fn is_suspend(&self) -> bool {
        matches!(self, Self::Suspend(_))
    }
}

impl<U: Default> NodeOutcome<U> {
    /// No update; follow the edges
    pub fn pass() -> Self {
        Self::Continue(Command::new())
    }

    /// No update; end this branch
    pub fn end() -> Self {
        Self::Continue(Command::new().goto(Goto::End))
    }
}
