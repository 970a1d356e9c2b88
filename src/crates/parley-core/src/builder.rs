//! Graph builder
//!
//! [`StateGraph`] collects nodes and edges, validates the topology and produces a
//! [`CompiledGraph`].
//!
//! ```text
//!            ┌──────────── route_tools ────────────┐
//! START ──► agent ──► tools ──► agent              │
//!              │                                   │
//!              ├──► ask_human ──► agent            │
//!              └──► END ◄──────────────────────────┘
//! ```
//!
//! ```rust
//! use parley_core::{StateGraph, Route, START, END};
//! use parley_core::node::{node_fn, NodeContext};
//! use parley_core::command::NodeOutcome;
//! use parley_core::state::ConversationState;
//!
//! let mut graph = StateGraph::<ConversationState>::new();
//! graph
//!     .add_node("agent", node_fn(|_s: &ConversationState, _c: &NodeContext| Ok(NodeOutcome::pass())))
//!     .add_node("tools", node_fn(|_s: &ConversationState, _c: &NodeContext| Ok(NodeOutcome::pass())))
//!     .add_edge(START, "agent")
//!     .add_conditional_edges(
//!         "agent",
//!         |state: &ConversationState| {
//!             if state.last_message().map_or(false, |m| m.has_tool_calls()) {
//!                 Route::to("tools")
//!             } else {
//!                 Route::End
//!             }
//!         },
//!         ["tools", END],
//!     )
//!     .add_edge("tools", "agent");
//!
//! let compiled = graph.compile().unwrap();
//! assert!(compiled.has_node("tools"));
//! ```

use crate::compiled::CompiledGraph;
use crate::config::ExecutionLimits;
use crate::error::{GraphError, Result};
use crate::interrupt::InterruptPolicy;
use crate::node::Node;
use crate::state::GraphState;
use crate::{END, START};
use std::collections::HashMap;
use std::sync::Arc;

/// Decision returned by a router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    To(String),
    /// Run several nodes in the next step
    Fanout(Vec<String>),
    End,
}

impl Route {
    pub fn to(node: impl Into<String>) -> Self {
        let node = node.into();
        if node == END {
            Self::End
        } else {
            Self::To(node)
        }
    }

    pub fn fanout<I, T>(nodes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::Fanout(nodes.into_iter().map(Into::into).collect())
    }

    /// Target nodes, END excluded
    pub fn targets(&self) -> Vec<String> {
        match self {
            Self::To(node) => vec![node.clone()],
            Self::Fanout(nodes) => nodes.iter().filter(|n| *n != END).cloned().collect(),
            Self::End => Vec::new(),
        }
    }
}

/// Pure routing function over state
pub type Router<S> = Arc<dyn Fn(&S) -> Route + Send + Sync>;

pub(crate) struct Branch<S> {
    pub(crate) router: Router<S>,
    /// Declared targets; empty allows any node
    pub(crate) targets: Vec<String>,
}

pub(crate) struct NodeEntry<S: GraphState> {
    pub(crate) name: String,
    pub(crate) node: Arc<dyn Node<S>>,
}

/// Validated topology shared by every clone of a compiled graph
pub(crate) struct GraphSpec<S: GraphState> {
    pub(crate) nodes: Vec<NodeEntry<S>>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) edges: HashMap<String, Vec<String>>,
    pub(crate) branches: HashMap<String, Vec<Branch<S>>>,
    pub(crate) limits: ExecutionLimits,
}

impl<S: GraphState> GraphSpec<S> {
    pub(crate) fn node(&self, name: &str) -> Option<&Arc<dyn Node<S>>> {
        self.index.get(name).map(|&i| &self.nodes[i].node)
    }

    pub(crate) fn position(&self, name: &str) -> usize {
        self.index.get(name).copied().unwrap_or(usize::MAX)
    }
}

/// Builder for a graph over state `S`
pub struct StateGraph<S: GraphState> {
    nodes: Vec<NodeEntry<S>>,
    edges: Vec<(String, String)>,
    branches: Vec<(String, Branch<S>)>,
    limits: ExecutionLimits,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> StateGraph<S> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            branches: Vec::new(),
            limits: ExecutionLimits::default(),
        }
    }

    /// Add a node. Nodes of one step apply their updates in the order they were added.
    pub fn add_node(&mut self, name: impl Into<String>, node: impl Node<S> + 'static) -> &mut Self {
        self.nodes.push(NodeEntry {
            name: name.into(),
            node: Arc::new(node),
        });
        self
    }

    /// Add a node that is already shared
    pub fn add_shared_node(&mut self, name: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.push(NodeEntry {
            name: name.into(),
            node,
        });
        self
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Route out of `from` with `router`; `targets` lists every node it may return
    pub fn add_conditional_edges<F, I, T>(&mut self, from: impl Into<String>, router: F, targets: I) -> &mut Self
    where
        F: Fn(&S) -> Route + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.branches.push((
            from.into(),
            Branch {
                router: Arc::new(router),
                targets: targets.into_iter().map(Into::into).collect(),
            },
        ));
        self
    }

    /// Shorthand for `add_edge(START, node)`
    pub fn set_entry_point(&mut self, node: impl Into<String>) -> &mut Self {
        self.add_edge(START, node)
    }

    /// Maximum supersteps per invocation
    pub fn with_recursion_limit(&mut self, limit: usize) -> &mut Self {
        self.limits.recursion_limit = limit;
        self
    }

    pub fn with_interrupt_policy(&mut self, policy: InterruptPolicy) -> &mut Self {
        self.limits.interrupts = policy;
        self
    }

    /// Validate the topology and build the executable graph
    pub fn compile(self) -> Result<CompiledGraph<S>> {
        let spec = self.validate()?;
        Ok(CompiledGraph::new(spec))
    }

    fn validate(self) -> Result<GraphSpec<S>> {
        let mut index = HashMap::new();
        for (i, entry) in self.nodes.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(GraphError::Validation("node names must not be empty".to_string()));
            }
            if entry.name == START || entry.name == END {
                return Err(GraphError::Validation(format!(
                    "'{}' is reserved and cannot be used as a node name",
                    entry.name
                )));
            }
            if index.insert(entry.name.clone(), i).is_some() {
                return Err(GraphError::Validation(format!(
                    "node '{}' is defined more than once",
                    entry.name
                )));
            }
        }

        let is_source = |name: &str| name == START || index.contains_key(name);
        let is_target = |name: &str| name == END || index.contains_key(name);

        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in self.edges {
            if !is_source(&from) {
                return Err(GraphError::Validation(format!("edge starts at unknown node '{}'", from)));
            }
            if !is_target(&to) {
                return Err(GraphError::Validation(format!(
                    "edge from '{}' points to unknown node '{}'",
                    from, to
                )));
            }
            let targets = edges.entry(from).or_default();
            if !targets.contains(&to) {
                targets.push(to);
            }
        }

        let mut branches: HashMap<String, Vec<Branch<S>>> = HashMap::new();
        for (from, branch) in self.branches {
            if !is_source(&from) {
                return Err(GraphError::Validation(format!(
                    "conditional edge starts at unknown node '{}'",
                    from
                )));
            }
            if let Some(missing) = branch.targets.iter().find(|t| !is_target(t)) {
                return Err(GraphError::Validation(format!(
                    "router on '{}' targets unknown node '{}'",
                    from, missing
                )));
            }
            branches.entry(from).or_default().push(branch);
        }

        if !edges.contains_key(START) && !branches.contains_key(START) {
            return Err(GraphError::Validation(
                "graph has no entry point; add an edge from START".to_string(),
            ));
        }

        if self.limits.recursion_limit == 0 {
            return Err(GraphError::Validation("recursion limit must be at least 1".to_string()));
        }

        Ok(GraphSpec {
            nodes: self.nodes,
            index,
            edges,
            branches,
            limits: self.limits,
        })
    }
}
