//! # parley-core - conversational state machine
//!
//! The routing core of parley: conversation state, a graph engine that runs nodes in
//! supersteps, and the suspend/resume protocol that lets a turn stop to ask the human a
//! question and continue later from persisted state.
//!
//! ## Core concepts
//!
//! - **State** - [`ConversationState`]: message log plus the context a thread carries across
//!   turns (selected entities, derived context, guidance). Nodes never mutate it; they
//!   return a [`StateDelta`].
//! - **Nodes** - implement [`Node`]. A node either continues with an update and a routing
//!   decision, or suspends with a prompt for the human ([`NodeOutcome`]).
//! - **Graph** - [`StateGraph`] wires nodes with static and conditional edges; `compile()`
//!   validates the topology into a [`CompiledGraph`].
//! - **Threads** - every invocation names a thread. The engine writes a checkpoint per step
//!   to a [`CheckpointSaver`](parley_checkpoint::CheckpointSaver) and serializes requests
//!   on the same thread.
//!
//! ## Turn lifecycle
//!
//! ```text
//!   invoke(delta) ──► apply input ──► superstep ──► superstep ──► ... ──► END ──► Completed
//!                                          │
//!                                          └─► node suspends ──► Suspended{interrupt}
//!                                                                    │
//!   resume(value) ──► re-enter suspended node ──► superstep ──► ... ◄┘
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use parley_core::{StateGraph, RunConfig, START, END};
//! use parley_core::command::NodeOutcome;
//! use parley_core::messages::Message;
//! use parley_core::node::{node_fn, NodeContext};
//! use parley_core::state::{ConversationState, StateDelta};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> parley_core::Result<()> {
//! let mut graph = StateGraph::<ConversationState>::new();
//! graph
//!     .add_node("echo", node_fn(|state: &ConversationState, _ctx: &NodeContext| {
//!         let text = state.last_human().map(|m| m.content().to_string()).unwrap_or_default();
//!         Ok(NodeOutcome::update(StateDelta::append(Message::ai(text))))
//!     }))
//!     .add_edge(START, "echo")
//!     .add_edge("echo", END);
//!
//! let graph = graph.compile()?;
//! let outcome = graph
//!     .invoke(StateDelta::append(Message::human("hola")), &RunConfig::new("thread-1"))
//!     .await?;
//!
//! assert_eq!(outcome.state().messages.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`messages`] - message roles and log edits
//! - [`state`] - [`GraphState`], [`ConversationState`], [`StateDelta`]
//! - [`command`] - node outcomes and gotos
//! - [`node`] - the [`Node`] trait and [`NodeContext`]
//! - [`builder`] - [`StateGraph`] and [`Route`]
//! - [`compiled`] - the execution engine
//! - [`interrupt`] - suspend/resume types
//! - [`tool`] - tool registry and dispatch
//! - [`llm`] - the [`ChatModel`](llm::ChatModel) capability
//! - [`stream`] - turn events

pub mod builder;
pub mod command;
pub mod compiled;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod llm;
pub mod messages;
pub mod node;
pub mod state;
pub mod stream;
pub mod tool;

/// Virtual node every turn starts from
pub const START: &str = "__start__";

/// Virtual node that ends a branch
pub const END: &str = "__end__";

pub use builder::{Route, StateGraph};
pub use command::{Command, Goto, NodeOutcome};
pub use compiled::{CompiledGraph, StateSnapshot, StateSnapshotStream, TurnInput, TurnOutcome};
pub use config::{RunConfig, DEFAULT_RECURSION_LIMIT};
pub use error::{GraphError, ProtocolError, Result};
pub use interrupt::{Interrupt, InterruptPolicy, Resume};
pub use messages::{Message, MessageOp, MessageRole, ToolCall};
pub use node::{node_fn, Node, NodeContext};
pub use state::{ConversationState, GraphState, StateDelta};
pub use stream::{GraphEvent, GraphEventStream, TokenSink};
pub use tool::{Tool, ToolCallResult, ToolError, ToolOutput, ToolRegistry, ASK_HUMAN_TOOL};

pub use parley_checkpoint::{CheckpointSaver, FileCheckpointSaver, InMemoryCheckpointSaver};
