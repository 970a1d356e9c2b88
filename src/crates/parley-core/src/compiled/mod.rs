//! Execution engine for compiled graphs
//!
//! A [`CompiledGraph`] runs turns on conversation threads. Each invocation proceeds in
//! supersteps:
//!
//! 1. every node in the frontier runs concurrently against the same state;
//! 2. their updates are applied in node declaration order;
//! 3. routers and gotos are evaluated on the updated state to build the next frontier;
//! 4. a checkpoint is written.
//!
//! A node that returns `Suspend` ends the turn. Its prompt is stored on the thread as the
//! pending interrupt, together with the nodes that were scheduled next. A later
//! [`resume`](CompiledGraph::resume) re-enters exactly that node and continues from there.
//!
//! Turns and resumes on one thread never overlap: the engine holds the checkpoint store's
//! per-thread lock for the whole invocation.
//!
//! # Entry points
//!
//! - [`invoke`](CompiledGraph::invoke) - new turn, run to END or suspension
//! - [`resume`](CompiledGraph::resume) - answer the outstanding suspension
//! - [`stream`](CompiledGraph::stream) - either of the above, as a stream of events
//! - [`get_state`](CompiledGraph::get_state) / [`get_state_history`](CompiledGraph::get_state_history)

mod execution;
mod graph;
mod state;
mod streaming;
mod types;

pub use graph::CompiledGraph;
pub use types::{StateSnapshot, StateSnapshotStream, TurnInput, TurnOutcome};
