//! Node executors over [`ConversationState`](parley_core::ConversationState)
//!
//! | Node | Reads | Writes |
//! |------|-------|--------|
//! | [`ModelNode`] | messages, context | one AI message |
//! | [`ToolNode`] | last tool calls | one tool result per call |
//! | [`HumanInputNode`] | pending `AskHuman` call | suspends, then one tool result |
//! | [`ContextNode`] | selection | derived context |
//! | [`SelectionNode`] | last human message | cleaned message, selection |
//! | [`ClarificationNode`] | - | one AI message, reset context |
//! | [`UpdateGuidanceNode`] | last tool result | guidance |

mod clarify;
mod context;
mod guidance;
mod human;
mod model;
mod selection;
mod tool;

pub use clarify::ClarificationNode;
pub use context::{format_context, ContextLookup, ContextNode};
pub use guidance::UpdateGuidanceNode;
pub use human::{question_for_human_definition, HumanInputNode};
pub use model::{ModelNode, SystemPrompt};
pub use selection::{SelectionNode, SelectionTargets};
pub use tool::ToolNode;
