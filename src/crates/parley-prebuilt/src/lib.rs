//! # parley-prebuilt - ready-made conversational agents
//!
//! Node executors, routers and complete graphs built on [`parley_core`]:
//!
//! - **[Routing](routing)** - [`route_tools`] decides between tools, the human and END;
//!   [`route_selection`] parses the in-band office selection.
//! - **[Nodes](nodes)** - model invocation, tool dispatch, human input with suspend/resume,
//!   context recomputation, selection, clarification and guidance hand-off.
//! - **[Agents](agents)** - [`create_react_agent`] (one model looping over tools) and
//!   [`create_office_agent`] (selection gate, guidance stage, analyst stage).
//!
//! # Office agent turn
//!
//! ```rust
//! use parley_core::llm::ScriptedChatModel;
//! use parley_core::messages::Message;
//! use parley_core::state::StateDelta;
//! use parley_core::{RunConfig, ToolRegistry};
//! use parley_prebuilt::create_office_agent;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(ScriptedChatModel::default());
//! let lookup = Arc::new(|offices: Vec<String>| async move {
//!     Ok::<_, String>(format!("{} oficinas con datos de enero", offices.len()))
//! });
//! let agent = create_office_agent(model, ToolRegistry::new(), lookup).build()?;
//!
//! // No selection: the agent asks for one without calling the model
//! let outcome = agent
//!     .invoke(StateDelta::append(Message::human("hola")), &RunConfig::new("t1"))
//!     .await?;
//! assert!(outcome.state().selected_entities.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod error;
pub mod nodes;
pub mod prompts;
pub mod routing;
pub mod selection;
pub mod tools;

pub use agents::{create_office_agent, create_react_agent, OfficeAgentConfig, ReactAgentConfig};
pub use error::{PrebuiltError, Result};
pub use nodes::{
    ClarificationNode, ContextLookup, ContextNode, HumanInputNode, ModelNode, SelectionNode,
    SystemPrompt, ToolNode, UpdateGuidanceNode,
};
pub use routing::{route_tools, ToolRouter};
pub use selection::{route_selection, Selection, SelectionDecision, SelectionPattern};
pub use tools::{make_prompt_tool, MAKE_PROMPT_TOOL};
