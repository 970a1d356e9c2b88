//! ReAct agent: one model node looping over tools, with human-in-the-loop questions
//!
//! ```text
//!            ┌──────────────┐
//!   START ──►│    agent     │──► END (no tool calls)
//!            └──────────────┘
//!              │        ▲  │
//!   tool calls │        │  │ AskHuman
//!              ▼        │  ▼
//!          ┌───────┐  ┌───────────┐
//!          │ tools │  │ ask_human │ (suspends the turn)
//!          └───────┘  └───────────┘
//!              └────────┴──► agent
//! ```
//!
//! The system instruction is the thread's derived context followed by the role text.
//!
//! ```rust
//! use parley_core::llm::ScriptedChatModel;
//! use parley_core::messages::Message;
//! use parley_core::state::StateDelta;
//! use parley_core::{RunConfig, ToolRegistry};
//! use parley_prebuilt::create_react_agent;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Arc::new(ScriptedChatModel::default().then_reply("¡Hola! ¿En qué te puedo ayudar?"));
//! let agent = create_react_agent(model, ToolRegistry::new()).build()?;
//!
//! let outcome = agent
//!     .invoke(StateDelta::append(Message::human("hola")), &RunConfig::new("t1"))
//!     .await?;
//! assert!(!outcome.is_suspended());
//! # Ok(())
//! # }
//! ```

use crate::error::{PrebuiltError, Result};
use crate::nodes::{HumanInputNode, ModelNode, SystemPrompt, ToolNode};
use crate::prompts::{DEFAULT_HUMAN_PROMPT, REACT_ROLE};
use crate::routing::{ToolRouter, ASK_HUMAN_NODE, TOOLS_NODE};
use parley_checkpoint::CheckpointSaver;
use parley_core::interrupt::InterruptPolicy;
use parley_core::llm::ChatModel;
use parley_core::state::ConversationState;
use parley_core::tool::{ToolRegistry, ASK_HUMAN_TOOL};
use parley_core::{CompiledGraph, StateGraph, DEFAULT_RECURSION_LIMIT, START};
use std::sync::Arc;

/// Name of the model node
pub const AGENT_NODE: &str = "agent";

/// Builder for the ReAct graph
pub struct ReactAgentConfig {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    role: String,
    ask_human: bool,
    human_prompt: String,
    recursion_limit: usize,
    interrupts: InterruptPolicy,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
}

impl ReactAgentConfig {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Self {
        Self {
            model,
            tools,
            role: REACT_ROLE.to_string(),
            ask_human: true,
            human_prompt: DEFAULT_HUMAN_PROMPT.to_string(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            interrupts: InterruptPolicy::default(),
            checkpointer: None,
        }
    }

    /// Role text placed after the derived context
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Drop the `AskHuman` tool and the human-input node
    pub fn without_ask_human(mut self) -> Self {
        self.ask_human = false;
        self
    }

    pub fn with_human_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.human_prompt = prompt.into();
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_interrupt_policy(mut self, policy: InterruptPolicy) -> Self {
        self.interrupts = policy;
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn build(self) -> Result<CompiledGraph<ConversationState>> {
        if self.tools.has_tool(ASK_HUMAN_TOOL) {
            return Err(PrebuiltError::Configuration(format!(
                "'{}' is reserved for the human-input node",
                ASK_HUMAN_TOOL
            )));
        }

        let tools = Arc::new(self.tools);
        let mut agent = ModelNode::new(self.model, SystemPrompt::Context(self.role)).with_tools(tools.clone());
        let router = if self.ask_human {
            agent = agent.with_ask_human();
            ToolRouter::default()
        } else {
            ToolRouter::new(TOOLS_NODE, None)
        };

        let mut graph = StateGraph::<ConversationState>::new();
        graph
            .add_node(AGENT_NODE, agent)
            .add_node(TOOLS_NODE, ToolNode::new(tools))
            .add_edge(START, AGENT_NODE)
            .add_edge(TOOLS_NODE, AGENT_NODE)
            .with_recursion_limit(self.recursion_limit)
            .with_interrupt_policy(self.interrupts);

        if self.ask_human {
            graph
                .add_node(ASK_HUMAN_NODE, HumanInputNode::new(self.human_prompt))
                .add_edge(ASK_HUMAN_NODE, AGENT_NODE);
        }

        let targets = router.targets();
        graph.add_conditional_edges(AGENT_NODE, move |state: &ConversationState| router.route(state), targets);

        let compiled = graph.compile()?;
        Ok(match self.checkpointer {
            Some(checkpointer) => compiled.with_checkpointer(checkpointer),
            None => compiled,
        })
    }
}

/// Start configuring a ReAct agent over `model` and `tools`
pub fn create_react_agent(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> ReactAgentConfig {
    ReactAgentConfig::new(model, tools)
}
