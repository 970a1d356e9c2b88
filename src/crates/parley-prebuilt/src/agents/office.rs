//! Office analytics agent: selection gate, guidance stage and analyst stage
//!
//! ```text
//!   START ─► validate_selection ─┬─ changed ──► guidance_agent + process_context ─► END
//!                                ├─ same ─────► guidance_agent
//!                                └─ missing ──► request_selection ─► END
//!
//!   guidance_agent ─┬─ AskHuman ─────► ask_human ─► guidance_agent
//!                   ├─ make_prompt ──► guidance_tools ─► update_guidance ─┬─► analyst_agent
//!                   └─ reply ────────► END                               └─► END
//!
//!   analyst_agent ─┬─ tool calls ─► analyst_tools ─► analyst_agent
//!                  └─ reply ──────► END
//! ```
//!
//! A changed selection recomputes the derived context in the same step as the guidance
//! model call, so the context is ready before the analyst reads it. The guidance stage asks
//! for a missing time period and condenses the request into a prompt for the analyst, which
//! answers with the business tools.

use crate::error::{PrebuiltError, Result};
use crate::nodes::{
    question_for_human_definition, ClarificationNode, ContextLookup, ContextNode, HumanInputNode,
    ModelNode, SelectionNode, SelectionTargets, SystemPrompt, ToolNode, UpdateGuidanceNode,
};
use crate::prompts::{CLARIFICATION_MESSAGE, DEFAULT_HUMAN_PROMPT, GUIDANCE_ROLE};
use crate::routing::ToolRouter;
use crate::selection::SelectionPattern;
use crate::tools::make_prompt_tool;
use parley_checkpoint::CheckpointSaver;
use parley_core::interrupt::InterruptPolicy;
use parley_core::llm::ChatModel;
use parley_core::state::ConversationState;
use parley_core::tool::{ToolRegistry, ASK_HUMAN_TOOL};
use parley_core::{CompiledGraph, StateGraph, DEFAULT_RECURSION_LIMIT, END, START};
use std::sync::Arc;

pub const VALIDATE_SELECTION: &str = "validate_selection";
pub const GUIDANCE_AGENT: &str = "guidance_agent";
pub const ASK_HUMAN: &str = "ask_human";
pub const GUIDANCE_TOOLS: &str = "guidance_tools";
pub const UPDATE_GUIDANCE: &str = "update_guidance";
pub const PROCESS_CONTEXT: &str = "process_context";
pub const ANALYST_AGENT: &str = "analyst_agent";
pub const ANALYST_TOOLS: &str = "analyst_tools";
pub const REQUEST_SELECTION: &str = "request_selection";

/// Builder for the office graph
pub struct OfficeAgentConfig {
    guidance_model: Arc<dyn ChatModel>,
    analyst_model: Arc<dyn ChatModel>,
    analyst_tools: ToolRegistry,
    lookup: Arc<dyn ContextLookup>,
    pattern: SelectionPattern,
    guidance_role: String,
    clarification: String,
    human_prompt: String,
    recursion_limit: usize,
    interrupts: InterruptPolicy,
    checkpointer: Option<Arc<dyn CheckpointSaver>>,
}

impl OfficeAgentConfig {
    pub fn new(model: Arc<dyn ChatModel>, analyst_tools: ToolRegistry, lookup: Arc<dyn ContextLookup>) -> Self {
        Self {
            guidance_model: model.clone(),
            analyst_model: model,
            analyst_tools,
            lookup,
            pattern: SelectionPattern::default(),
            guidance_role: GUIDANCE_ROLE.to_string(),
            clarification: CLARIFICATION_MESSAGE.to_string(),
            human_prompt: DEFAULT_HUMAN_PROMPT.to_string(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            interrupts: InterruptPolicy::default(),
            checkpointer: None,
        }
    }

    /// Use a different model for the analyst stage
    pub fn with_analyst_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.analyst_model = model;
        self
    }

    pub fn with_selection_pattern(mut self, pattern: SelectionPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_guidance_role(mut self, role: impl Into<String>) -> Self {
        self.guidance_role = role.into();
        self
    }

    pub fn with_clarification(mut self, message: impl Into<String>) -> Self {
        self.clarification = message.into();
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
        if self.analyst_tools.has_tool(ASK_HUMAN_TOOL) {
            return Err(PrebuiltError::Configuration(format!(
                "'{}' is reserved for the human-input node",
                ASK_HUMAN_TOOL
            )));
        }

        let guidance_tools = Arc::new(ToolRegistry::new().with_tool(make_prompt_tool()));
        let analyst_tools = Arc::new(self.analyst_tools);

        let selection = SelectionNode::new(
            self.pattern,
            SelectionTargets {
                recompute: vec![GUIDANCE_AGENT.to_string(), PROCESS_CONTEXT.to_string()],
                reuse: GUIDANCE_AGENT.to_string(),
                clarify: REQUEST_SELECTION.to_string(),
            },
        );
        let guidance = ModelNode::new(self.guidance_model, SystemPrompt::Static(self.guidance_role))
            .with_tools(guidance_tools.clone())
            .with_ask_human_definition(question_for_human_definition());
        let analyst = ModelNode::new(self.analyst_model, SystemPrompt::Analyst).with_tools(analyst_tools.clone());

        let guidance_router = ToolRouter::new(GUIDANCE_TOOLS, Some(ASK_HUMAN));
        let analyst_router = ToolRouter::new(ANALYST_TOOLS, None);
        let guidance_targets = guidance_router.targets();
        let analyst_targets = analyst_router.targets();

        let mut graph = StateGraph::<ConversationState>::new();
        graph
            .add_node(VALIDATE_SELECTION, selection)
            .add_node(GUIDANCE_AGENT, guidance)
            .add_node(PROCESS_CONTEXT, ContextNode::new(self.lookup))
            .add_node(GUIDANCE_TOOLS, ToolNode::new(guidance_tools))
            .add_node(ASK_HUMAN, HumanInputNode::new(self.human_prompt))
            .add_node(UPDATE_GUIDANCE, UpdateGuidanceNode::new(ANALYST_AGENT))
            .add_node(ANALYST_AGENT, analyst)
            .add_node(ANALYST_TOOLS, ToolNode::dispatch_all(analyst_tools))
            .add_node(REQUEST_SELECTION, ClarificationNode::new(self.clarification))
            .add_edge(START, VALIDATE_SELECTION)
            .add_conditional_edges(
                GUIDANCE_AGENT,
                move |state: &ConversationState| guidance_router.route(state),
                guidance_targets,
            )
            .add_edge(ASK_HUMAN, GUIDANCE_AGENT)
            .add_edge(GUIDANCE_TOOLS, UPDATE_GUIDANCE)
            .add_edge(PROCESS_CONTEXT, END)
            .add_conditional_edges(
                ANALYST_AGENT,
                move |state: &ConversationState| analyst_router.route(state),
                analyst_targets,
            )
            .add_edge(ANALYST_TOOLS, ANALYST_AGENT)
            .with_recursion_limit(self.recursion_limit)
            .with_interrupt_policy(self.interrupts);

        let compiled = graph.compile()?;
        Ok(match self.checkpointer {
            Some(checkpointer) => compiled.with_checkpointer(checkpointer),
            None => compiled,
        })
    }
}

/// Start configuring the office agent.
///
/// `model` drives both stages unless [`OfficeAgentConfig::with_analyst_model`] overrides the
/// analyst; `analyst_tools` are the business tools; `lookup` produces the per-office context.
pub fn create_office_agent(
    model: Arc<dyn ChatModel>,
    analyst_tools: ToolRegistry,
    lookup: Arc<dyn ContextLookup>,
) -> OfficeAgentConfig {
    OfficeAgentConfig::new(model, analyst_tools, lookup)
}
