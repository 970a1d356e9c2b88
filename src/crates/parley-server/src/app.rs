//! Assembling the server from its configuration

use crate::api::stream::StreamFilter;
use crate::api::{create_router, AppState};
use crate::config::{CheckpointSettings, ConfigError, GraphKind, ServerConfig};
use async_trait::async_trait;
use axum::Router;
use llm::{LlmError, OpenAiClient};
use parley_checkpoint::{
    CheckpointError, CheckpointSaver, FileCheckpointSaver, InMemoryCheckpointSaver, PrettyJsonSerializer,
};
use parley_core::llm::ChatModel;
use parley_core::{CompiledGraph, ConversationState, InterruptPolicy, ToolRegistry};
use parley_prebuilt::{create_office_agent, create_react_agent, ContextLookup, PrebuiltError, SelectionPattern};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Model client: {0}")]
    Model(#[from] LlmError),

    #[error("Checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Agent graph: {0}")]
    Graph(#[from] PrebuiltError),
}

/// Context text per office, taken from the `[graph.context]` table
#[derive(Debug, Clone, Default)]
pub struct ConfiguredContext {
    entries: BTreeMap<String, String>,
}

impl ConfiguredContext {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl ContextLookup for ConfiguredContext {
    async fn lookup(&self, entities: &[String]) -> Result<String, String> {
        let mut lines = Vec::new();
        let mut missing = Vec::new();
        for entity in entities {
            match self.entries.get(entity) {
                Some(text) => lines.push(format!("{}: {}", entity, text)),
                None => missing.push(entity.as_str()),
            }
        }
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "No context configured for some offices");
            lines.push(format!("Sin datos para: {}", missing.join(", ")));
        }
        Ok(lines.join("\n"))
    }
}

/// Thread store selected by the checkpoint settings.
///
/// Development mode keeps everything in memory. Otherwise threads go to files when a
/// directory is configured.
pub async fn build_checkpointer(settings: &CheckpointSettings) -> Result<Arc<dyn CheckpointSaver>, AppError> {
    let dir = match &settings.dir {
        Some(dir) if !settings.dev => dir,
        _ => {
            if !settings.dev {
                tracing::warn!("Checkpointing enabled without a directory; threads are kept in memory");
            }
            let mut saver = InMemoryCheckpointSaver::new();
            if let Some(max) = settings.max_history {
                saver = saver.with_max_history(max);
            }
            return Ok(Arc::new(saver));
        }
    };

    tracing::info!(dir = %dir.display(), pretty = settings.pretty, "Using file checkpoint store");
    let saver: Arc<dyn CheckpointSaver> = match (settings.pretty, settings.max_history) {
        (true, Some(max)) => Arc::new(
            FileCheckpointSaver::with_serializer(dir, PrettyJsonSerializer)
                .await?
                .with_max_history(max),
        ),
        (true, None) => Arc::new(FileCheckpointSaver::with_serializer(dir, PrettyJsonSerializer).await?),
        (false, Some(max)) => Arc::new(FileCheckpointSaver::open(dir).await?.with_max_history(max)),
        (false, None) => Arc::new(FileCheckpointSaver::open(dir).await?),
    };
    Ok(saver)
}

/// OpenAI-compatible client for the configured endpoint
pub fn build_model(config: &ServerConfig) -> Result<Arc<dyn ChatModel>, AppError> {
    let client = OpenAiClient::new(config.model.client_config()?)?;
    Ok(Arc::new(client))
}

/// Compile the configured agent graph
pub fn build_graph(
    config: &ServerConfig,
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    checkpointer: Arc<dyn CheckpointSaver>,
) -> Result<CompiledGraph<ConversationState>, AppError> {
    let graph = &config.graph;
    let interrupts = graph
        .interrupt_ttl()
        .map(InterruptPolicy::with_ttl)
        .unwrap_or_default();

    let compiled = match graph.kind {
        GraphKind::React => {
            let mut agent = create_react_agent(model, tools)
                .with_recursion_limit(graph.recursion_limit)
                .with_interrupt_policy(interrupts)
                .with_checkpointer(checkpointer);
            if let Some(role) = &graph.role {
                agent = agent.with_role(role);
            }
            if let Some(prompt) = &graph.human_prompt {
                agent = agent.with_human_prompt(prompt);
            }
            agent.build()?
        }
        GraphKind::Office => {
            let lookup = Arc::new(ConfiguredContext::new(graph.context.clone()));
            let mut agent = create_office_agent(model, tools, lookup)
                .with_recursion_limit(graph.recursion_limit)
                .with_interrupt_policy(interrupts)
                .with_checkpointer(checkpointer);
            if let Some(pattern) = &graph.selection_pattern {
                agent = agent.with_selection_pattern(SelectionPattern::new(pattern)?);
            }
            if let Some(role) = &graph.role {
                agent = agent.with_guidance_role(role);
            }
            if let Some(prompt) = &graph.human_prompt {
                agent = agent.with_human_prompt(prompt);
            }
            agent.build()?
        }
    };

    for node in graph.streamed_nodes() {
        if !compiled.has_node(&node) {
            tracing::warn!(node = %node, kind = graph.kind.as_str(), "Streamed node is not part of the graph");
        }
    }
    Ok(compiled)
}

/// Application state with the given model and tools
pub async fn build_state(
    config: &ServerConfig,
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
) -> Result<AppState, AppError> {
    let checkpointer = build_checkpointer(&config.checkpoint).await?;
    let graph = build_graph(config, model, tools, checkpointer)?;
    let filter = StreamFilter::new(config.graph.streamed_nodes(), config.graph.hidden_tools.clone());

    Ok(AppState::new(graph, filter, config.graph.kind, config.model.name.clone()))
}

/// Router for a fully configured server
pub async fn build_app(
    config: &ServerConfig,
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
) -> Result<Router, AppError> {
    let state = build_state(config, model, tools).await?;
    Ok(create_router(state, &config.server.cors_origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::llm::ScriptedChatModel;
    use parley_prebuilt::agents::office::PROCESS_CONTEXT;

    #[tokio::test]
    async fn test_configured_context_lists_missing() {
        let context = ConfiguredContext::new(BTreeMap::from([(
            "003 - Cauquenes".to_string(),
            "SLA de enero a octubre".to_string(),
        )]));

        let text = context
            .lookup(&["003 - Cauquenes".to_string(), "009 - Vitacura EDW".to_string()])
            .await
            .unwrap();
        assert_eq!(
            text,
            "003 - Cauquenes: SLA de enero a octubre\nSin datos para: 009 - Vitacura EDW"
        );
    }

    #[tokio::test]
    async fn test_file_checkpointer_when_not_dev() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CheckpointSettings {
            dev: false,
            dir: Some(dir.path().join("threads")),
            pretty: true,
            max_history: Some(10),
        };
        build_checkpointer(&settings).await.unwrap();
        assert!(dir.path().join("threads").is_dir());
    }

    #[tokio::test]
    async fn test_build_office_graph() {
        let mut config = ServerConfig::default();
        config.graph.kind = GraphKind::Office;

        let checkpointer = build_checkpointer(&config.checkpoint).await.unwrap();
        let graph = build_graph(
            &config,
            Arc::new(ScriptedChatModel::default()),
            ToolRegistry::new(),
            checkpointer,
        )
        .unwrap();
        assert!(graph.has_node(PROCESS_CONTEXT));
    }

    #[tokio::test]
    async fn test_invalid_selection_pattern() {
        let mut config = ServerConfig::default();
        config.graph.kind = GraphKind::Office;
        config.graph.selection_pattern = Some("sin grupo".to_string());

        let result = build_state(&config, Arc::new(ScriptedChatModel::default()), ToolRegistry::new()).await;
        assert!(matches!(result, Err(AppError::Graph(PrebuiltError::InvalidPattern(_)))));
    }
}
