//! Threads that outlive the graph instance that started them

use parley_core::command::NodeOutcome;
use parley_core::messages::Message;
use parley_core::node::{node_fn, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::{
    CompiledGraph, FileCheckpointSaver, GraphError, ProtocolError, Resume, RunConfig, StateGraph,
    END, START,
};
use std::path::Path;
use std::sync::Arc;

async fn build(dir: &Path) -> CompiledGraph<ConversationState> {
    let mut graph = StateGraph::new();
    graph
        .add_node(
            "ask_human",
            node_fn(|_s: &ConversationState, ctx: &NodeContext| match ctx.resume_string() {
                Some(answer) => Ok(NodeOutcome::update(StateDelta::append(Message::tool(
                    answer, "call_7",
                )))),
                None => Ok(NodeOutcome::suspend("Por favor, proporciona el periodo de tiempo")),
            }),
        )
        .add_node(
            "answer",
            node_fn(|s: &ConversationState, _c: &NodeContext| {
                let period = s.last_message().map(|m| m.content().to_string()).unwrap_or_default();
                Ok(NodeOutcome::update(StateDelta::append(Message::ai(format!(
                    "SLA de {}: 97%",
                    period
                )))))
            }),
        )
        .add_edge(START, "ask_human")
        .add_edge("ask_human", "answer")
        .add_edge("answer", END);

    let saver = FileCheckpointSaver::open(dir).await.unwrap();
    graph.compile().unwrap().with_checkpointer(Arc::new(saver))
}

#[tokio::test]
async fn test_resume_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig::new("thread-42");

    let first = build(dir.path()).await;
    let outcome = first
        .invoke(StateDelta::append(Message::human("dame el SLA")), &config)
        .await
        .unwrap();
    assert!(outcome.is_suspended());
    drop(first);

    let second = build(dir.path()).await;
    let snapshot = second.get_state("thread-42").await.unwrap().unwrap();
    assert_eq!(snapshot.next, vec!["ask_human"]);
    assert_eq!(
        snapshot.interrupt.as_ref().map(|i| i.value.clone()),
        Some(serde_json::json!("Por favor, proporciona el periodo de tiempo"))
    );

    let outcome = second
        .resume(Resume::at("ask_human", "septiembre"), &config)
        .await
        .unwrap();
    let last = outcome.state().last_message().unwrap();
    assert_eq!(last.content(), "SLA de septiembre: 97%");
}

#[tokio::test]
async fn test_concurrent_resumes_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let graph = build(dir.path()).await;
    let config = RunConfig::new("t1");

    graph
        .invoke(StateDelta::append(Message::human("hola")), &config)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        graph.resume(Resume::new("enero"), &config),
        graph.resume(Resume::new("febrero"), &config)
    );

    // exactly one resume consumes the suspension
    let results = [a, b];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(GraphError::Protocol(ProtocolError::NoPendingInterrupt { .. }))
    )));

    let state = graph.get_state("t1").await.unwrap().unwrap().values;
    let tool_messages = state.messages.iter().filter(|m| m.is_tool()).count();
    assert_eq!(tool_messages, 1);
}
