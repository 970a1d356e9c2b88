//! End-to-end turns through the office agent with a scripted model

use parley_core::llm::ScriptedChatModel;
use parley_core::messages::{Message, ToolCall, ToolStatus};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::tool::{Tool, ToolRegistry};
use parley_core::{CompiledGraph, GraphError, ProtocolError, Resume, RunConfig};
use parley_prebuilt::agents::office::{ASK_HUMAN, GUIDANCE_AGENT, PROCESS_CONTEXT};
use parley_prebuilt::prompts::CLARIFICATION_MESSAGE;
use parley_prebuilt::{create_office_agent, ContextLookup, MAKE_PROMPT_TOOL};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingLookup {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ContextLookup for CountingLookup {
    async fn lookup(&self, entities: &[String]) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(entities
            .iter()
            .map(|e| format!("{}: 2024-01 a 2024-09", e))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn business_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(Tool::new(
            "sla",
            "SLA por oficina y periodo",
            json!({"type": "object"}),
            |_| Ok("A: 97%, B: 95%".to_string()),
        ))
        .with_tool(Tool::new(
            "ranking",
            "Ranking de ejecutivos",
            json!({"type": "object"}),
            |_| Err("timeout consultando la base".to_string()),
        ))
}

struct Harness {
    graph: CompiledGraph<ConversationState>,
    model: Arc<ScriptedChatModel>,
    lookup: Arc<CountingLookup>,
}

fn harness(model: ScriptedChatModel) -> Harness {
    let model = Arc::new(model);
    let lookup = Arc::new(CountingLookup {
        calls: AtomicUsize::new(0),
    });
    let graph = create_office_agent(model.clone(), business_tools(), lookup.clone())
        .build()
        .unwrap();
    Harness {
        graph,
        model,
        lookup,
    }
}

fn human(text: &str) -> StateDelta {
    StateDelta::append(Message::human(text))
}

fn make_prompt(id: &str, prompt: &str) -> ToolCall {
    ToolCall::new(id, MAKE_PROMPT_TOOL, json!({"internal_prompt": prompt}))
}

#[tokio::test]
async fn test_selection_recompute_then_reuse() {
    let h = harness(
        ScriptedChatModel::default()
            // turn 1: guidance hands off, analyst calls a tool and answers
            .then_call(vec![make_prompt("g1", "Entrega el SLA de septiembre")])
            .then_call(vec![ToolCall::new("a1", "sla", json!({"periodo": "septiembre"}))])
            .then_reply("SLA de septiembre: A 97%, B 95%")
            // turn 2: guidance answers directly
            .then_reply("¡De nada!"),
    );
    let config = RunConfig::new("office-1");

    let outcome = h
        .graph
        .invoke(human("Considera las oficinas ['A','B'] dame el SLA"), &config)
        .await
        .unwrap();
    assert!(!outcome.is_suspended());

    let state = outcome.state();
    assert_eq!(state.selected_entities, vec!["A", "B"]);
    assert_eq!(
        state.derived_context,
        "Datos disponibles para las oficinas: \n A: 2024-01 a 2024-09\nB: 2024-01 a 2024-09"
    );
    assert_eq!(state.guidance, "Entrega el SLA de septiembre");
    assert_eq!(state.messages[0].content(), "dame el SLA");
    assert_eq!(
        state.last_message().unwrap().content(),
        "SLA de septiembre: A 97%, B 95%"
    );
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);

    // the analyst saw the selection, the context and the guidance
    let requests = h.model.requests().await;
    let analyst_system = requests[1].system.clone().unwrap();
    assert!(analyst_system.contains("[\"A\", \"B\"]"));
    assert!(analyst_system.contains("A: 2024-01 a 2024-09"));
    assert!(analyst_system.contains("Entrega el SLA de septiembre"));

    let outcome = h
        .graph
        .invoke(human("Considera las oficinas ['B', 'A'] gracias"), &config)
        .await
        .unwrap();
    let state = outcome.state();
    assert_eq!(state.last_message().unwrap().content(), "¡De nada!");
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.model.call_count().await, 4);
}

#[tokio::test]
async fn test_changed_selection_recomputes_context() {
    let h = harness(
        ScriptedChatModel::default()
            .then_reply("¿Qué necesitas consultar?")
            .then_reply("¿Qué necesitas consultar?"),
    );
    let config = RunConfig::new("office-2");

    h.graph
        .invoke(human("Considera las oficinas ['A'] ya seleccioné"), &config)
        .await
        .unwrap();
    let outcome = h
        .graph
        .invoke(human("Considera las oficinas ['A', 'C'] listo"), &config)
        .await
        .unwrap();

    assert_eq!(outcome.state().selected_entities, vec!["A", "C"]);
    assert!(outcome.state().derived_context.contains("C: 2024-01"));
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_turn_recomputes_context_on_retry() {
    let h = harness(
        ScriptedChatModel::default()
            .then_fail("model down")
            .then_reply("ok"),
    );
    let config = RunConfig::new("office-retry");

    let err = h
        .graph
        .invoke(human("Considera las oficinas ['A','B'] dame el SLA"), &config)
        .await;
    assert!(err.is_err());

    // the selection step was committed, the context step was not
    let snapshot = h.graph.get_state("office-retry").await.unwrap().unwrap();
    assert_eq!(snapshot.values.selected_entities, vec!["A", "B"]);
    assert!(snapshot.values.derived_context.is_empty());
    assert!(snapshot.values.context_entities.is_empty());

    let outcome = h
        .graph
        .invoke(human("Considera las oficinas ['A','B'] gracias"), &config)
        .await
        .unwrap();

    let state = outcome.state();
    assert_eq!(state.last_message().unwrap().content(), "ok");
    assert_eq!(state.context_entities, vec!["A", "B"]);
    assert_eq!(
        state.derived_context,
        "Datos disponibles para las oficinas: \n A: 2024-01 a 2024-09\nB: 2024-01 a 2024-09"
    );
}

#[tokio::test]
async fn test_missing_selection_clarifies_without_model() {
    let h = harness(ScriptedChatModel::default());
    let config = RunConfig::new("office-3");

    let outcome = h.graph.invoke(human("hola"), &config).await.unwrap();

    let state = outcome.state();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.last_message().unwrap().content(), CLARIFICATION_MESSAGE);
    assert!(state.selected_entities.is_empty());
    assert!(state.derived_context.is_empty());
    assert_eq!(h.model.call_count().await, 0);
    assert_eq!(h.lookup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_clarification_resets_previous_selection() {
    let h = harness(ScriptedChatModel::default().then_reply("¿Qué necesitas consultar?"));
    let config = RunConfig::new("office-4");

    h.graph
        .invoke(human("Considera las oficinas ['A'] hola"), &config)
        .await
        .unwrap();
    let outcome = h.graph.invoke(human("dame el SLA"), &config).await.unwrap();

    let state = outcome.state();
    assert!(state.selected_entities.is_empty());
    assert!(state.derived_context.is_empty());
    assert!(state.guidance.is_empty());
}

#[tokio::test]
async fn test_ask_human_round_trip() {
    let h = harness(
        ScriptedChatModel::default()
            .then_call(vec![ToolCall::new(
                "ask-1",
                "AskHuman",
                json!({"question_for_human": "¿Para qué periodo necesitas el SLA?"}),
            )])
            .then_reply("Entendido"),
    );
    let config = RunConfig::new("office-5");

    let outcome = h
        .graph
        .invoke(human("Considera las oficinas ['A'] dame el SLA"), &config)
        .await
        .unwrap();
    let interrupt = outcome.interrupt().unwrap();
    assert_eq!(interrupt.node, ASK_HUMAN);
    assert_eq!(interrupt.value, json!("¿Para qué periodo necesitas el SLA?"));

    // the context branch finished in the same step as the guidance call
    assert!(outcome.state().derived_context.contains("A: 2024-01"));

    let snapshot = h.graph.get_state("office-5").await.unwrap().unwrap();
    assert_eq!(snapshot.next, vec![ASK_HUMAN]);

    // a new turn cannot start while the question is outstanding
    let err = h.graph.invoke(human("otra cosa"), &config).await.unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol(ProtocolError::SuspensionOutstanding { .. })
    ));
    let snapshot = h.graph.get_state("office-5").await.unwrap().unwrap();
    assert_eq!(snapshot.interrupt.map(|i| i.id), Some(interrupt.id.clone()));

    let outcome = h
        .graph
        .resume(Resume::at(ASK_HUMAN, "septiembre"), &config)
        .await
        .unwrap();
    assert!(!outcome.is_suspended());

    let state = outcome.state();
    let answer = state
        .messages
        .iter()
        .find(|m| m.tool_call_id() == Some("ask-1"))
        .unwrap();
    assert_eq!(answer.content(), "septiembre");
    assert_eq!(state.last_message().unwrap().content(), "Entendido");

    // the guidance model saw the answer on its second call
    let requests = h.model.requests().await;
    assert_eq!(requests.len(), 2);
    assert!(requests[1]
        .messages
        .iter()
        .any(|m| m.tool_call_id() == Some("ask-1")));
}

#[tokio::test]
async fn test_resume_targets_suspended_node() {
    let h = harness(ScriptedChatModel::default().then_call(vec![ToolCall::new(
        "ask-1",
        "AskHuman",
        json!({"question_for_human": "¿Periodo?"}),
    )]));
    let config = RunConfig::new("office-6");

    h.graph
        .invoke(human("Considera las oficinas ['A'] dame el SLA"), &config)
        .await
        .unwrap();

    let err = h
        .graph
        .resume(Resume::at(GUIDANCE_AGENT, "enero"), &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol(ProtocolError::WrongNode { .. })
    ));

    let err = h
        .graph
        .resume(Resume::new("enero"), &RunConfig::new("office-unknown"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Protocol(ProtocolError::NoPendingInterrupt { .. })
    ));
}

#[tokio::test]
async fn test_failing_tool_does_not_abort_turn() {
    let h = harness(
        ScriptedChatModel::default()
            .then_call(vec![make_prompt("g1", "Entrega el ranking de octubre")])
            .then_call(vec![
                ToolCall::new("a1", "ranking", json!({})),
                ToolCall::new("a2", "no_such_tool", json!({})),
            ])
            .then_reply("No pude obtener el ranking"),
    );
    let config = RunConfig::new("office-7");

    let outcome = h
        .graph
        .invoke(human("Considera las oficinas ['A'] ranking de octubre"), &config)
        .await
        .unwrap();
    assert!(!outcome.is_suspended());

    let errors: Vec<_> = outcome
        .state()
        .messages
        .iter()
        .filter_map(|m| match m {
            Message::Tool(tool) if tool.status == ToolStatus::Error => Some(tool.tool_call_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec!["a1", "a2"]);
    assert_eq!(
        outcome.state().last_message().unwrap().content(),
        "No pude obtener el ranking"
    );
}

#[tokio::test]
async fn test_model_failure_aborts_turn_without_checkpoint() {
    let h = harness(ScriptedChatModel::default().then_fail("service unavailable"));
    let config = RunConfig::new("office-8");

    let err = h
        .graph
        .invoke(human("Considera las oficinas ['A'] dame el SLA"), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Model(_)));

    // input and selection steps were recorded; the failing step was not
    let snapshot = h.graph.get_state("office-8").await.unwrap().unwrap();
    assert_eq!(snapshot.next, vec![GUIDANCE_AGENT, PROCESS_CONTEXT]);
    assert!(snapshot.values.derived_context.is_empty());
}
