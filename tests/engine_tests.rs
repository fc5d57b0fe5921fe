//! Iteration-loop properties of the agent engine.

mod common;

use std::sync::Arc;

use convoy::config::ModelSettings;
use convoy::engine::{AgentIterationEngine, TurnCompletion};
use convoy::types::{ChatMessage, EventKind, ModelDecision, ToolCallRequest};
use pretty_assertions::assert_eq;

use common::{collecting_sink, EchoDispatcher, ScriptedProvider};

fn engine(provider: Arc<ScriptedProvider>, max_iterations: usize) -> AgentIterationEngine {
    AgentIterationEngine::new(
        provider,
        Arc::new(EchoDispatcher),
        ModelSettings::default(),
        max_iterations,
    )
}

fn probe_call(id: &str) -> ToolCallRequest {
    ToolCallRequest::new(id, "probe", serde_json::json!({"input": id}))
}

#[tokio::test]
async fn tool_free_decision_ends_the_turn_in_one_iteration() {
    let provider = ScriptedProvider::always(ModelDecision::text("final answer"));
    let engine = engine(provider.clone(), 10);
    let (sink, events) = collecting_sink();

    let outcome = engine
        .run_turn("conv-1", vec![ChatMessage::user("question")], &sink)
        .await
        .unwrap();

    assert_eq!(outcome.final_content.as_deref(), Some("final answer"));
    assert_eq!(outcome.completion, TurnCompletion::Done);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(provider.call_count(), 1);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Thinking);
    assert_eq!(events[0].metadata["iteration"], 1);
}

#[tokio::test]
async fn endless_tool_calls_exhaust_exactly_at_the_budget() {
    let max_iterations = 4;
    let provider = ScriptedProvider::always(ModelDecision::tool_use(vec![probe_call("c1")]));
    let engine = engine(provider.clone(), max_iterations);
    let (sink, events) = collecting_sink();

    let outcome = engine
        .run_turn("conv-1", vec![ChatMessage::user("go")], &sink)
        .await
        .unwrap();

    assert_eq!(outcome.completion, TurnCompletion::Exhausted);
    assert!(outcome.final_content.is_none());
    assert_eq!(outcome.iterations, max_iterations);
    assert_eq!(outcome.tools_used.len(), max_iterations);
    assert_eq!(provider.call_count(), max_iterations);

    let events = events.lock().unwrap();
    let thinking = events
        .iter()
        .filter(|e| e.kind == EventKind::Thinking)
        .count();
    let tool_calls: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::ToolCall)
        .collect();
    let tool_results: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::ToolResult)
        .collect();

    assert_eq!(thinking, max_iterations);
    assert_eq!(tool_calls.len(), max_iterations);
    assert_eq!(tool_results.len(), max_iterations);

    // each iteration's events carry the right 1-based index, in call order
    for (i, (call, result)) in tool_calls.iter().zip(&tool_results).enumerate() {
        assert_eq!(call.metadata["iteration"], i + 1);
        assert_eq!(result.metadata["iteration"], i + 1);
        assert_eq!(result.content, "probe-result");
    }
}

#[tokio::test]
async fn events_interleave_with_execution_per_iteration() {
    let provider = ScriptedProvider::once(vec![
        ModelDecision::tool_use(vec![probe_call("c1"), probe_call("c2")]),
        ModelDecision::text("done"),
    ]);
    let engine = engine(provider, 10);
    let (sink, events) = collecting_sink();

    let outcome = engine
        .run_turn("conv-1", vec![ChatMessage::user("go")], &sink)
        .await
        .unwrap();
    assert_eq!(outcome.final_content.as_deref(), Some("done"));
    assert_eq!(outcome.tools_used, vec!["probe", "probe"]);

    let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Thinking,
            EventKind::ToolCall,
            EventKind::ToolResult,
            EventKind::ToolCall,
            EventKind::ToolResult,
            EventKind::Thinking,
        ]
    );
}

#[tokio::test]
async fn tool_call_events_carry_call_identity() {
    let provider = ScriptedProvider::once(vec![
        ModelDecision::tool_use(vec![probe_call("call-42")]),
        ModelDecision::text("done"),
    ]);
    let engine = engine(provider, 10);
    let (sink, events) = collecting_sink();

    engine
        .run_turn("conv-1", vec![ChatMessage::user("go")], &sink)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    let call = events
        .iter()
        .find(|e| e.kind == EventKind::ToolCall)
        .unwrap();
    assert_eq!(call.metadata["tool"], "probe");
    assert_eq!(call.metadata["tool_call_id"], "call-42");
    assert_eq!(call.metadata["arguments"]["input"], "call-42");
    assert_eq!(call.conversation_id, "conv-1");

    let result = events
        .iter()
        .find(|e| e.kind == EventKind::ToolResult)
        .unwrap();
    assert_eq!(result.metadata["tool_call_id"], "call-42");
}

#[tokio::test]
async fn reasoning_decision_emits_reasoning_before_tool_events() {
    let provider = ScriptedProvider::once(vec![
        ModelDecision::tool_use(vec![probe_call("c1")]).with_reasoning("hmm"),
        ModelDecision::text("done"),
    ]);
    let engine = engine(provider, 10);
    let (sink, events) = collecting_sink();

    engine
        .run_turn("conv-1", vec![ChatMessage::user("go")], &sink)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events[0].kind, EventKind::Thinking);
    assert!(events[0].content.is_empty());
    assert_eq!(events[1].kind, EventKind::Thinking);
    assert_eq!(events[1].content, "hmm");
    assert_eq!(events[1].metadata["is_reasoning"], true);
    assert_eq!(events[2].kind, EventKind::ToolCall);
}
