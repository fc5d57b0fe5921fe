//! The bounded decide/act iteration loop.
//!
//! One [`AgentIterationEngine::run_turn`] call drives a single logical turn:
//! request a decision, act on any tool calls, reflect, repeat. It emits a
//! live trace of `thinking`/`tool_call`/`tool_result` envelopes around each
//! step. Tool calls within an iteration execute sequentially so the message
//! context stays linear, which the decision step requires.
//!
//! The engine composes its collaborators rather than extending a base loop:
//! the decision step, the tool dispatcher, and the event sink are all
//! injected capabilities.

use std::sync::Arc;

use crate::bus::ConversationBus;
use crate::config::ModelSettings;
use crate::error::Result;
use crate::provider::DecisionProvider;
use crate::tools::ToolDispatcher;
use crate::types::{ChatMessage, EventEnvelope};
use crate::util::preview;

/// Callback receiving every envelope the engine emits.
pub type EventSink = Arc<dyn Fn(EventEnvelope) + Send + Sync>;

/// Sink that publishes onto a [`ConversationBus`].
pub fn bus_sink(bus: Arc<ConversationBus>) -> EventSink {
    Arc::new(move |envelope| bus.publish(&envelope))
}

/// Sink that discards everything.
pub fn null_sink() -> EventSink {
    Arc::new(|_| {})
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnCompletion {
    /// The decision contained no tool calls; its content is the answer.
    Done,
    /// The iteration budget ran out first. A soft stop, not an error;
    /// the caller substitutes a fixed fallback message.
    Exhausted,
}

/// Result of one turn through the loop.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Set exactly when the turn completed normally.
    pub final_content: Option<String>,
    /// Tool names invoked this turn, in call order.
    pub tools_used: Vec<String>,
    /// Iterations actually run (1-based count).
    pub iterations: usize,
    pub completion: TurnCompletion,
}

impl TurnOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.completion == TurnCompletion::Exhausted
    }
}

/// Runs the bounded think/act loop for a single turn.
pub struct AgentIterationEngine {
    provider: Arc<dyn DecisionProvider>,
    tools: Arc<dyn ToolDispatcher>,
    settings: ModelSettings,
    max_iterations: usize,
}

impl AgentIterationEngine {
    pub fn new(
        provider: Arc<dyn DecisionProvider>,
        tools: Arc<dyn ToolDispatcher>,
        settings: ModelSettings,
        max_iterations: usize,
    ) -> Self {
        Self {
            provider,
            tools,
            settings,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Drive one turn over `messages`, emitting progress to `events`.
    ///
    /// Decision-provider errors are fatal to the turn and propagate; tool
    /// failures come back as result content and the loop continues.
    pub async fn run_turn(
        &self,
        conversation_id: &str,
        mut messages: Vec<ChatMessage>,
        events: &EventSink,
    ) -> Result<TurnOutcome> {
        let definitions = self.tools.definitions();
        let mut tools_used: Vec<String> = Vec::new();

        for iteration in 1..=self.max_iterations {
            events(EventEnvelope::thinking(conversation_id, iteration));

            let decision = self
                .provider
                .decide(&messages, &definitions, &self.settings)
                .await?;

            if let Some(reasoning) = decision
                .reasoning_content
                .as_deref()
                .filter(|r| !r.is_empty())
            {
                events(EventEnvelope::reasoning(conversation_id, iteration, reasoning));
            }

            if !decision.has_tool_calls() {
                tracing::debug!(conversation_id, iteration, "turn complete");
                return Ok(TurnOutcome {
                    final_content: Some(decision.content),
                    tools_used,
                    iterations: iteration,
                    completion: TurnCompletion::Done,
                });
            }

            messages.push(ChatMessage::assistant_with_tools(
                decision.content.clone(),
                decision.tool_calls.clone(),
            ));

            for call in &decision.tool_calls {
                tools_used.push(call.name.clone());
                tracing::info!(
                    tool = %call.name,
                    args = %preview(&call.arguments.to_string(), 200),
                    iteration,
                    "tool call"
                );

                events(EventEnvelope::tool_call(
                    conversation_id,
                    iteration,
                    &call.name,
                    &call.id,
                    call.arguments.clone(),
                ));

                let result = self.tools.execute(&call.name, &call.arguments).await;

                events(EventEnvelope::tool_result(
                    conversation_id,
                    iteration,
                    &call.name,
                    &call.id,
                    result.clone(),
                ));
                messages.push(ChatMessage::tool_result(&call.id, &call.name, result));
            }

            messages.push(ChatMessage::reflection());
        }

        tracing::debug!(
            conversation_id,
            max_iterations = self.max_iterations,
            "iteration budget exhausted"
        );
        Ok(TurnOutcome {
            final_content: None,
            tools_used,
            iterations: self.max_iterations,
            completion: TurnCompletion::Exhausted,
        })
    }
}

impl std::fmt::Debug for AgentIterationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentIterationEngine")
            .field("max_iterations", &self.max_iterations)
            .field("settings", &self.settings)
            .finish()
    }
}
