//! Shared helpers for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use convoy::config::ModelSettings;
use convoy::engine::EventSink;
use convoy::error::{ConvoyError, Result};
use convoy::provider::{DecisionProvider, ToolDefinition};
use convoy::tools::ToolDispatcher;
use convoy::types::{ChatMessage, EventEnvelope, ModelDecision};

/// Provider that replays a scripted list of decisions and counts calls.
pub struct ScriptedProvider {
    decisions: Mutex<Vec<ModelDecision>>,
    /// When the script runs dry: repeat this decision forever, or error.
    repeat: Option<ModelDecision>,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    /// Replay `decisions` once, then fail with a decision error.
    pub fn once(decisions: Vec<ModelDecision>) -> Arc<Self> {
        Arc::new(Self {
            decisions: Mutex::new(decisions),
            repeat: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Return the same decision on every call.
    pub fn always(decision: ModelDecision) -> Arc<Self> {
        Arc::new(Self {
            decisions: Mutex::new(Vec::new()),
            repeat: Some(decision),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionProvider for ScriptedProvider {
    async fn decide(
        &self,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _settings: &ModelSettings,
    ) -> Result<ModelDecision> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut decisions = self.decisions.lock().unwrap();
        if let Some(next) = (!decisions.is_empty()).then(|| decisions.remove(0)) {
            return Ok(next);
        }
        match &self.repeat {
            Some(decision) => Ok(decision.clone()),
            None => Err(ConvoyError::Decision("scripted provider exhausted".into())),
        }
    }
}

/// Dispatcher that answers every tool call with `"<name>-result"`.
pub struct EchoDispatcher;

#[async_trait]
impl ToolDispatcher for EchoDispatcher {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "probe".into(),
            description: "probe tool".into(),
            parameters: serde_json::json!({"type": "object"}),
        }]
    }

    async fn execute(&self, name: &str, _arguments: &serde_json::Value) -> String {
        format!("{name}-result")
    }
}

/// An [`EventSink`] that collects every emitted envelope.
pub fn collecting_sink() -> (EventSink, Arc<Mutex<Vec<EventEnvelope>>>) {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let target = Arc::clone(&collected);
    let sink: EventSink = Arc::new(move |envelope| target.lock().unwrap().push(envelope));
    (sink, collected)
}
