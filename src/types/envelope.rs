//! Event envelopes moved through the conversation bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind tag for a streamed event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Thinking,
    ToolCall,
    ToolResult,
    Message,
}

impl EventKind {
    /// Wire name of the kind, as echoed into envelope metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Thinking => "thinking",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::Message => "message",
        }
    }
}

/// One unit of streamed event data.
///
/// Envelopes are immutable once constructed; the bus clones them per sink,
/// so no subscriber ever observes another's mutations. Serialization matches
/// the wire record: `event_type`, `content`, `metadata`, `timestamp`,
/// `conversation_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
}

impl EventEnvelope {
    /// Create an envelope of the given kind.
    ///
    /// The kind is echoed into metadata under `event_type` so consumers that
    /// only look at metadata (the original wire contract) keep working.
    pub fn new(conversation_id: impl Into<String>, kind: EventKind, content: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("event_type".into(), Value::String(kind.as_str().into()));
        Self {
            kind,
            content: content.into(),
            metadata,
            timestamp: Utc::now(),
            conversation_id: conversation_id.into(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Synthetic first event of every stream subscription.
    pub fn connected(conversation_id: impl Into<String>) -> Self {
        let conversation_id = conversation_id.into();
        Self::new(conversation_id.clone(), EventKind::Connected, "")
            .with_meta("conversation_id", conversation_id)
    }

    /// Announce that an iteration is about to request a decision.
    pub fn thinking(conversation_id: impl Into<String>, iteration: usize) -> Self {
        Self::new(conversation_id, EventKind::Thinking, "").with_meta("iteration", iteration)
    }

    /// Auxiliary reasoning content surfaced by the decision step.
    pub fn reasoning(conversation_id: impl Into<String>, iteration: usize, text: impl Into<String>) -> Self {
        Self::new(conversation_id, EventKind::Thinking, text)
            .with_meta("is_reasoning", true)
            .with_meta("iteration", iteration)
    }

    /// A tool invocation is starting.
    pub fn tool_call(
        conversation_id: impl Into<String>,
        iteration: usize,
        tool: impl Into<String>,
        tool_call_id: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self::new(conversation_id, EventKind::ToolCall, "")
            .with_meta("tool", tool.into())
            .with_meta("arguments", arguments)
            .with_meta("tool_call_id", tool_call_id.into())
            .with_meta("iteration", iteration)
    }

    /// A tool invocation finished; `content` is the stringified result.
    pub fn tool_result(
        conversation_id: impl Into<String>,
        iteration: usize,
        tool: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(conversation_id, EventKind::ToolResult, content)
            .with_meta("tool", tool.into())
            .with_meta("tool_call_id", tool_call_id.into())
            .with_meta("iteration", iteration)
    }

    /// Terminal message of a turn.
    pub fn message(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(conversation_id, EventKind::Message, content)
    }
}
