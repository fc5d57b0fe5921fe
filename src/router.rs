//! Turn routing: session keys, control commands, and the turn pipeline.
//!
//! The router decides where an inbound unit of work belongs (its session
//! key and the channel/chat pair outbound events are tagged with), applies
//! control commands before the engine ever runs, and drives the iteration
//! engine for everything else. System-originated work carries its
//! destination encoded in the chat id as `origin_channel:origin_chat_id`.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::engine::{AgentIterationEngine, EventSink};
use crate::error::ConvoyError;
use crate::session::{spawn_archive, Archiver, Session, SessionStore};
use crate::types::{ChatMessage, EventEnvelope};
use crate::util::preview;

/// Channel name reserved for scheduled/background work.
pub const SYSTEM_CHANNEL: &str = "system";

/// Fallback origin channel when a composite chat id has no colon.
pub const DIRECT_CHANNEL: &str = "cli";

const HELP_TEXT: &str =
    "convoy commands:\n/new - start a new conversation\n/help - show available commands";
const NEW_SESSION_ACK: &str =
    "New conversation started. Previous history is being archived in the background.";
const NO_RESPONSE_FALLBACK: &str = "I've completed processing but have no response to give.";
const BACKGROUND_FALLBACK: &str = "Background task completed.";
const TURN_FAILURE_TEXT: &str =
    "Something went wrong while processing your message. Please try again.";

/// One inbound unit of work.
#[derive(Debug, Clone)]
pub struct InboundTurn {
    pub channel: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl InboundTurn {
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            content: content.into(),
            metadata: Map::new(),
        }
    }

    /// Key under which this conversation's history is persisted.
    pub fn session_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }

    pub fn is_system(&self) -> bool {
        self.channel == SYSTEM_CHANNEL
    }
}

/// The completed turn, addressed to its outbound surface.
#[derive(Debug, Clone)]
pub struct OutboundTurn {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl OutboundTurn {
    fn new(channel: &str, chat_id: &str, content: impl Into<String>) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            content: content.into(),
            metadata: Map::new(),
        }
    }

    fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// The terminal `message` envelope for this turn.
    ///
    /// Inbound metadata rides along; `event_type` and `channel` always
    /// reflect this envelope, not whatever the caller sent.
    pub fn to_envelope(&self) -> EventEnvelope {
        let mut envelope = EventEnvelope::message(&self.chat_id, &self.content);
        for (key, value) in &self.metadata {
            envelope.metadata.insert(key.clone(), value.clone());
        }
        envelope
            .with_meta("event_type", "message")
            .with_meta("channel", self.channel.clone())
    }
}

/// Routes inbound work through commands, archival, and the engine.
pub struct TurnRouter {
    engine: AgentIterationEngine,
    store: Arc<dyn SessionStore>,
    archiver: Arc<dyn Archiver>,
    memory_window: usize,
    events: EventSink,
}

impl TurnRouter {
    pub fn new(
        engine: AgentIterationEngine,
        store: Arc<dyn SessionStore>,
        archiver: Arc<dyn Archiver>,
        memory_window: usize,
        events: EventSink,
    ) -> Self {
        Self {
            engine,
            store,
            archiver,
            memory_window,
            events,
        }
    }

    /// Split a composite `origin_channel:origin_chat_id` on the first colon;
    /// a colon-less id belongs to the direct channel.
    pub fn resolve_origin(chat_id: &str) -> (String, String) {
        match chat_id.split_once(':') {
            Some((channel, id)) => (channel.to_string(), id.to_string()),
            None => (DIRECT_CHANNEL.to_string(), chat_id.to_string()),
        }
    }

    /// Drive one full turn. Always produces an outbound turn; failures
    /// inside the pipeline surface as a fixed user-visible message.
    pub async fn route(&self, inbound: InboundTurn) -> OutboundTurn {
        if inbound.is_system() {
            self.process_system_turn(inbound).await
        } else {
            self.process_user_turn(inbound).await
        }
    }

    async fn process_user_turn(&self, inbound: InboundTurn) -> OutboundTurn {
        tracing::info!(
            channel = %inbound.channel,
            sender = %inbound.sender_id,
            content = %preview(&inbound.content, 80),
            "processing message"
        );

        let key = inbound.session_key();
        let mut session = self.store.get_or_create(&key).await;

        match inbound.content.trim().to_lowercase().as_str() {
            "/new" => return self.start_new_session(&inbound, session).await,
            "/help" => {
                return OutboundTurn::new(&inbound.channel, &inbound.chat_id, HELP_TEXT);
            }
            _ => {}
        }

        if session.messages.len() > self.memory_window {
            spawn_archive(self.archiver.clone(), session.clone());
        }

        let context = self.build_context(&session, &inbound.content, &inbound.channel, &inbound.chat_id);
        let outcome = match self
            .engine
            .run_turn(&inbound.chat_id, context, &self.events)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return self.failed_turn(&inbound.channel, &inbound.chat_id, err),
        };

        let exhausted = outcome.is_exhausted();
        let final_content = outcome
            .final_content
            .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string());

        tracing::info!(
            channel = %inbound.channel,
            sender = %inbound.sender_id,
            content = %preview(&final_content, 120),
            "response"
        );

        session.add_message("user", &inbound.content, None);
        session.add_message(
            "assistant",
            &final_content,
            (!outcome.tools_used.is_empty()).then(|| outcome.tools_used.clone()),
        );
        if let Err(err) = self.store.save(&session).await {
            tracing::warn!(session_key = %key, error = %err, "failed to save session");
        }

        let mut metadata = inbound.metadata.clone();
        if exhausted {
            metadata.insert("exhausted".into(), Value::Bool(true));
        }
        OutboundTurn::new(&inbound.channel, &inbound.chat_id, final_content).with_metadata(metadata)
    }

    async fn process_system_turn(&self, inbound: InboundTurn) -> OutboundTurn {
        tracing::info!(sender = %inbound.sender_id, "processing system message");

        let (origin_channel, origin_chat_id) = Self::resolve_origin(&inbound.chat_id);
        let key = format!("{origin_channel}:{origin_chat_id}");
        let mut session = self.store.get_or_create(&key).await;

        let context =
            self.build_context(&session, &inbound.content, &origin_channel, &origin_chat_id);
        let outcome = match self
            .engine
            .run_turn(&origin_chat_id, context, &self.events)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return self.failed_turn(&origin_channel, &origin_chat_id, err),
        };

        let exhausted = outcome.is_exhausted();
        let final_content = outcome
            .final_content
            .unwrap_or_else(|| BACKGROUND_FALLBACK.to_string());

        session.add_message(
            "user",
            format!("[System: {}] {}", inbound.sender_id, inbound.content),
            None,
        );
        session.add_message("assistant", &final_content, None);
        if let Err(err) = self.store.save(&session).await {
            tracing::warn!(session_key = %key, error = %err, "failed to save session");
        }

        let mut metadata = Map::new();
        if exhausted {
            metadata.insert("exhausted".into(), Value::Bool(true));
        }
        OutboundTurn::new(&origin_channel, &origin_chat_id, final_content).with_metadata(metadata)
    }

    /// `/new`: reset the session and archive the old history detached.
    /// The acknowledgement never waits on (or observes) the archival task.
    async fn start_new_session(&self, inbound: &InboundTurn, mut session: Session) -> OutboundTurn {
        let mut archived = Session::new(session.key.clone());
        archived.messages = std::mem::take(&mut session.messages);

        if let Err(err) = self.store.save(&session).await {
            tracing::warn!(session_key = %session.key, error = %err, "failed to save reset session");
        }
        self.store.invalidate(&session.key).await;
        spawn_archive(self.archiver.clone(), archived);

        OutboundTurn::new(&inbound.channel, &inbound.chat_id, NEW_SESSION_ACK)
    }

    fn failed_turn(&self, channel: &str, chat_id: &str, err: ConvoyError) -> OutboundTurn {
        tracing::error!(channel, chat_id, error = %err, "turn failed");
        let mut metadata = Map::new();
        metadata.insert("error".into(), Value::Bool(true));
        OutboundTurn::new(channel, chat_id, TURN_FAILURE_TEXT).with_metadata(metadata)
    }

    /// Assemble the model context: system prompt, history window, current
    /// message.
    fn build_context(
        &self,
        session: &Session,
        content: &str,
        channel: &str,
        chat_id: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(format!(
            "You are convoy, an agent assistant. You are talking on the '{channel}' channel \
             (conversation '{chat_id}'). Use the available tools when they help."
        ))];
        for stored in session.get_history(self.memory_window) {
            match stored.role.as_str() {
                "user" => messages.push(ChatMessage::user(&stored.content)),
                "assistant" => messages.push(ChatMessage::assistant(&stored.content)),
                _ => {}
            }
        }
        messages.push(ChatMessage::user(content));
        messages
    }
}
