//! Convenience re-exports for common use.

pub use crate::bus::{ConversationBus, Subscription, WILDCARD};
pub use crate::config::{ConvoyConfig, ModelSettings};
pub use crate::engine::{
    bus_sink, null_sink, AgentIterationEngine, EventSink, TurnCompletion, TurnOutcome,
};
pub use crate::error::{ConvoyError, Result};
pub use crate::provider::{DecisionProvider, StaticDecisionProvider, ToolDefinition};
pub use crate::router::{InboundTurn, OutboundTurn, TurnRouter};
pub use crate::session::{Archiver, LogArchiver, MemoryStore, Session, SessionStore};
pub use crate::tools::{FnTool, Tool, ToolDispatcher, ToolRegistry};
pub use crate::types::{
    ChatMessage, EventEnvelope, EventKind, ModelDecision, Role, ToolCallRequest,
};
