//! Decision-collaborator boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ModelSettings;
use crate::error::Result;
use crate::types::{ChatMessage, ModelDecision, Role};

/// Tool advertisement passed to the decision step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the arguments.
    pub parameters: Value,
}

/// The model-decision step of the iteration loop.
///
/// Implementations decide, from the current message context and the
/// advertised tools, whether to answer or to request tool invocations.
/// Errors here are fatal to the current turn.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        settings: &ModelSettings,
    ) -> Result<ModelDecision>;
}

/// Canned decision source: always answers directly, echoing the latest
/// user message. Lets the gateway run end-to-end without any network
/// collaborator; swap in a real provider behind the same trait.
#[derive(Debug, Default)]
pub struct StaticDecisionProvider;

#[async_trait]
impl DecisionProvider for StaticDecisionProvider {
    async fn decide(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
        _settings: &ModelSettings,
    ) -> Result<ModelDecision> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(ModelDecision::text(format!("You said: {last_user}")))
    }
}
