//! Tool system: the execution boundary of the iteration loop.

pub mod builtin;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ConvoyError, Result};
use crate::provider::ToolDefinition;

/// Core tool trait — implement to expose a capability to the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments.
    fn parameters(&self) -> &Value;

    /// Execute with raw JSON arguments.
    async fn execute(&self, arguments: &Value) -> Result<Value>;
}

type ToolHandler =
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync;

/// Closure-based tool for quick construction.
pub struct FnTool {
    name: String,
    description: String,
    parameters: Value,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &Value {
        &self.parameters
    }

    async fn execute(&self, arguments: &Value) -> Result<Value> {
        (self.handler)(arguments.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}

/// The tool-execution collaborator seen by the iteration engine.
///
/// `execute` is infallible by contract: failures come back as the result
/// text so the loop can continue and let the model react.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Definitions advertised to the decision step.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute a tool by name, stringifying success and failure alike.
    async fn execute(&self, name: &str, arguments: &Value) -> String;
}

/// Name-keyed registry of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut registry = Self::default();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool; later registrations shadow earlier ones by name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters().clone(),
            })
            .collect()
    }

    async fn execute(&self, name: &str, arguments: &Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("Error: unknown tool '{name}'");
        };
        match tool.execute(arguments).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(err) => {
                tracing::warn!(tool = name, error = %err, "tool execution failed");
                format!("Error: {err}")
            }
        }
    }
}

/// Helper for tools reading string arguments.
pub fn arg_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ConvoyError::InvalidState(format!("missing string argument '{key}'")))
}
