//! Built-in demo tools.
//!
//! Small, dependency-free tools so the gateway exercises the full
//! tool-call event path out of the box. Each is constructed as an
//! `Arc<dyn Tool>`, ready for a [`ToolRegistry`](super::ToolRegistry).

use std::sync::Arc;

use serde_json::Value;

use super::{arg_str, FnTool, Tool};

/// Create the `echo` tool — returns its `text` argument unchanged.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "echo",
        "Echo the given text back",
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to echo"}
            },
            "required": ["text"],
        }),
        |args| async move {
            let text = arg_str(&args, "text")?;
            Ok(Value::String(text.to_string()))
        },
    ))
}

/// Create the `current_time` tool — returns the current UTC time (RFC 3339).
pub fn current_time_tool() -> Arc<dyn Tool> {
    Arc::new(FnTool::new(
        "current_time",
        "Get the current UTC time",
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": [],
        }),
        |_args| async move { Ok(Value::String(chrono::Utc::now().to_rfc3339())) },
    ))
}

/// All built-in tools.
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![echo_tool(), current_time_tool()]
}
