//! Tool call types for agent interactions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Tool, ToolErrorKind, ToolInvocation, ToolResult};

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Generate a unique ID for a tool call
    pub fn generate_id() -> String {
        format!("call_{}", &uuid::Uuid::new_v4().simple().to_string()[..24])
    }

    pub fn to_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(self.name.clone(), self.arguments.clone())
    }
}

/// A finished tool call, as reported to the user
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
    pub execution_time_ms: u64,
}

impl ToolCallRecord {
    pub fn new(call: &ToolCall, result: &ToolResult) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success: result.is_success(),
            error_kind: result.error_kind(),
            execution_time_ms: result.elapsed_ms,
        }
    }
}

/// Definition of a tool offered to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments
    pub parameters: Value,
}

impl From<Tool> for ToolDefinition {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            parameters: tool.input_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ToolCall::generate_id();
        let b = ToolCall::generate_id();
        assert!(a.starts_with("call_"));
        assert_eq!(a.len(), 29);
        assert_ne!(a, b);
    }
}
