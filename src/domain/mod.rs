use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod tool;

pub use tool::{
    ParamSpec, ParamType, ToolClass, ToolErrorKind, ToolFailure, ToolHandler, ToolInvocation,
    ToolResult, ToolStatus,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Option<Vec<PromptArgument>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GetPromptResult {
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PromptMessage {
    pub role: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResourceReadResult {
    pub uri: String,
    pub mime_type: Option<String>,
    pub content: String,
}

#[async_trait]
pub trait ResourcePort: Send + Sync {
    async fn get_resource(&self, uri: &str) -> anyhow::Result<ResourceReadResult>;
    async fn list_resources(&self) -> anyhow::Result<Vec<Resource>>;
}

/// Entry point for tool execution, shared by the MCP surface and the agent.
#[async_trait]
pub trait ToolPort: Send + Sync {
    /// Run one invocation to completion. Never fails: every outcome,
    /// including unknown tools and bad arguments, is a [`ToolResult`].
    async fn invoke(&self, invocation: ToolInvocation) -> ToolResult;
    fn list_tools(&self) -> Vec<Tool>;
}

#[async_trait]
pub trait PromptPort: Send + Sync {
    async fn get_prompt(&self, name: &str, arguments: Option<Value>) -> anyhow::Result<GetPromptResult>;
    async fn list_prompts(&self) -> anyhow::Result<Vec<Prompt>>;
}
