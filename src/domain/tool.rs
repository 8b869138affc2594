//! Tool invocation types shared by the router, the MCP surface and the agent

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::bloodhound::{ApiError, ApiErrorKind};

/// JSON type of a tool parameter. Closed so every schema can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    /// Whether `value` is acceptable for this type.
    ///
    /// Integral floats such as `100.0` count as integers; models emit them.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0 && f.is_finite())
            }
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
    /// Filled in when an optional parameter is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Lower bound for integer parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            description: description.to_string(),
            default: None,
            minimum: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn at_least(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Whether a value of the right type also respects the declared bounds
    pub fn in_range(&self, value: &Value) -> bool {
        match (self.minimum, value.as_f64()) {
            (Some(min), Some(n)) => n >= min as f64,
            _ => true,
        }
    }
}

/// Cost class of a tool; selects its execution timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolClass {
    /// Single-object reads
    Lookup,
    /// Paged listings and graph searches
    Listing,
    /// Free-form graph queries
    RawQuery,
}

/// Executes one tool against validated arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: &Map<String, Value>) -> Result<Value, ApiError>;
}

/// A request to run a named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Failure,
}

/// Why a tool invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    Timeout,
    Panicked,
    AuthFailure,
    NotFound,
    Transient,
    Unreachable,
    BadRequest,
    ResultTooLarge,
    Decode,
}

impl From<ApiErrorKind> for ToolErrorKind {
    fn from(kind: ApiErrorKind) -> Self {
        match kind {
            ApiErrorKind::AuthFailure => ToolErrorKind::AuthFailure,
            ApiErrorKind::NotFound => ToolErrorKind::NotFound,
            ApiErrorKind::Transient => ToolErrorKind::Transient,
            ApiErrorKind::Unreachable => ToolErrorKind::Unreachable,
            ApiErrorKind::BadRequest => ToolErrorKind::BadRequest,
            ApiErrorKind::ResultTooLarge => ToolErrorKind::ResultTooLarge,
            ApiErrorKind::Decode => ToolErrorKind::Decode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

/// Outcome of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub tool: String,
    pub status: ToolStatus,
    /// Handler output on success, an error object on failure
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
    pub elapsed_ms: u64,
}

impl ToolResult {
    pub fn success(tool: impl Into<String>, payload: Value, elapsed_ms: u64) -> Self {
        Self {
            tool: tool.into(),
            status: ToolStatus::Success,
            payload,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(
        tool: impl Into<String>,
        kind: ToolErrorKind,
        message: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        let message = message.into();
        Self {
            tool: tool.into(),
            status: ToolStatus::Failure,
            payload: json!({ "error": message, "kind": kind }),
            error: Some(ToolFailure { kind, message }),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// The payload as compact JSON text, as handed to MCP clients and models.
    pub fn to_text(&self) -> String {
        self.payload.to_string()
    }
}
