//! Tool router: validates invocations against the catalog and runs handlers
//! under a per-class timeout.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::catalog::{ToolCatalog, ToolDescriptor};
use crate::bloodhound::ApiError;
use crate::config::ToolSettings;
use crate::domain::{Tool, ToolClass, ToolErrorKind, ToolInvocation, ToolPort, ToolResult};

/// Longest string argument value written to logs
const LOGGED_VALUE_MAX: usize = 200;

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument '{field}': {reason}")]
    InvalidArguments { field: String, reason: String },

    #[error("Tool '{tool}' did not finish within {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Tool '{tool}' failed unexpectedly: {message}")]
    Panicked { tool: String, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl InvocationError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            InvocationError::UnknownTool(_) => ToolErrorKind::UnknownTool,
            InvocationError::InvalidArguments { .. } => ToolErrorKind::InvalidArguments,
            InvocationError::Timeout { .. } => ToolErrorKind::Timeout,
            InvocationError::Panicked { .. } => ToolErrorKind::Panicked,
            InvocationError::Api(err) => err.kind.into(),
        }
    }

    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        InvocationError::InvalidArguments {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Execution limits per [`ToolClass`]
#[derive(Debug, Clone, Copy)]
pub struct ToolTimeouts {
    pub lookup: Duration,
    pub listing: Duration,
    pub raw_query: Duration,
}

impl ToolTimeouts {
    pub fn for_class(&self, class: ToolClass) -> Duration {
        match class {
            ToolClass::Lookup => self.lookup,
            ToolClass::Listing => self.listing,
            ToolClass::RawQuery => self.raw_query,
        }
    }
}

impl From<&ToolSettings> for ToolTimeouts {
    fn from(settings: &ToolSettings) -> Self {
        Self {
            lookup: settings.lookup_timeout(),
            listing: settings.listing_timeout(),
            raw_query: settings.raw_query_timeout(),
        }
    }
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self::from(&ToolSettings::default())
    }
}

pub struct ToolRouter {
    catalog: Arc<ToolCatalog>,
    timeouts: ToolTimeouts,
}

impl ToolRouter {
    pub fn new(catalog: Arc<ToolCatalog>, timeouts: ToolTimeouts) -> Self {
        Self { catalog, timeouts }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<Value, InvocationError> {
        let descriptor = self
            .catalog
            .lookup(&invocation.name)
            .map_err(|_| InvocationError::UnknownTool(invocation.name.clone()))?;

        let args = validate_arguments(descriptor, &invocation.arguments)?;

        let limit = self.timeouts.for_class(descriptor.class);
        let call = AssertUnwindSafe(descriptor.handler.call(&args)).catch_unwind();

        match tokio::time::timeout(limit, call).await {
            Err(_) => Err(InvocationError::Timeout {
                tool: descriptor.name.clone(),
                secs: limit.as_secs(),
            }),
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!(tool = %descriptor.name, panic = %message, "Tool handler panicked");
                Err(InvocationError::Panicked {
                    tool: descriptor.name.clone(),
                    message,
                })
            }
            Ok(Ok(result)) => Ok(result?),
        }
    }
}

#[async_trait]
impl ToolPort for ToolRouter {
    async fn invoke(&self, invocation: ToolInvocation) -> ToolResult {
        let started = Instant::now();
        debug!(
            tool = %invocation.name,
            arguments = %redact_arguments(&invocation.arguments),
            "Invoking tool"
        );

        let outcome = self.run(&invocation).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                info!(tool = %invocation.name, elapsed_ms, "Tool completed");
                ToolResult::success(invocation.name, payload, elapsed_ms)
            }
            Err(err) => {
                warn!(tool = %invocation.name, elapsed_ms, error = %err, "Tool failed");
                ToolResult::failure(invocation.name, err.kind(), err.to_string(), elapsed_ms)
            }
        }
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.catalog.list().iter().map(|d| d.to_tool()).collect()
    }
}

/// Check `arguments` against the descriptor and fill in defaults.
///
/// Explicit nulls count as omitted. Parameters the tool does not declare are
/// rejected so typos surface instead of being silently ignored.
pub fn validate_arguments(
    descriptor: &ToolDescriptor,
    arguments: &Value,
) -> Result<Map<String, Value>, InvocationError> {
    let supplied = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        _ => return Err(InvocationError::invalid("arguments", "expected a JSON object")),
    };

    let mut validated = Map::new();
    for (name, value) in supplied {
        let spec = descriptor
            .param_spec(&name)
            .ok_or_else(|| InvocationError::invalid(&name, "not a parameter of this tool"))?;
        if value.is_null() {
            continue;
        }
        if !spec.param_type.accepts(&value) {
            return Err(InvocationError::invalid(
                &name,
                format!("expected {}, got {}", spec.param_type, json_type(&value)),
            ));
        }
        if !spec.in_range(&value) {
            let minimum = spec.minimum.unwrap_or_default();
            return Err(InvocationError::invalid(
                &name,
                format!("must be at least {minimum}, got {value}"),
            ));
        }
        validated.insert(name, value);
    }

    for spec in &descriptor.params {
        if validated.contains_key(&spec.name) {
            continue;
        }
        if spec.required {
            return Err(InvocationError::invalid(&spec.name, "required parameter is missing"));
        }
        if let Some(default) = &spec.default {
            validated.insert(spec.name.clone(), default.clone());
        }
    }

    Ok(validated)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Copy of `arguments` safe to log: secret-looking keys are masked and long
/// strings are truncated.
pub fn redact_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let lower = k.to_lowercase();
                    let sensitive = ["key", "token", "secret", "password", "signature"]
                        .iter()
                        .any(|s| lower.contains(s));
                    let v = if sensitive {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        redact_arguments(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::String(s) if s.chars().count() > LOGGED_VALUE_MAX => {
            let head: String = s.chars().take(LOGGED_VALUE_MAX).collect();
            Value::String(format!("{head}..."))
        }
        other => other.clone(),
    }
}
