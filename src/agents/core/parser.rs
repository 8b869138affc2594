//! Tool-call intents written as text.
//!
//! Models without native tool calling are asked to answer with a JSON object
//! naming a tool. Accepted shapes, bare or inside a ```json fence:
//!
//! ```text
//! {"tool": "get_domains", "arguments": {}}
//! {"name": "get_domains", "arguments": {}}          // also "parameters"
//! {"action": "call_tool", "tool": "get_domains", "input": {}}
//! {"action": "final", "response": "..."}
//! [ {...}, {...} ]                                  // several calls in order
//! ```

use serde_json::{Map, Value};

use crate::agents::domain::ToolCall;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelIntent {
    /// Plain answer text
    Final(String),
    ToolCalls(Vec<ToolCall>),
}

/// Classify a text reply as a final answer or tool calls.
pub fn parse_intent(content: &str) -> ModelIntent {
    let Some(value) = extract_json(content) else {
        return ModelIntent::Final(content.trim().to_string());
    };

    match value {
        Value::Object(map) => match parse_object(&map) {
            Some(intent) => intent,
            None => ModelIntent::Final(content.trim().to_string()),
        },
        Value::Array(items) => {
            let calls: Option<Vec<ToolCall>> = items
                .iter()
                .map(|item| match item.as_object().and_then(parse_object) {
                    Some(ModelIntent::ToolCalls(mut calls)) if calls.len() == 1 => calls.pop(),
                    _ => None,
                })
                .collect();
            match calls {
                Some(calls) if !calls.is_empty() => ModelIntent::ToolCalls(calls),
                _ => ModelIntent::Final(content.trim().to_string()),
            }
        }
        _ => ModelIntent::Final(content.trim().to_string()),
    }
}

fn parse_object(map: &Map<String, Value>) -> Option<ModelIntent> {
    match map.get("action").and_then(Value::as_str) {
        Some("final") => {
            let response = map.get("response").and_then(Value::as_str)?;
            return Some(ModelIntent::Final(response.to_string()));
        }
        Some("call_tool") | None => {}
        Some(_) => return None,
    }

    let name = map
        .get("tool")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)?;
    let arguments = ["arguments", "input", "parameters"]
        .iter()
        .find_map(|key| map.get(*key))
        .cloned();

    // a bare {"name": ...} is just as likely to be data as a call
    if map.get("action").is_none() && arguments.is_none() {
        return None;
    }

    let arguments = match arguments {
        Some(Value::String(raw)) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(other) => other,
    };
    Some(ModelIntent::ToolCalls(vec![ToolCall::new(
        ToolCall::generate_id(),
        name,
        arguments,
    )]))
}

fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(start) = trimmed.find("```") {
        let fenced = &trimmed[start + 3..];
        let fenced = fenced
            .strip_prefix("json")
            .or_else(|| fenced.strip_prefix("JSON"))
            .unwrap_or(fenced);
        if let Some(end) = fenced.find("```") {
            if let Ok(value) = serde_json::from_str::<Value>(fenced[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}
