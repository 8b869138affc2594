//! Ollama LLM Provider (local models)

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, TokenUsage};
use crate::agents::config::AgentSettings;
use crate::agents::domain::{Message, Role, ToolCall, ToolDefinition};
use crate::agents::error::{LlmError, LlmResult};

/// An installed model as reported by `/api/tags`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
}

/// Ollama LLM Provider
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl OllamaProvider {
    /// Create a provider for `model`, with the request timeout looked up
    /// from the model family table.
    pub fn new(settings: &AgentSettings, model: impl Into<String>) -> LlmResult<Self> {
        let model = model.into();
        let timeout = settings.model_timeouts.for_model(&model);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.ollama_url.trim_end_matches('/').to_string(),
            model,
            temperature: settings.temperature,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                let mut out = json!({
                    "role": m.role.to_string(),
                    "content": m.content,
                });
                if let Some(calls) = &m.tool_calls {
                    out["tool_calls"] = calls
                        .iter()
                        .map(|c| json!({"function": {"name": c.name, "arguments": c.arguments}}))
                        .collect();
                }
                if m.role == Role::Tool {
                    if let Some(name) = &m.name {
                        out["tool_name"] = json!(name);
                    }
                }
                out
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": Self::convert_messages(&request.messages),
            "stream": false,
        });
        if let Some(tools) = request.tools.as_deref().filter(|t| !t.is_empty()) {
            body["tools"] = Value::Array(Self::convert_tools(tools));
        }
        if let Some(temperature) = request.temperature.or(self.temperature) {
            body["options"] = json!({ "temperature": temperature });
        }
        if is_reasoning_model(&self.model) {
            body["think"] = json!(false);
        }
        body
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 && error_text.contains("not found") {
                return Err(LlmError::ModelNotFound(self.model.clone()));
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        let tool_calls: Vec<ToolCall> = ollama_response
            .message
            .tool_calls
            .into_iter()
            .map(|c| {
                let arguments = match c.function.arguments {
                    Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                    other => other,
                };
                ToolCall::new(ToolCall::generate_id(), c.function.name, arguments)
            })
            .collect();

        let content = strip_think(&ollama_response.message.content);
        let finish_reason = if !tool_calls.is_empty() {
            FinishReason::ToolCalls
        } else if ollama_response.done_reason.as_deref() == Some("length") {
            FinishReason::Length
        } else {
            FinishReason::Stop
        };

        let prompt_tokens = ollama_response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = ollama_response.eval_count.unwrap_or(0);
        Ok(CompletionResponse {
            message: Message::assistant_with_tools(content, tool_calls),
            finish_reason,
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }
}

/// Models that emit a reasoning trace unless told not to
fn is_reasoning_model(model: &str) -> bool {
    model.to_ascii_lowercase().contains("deepseek")
}

/// Remove `<think>…</think>` reasoning blocks from model output.
///
/// An unterminated block runs to the end of the text; a stray closing tag
/// (the opening one was consumed by the template) drops everything before it.
pub fn strip_think(content: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut rest = content;
    if !rest.contains(OPEN) {
        if let Some(end) = rest.rfind(CLOSE) {
            rest = &rest[end + CLOSE.len()..];
        }
    }

    let mut out = String::with_capacity(rest.len());
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        match rest[start..].find(CLOSE) {
            Some(end) => rest = &rest[start + end + CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// List the models installed on the Ollama server at `base_url`.
pub async fn installed_models(base_url: &str) -> LlmResult<Vec<OllamaModel>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| LlmError::Network(e.to_string()))?;
    let response = client
        .get(format!("{}/api/tags", base_url.trim_end_matches('/')))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    let tags: TagsResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Parse(format!("Failed to parse model list: {}", e)))?;
    Ok(tags.models)
}

/// Pick the installed model for `requested`: an exact name match, else the
/// first model sharing its base name (`llama3.1` matches `llama3.1:8b`).
pub fn resolve_model(requested: &str, installed: &[OllamaModel]) -> LlmResult<String> {
    if installed.iter().any(|m| m.name == requested) {
        return Ok(requested.to_string());
    }
    let base = requested.split(':').next().unwrap_or(requested);
    installed
        .iter()
        .find(|m| m.name.split(':').next() == Some(base))
        .map(|m| m.name.clone())
        .ok_or_else(|| LlmError::ModelNotFound(requested.to_string()))
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str, model: &str) -> OllamaProvider {
        let settings = AgentSettings {
            ollama_url: uri.to_string(),
            ..AgentSettings::default()
        };
        OllamaProvider::new(&settings, model).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("which domains exist?")],
            tools: Some(vec![ToolDefinition {
                name: "get_domains".into(),
                description: "list domains".into(),
                parameters: json!({"type": "object", "properties": {}}),
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn test_strip_think() {
        assert_eq!(strip_think("<think>hmm</think>\nAnswer"), "Answer");
        assert_eq!(strip_think("a <think>x</think>b<think>y</think> c"), "a b c");
        assert_eq!(strip_think("Answer<think>never closed"), "Answer");
        assert_eq!(strip_think("leaked reasoning</think>Answer"), "Answer");
        assert_eq!(strip_think("plain"), "plain");
    }

    #[test]
    fn test_resolve_model() {
        let installed = vec![
            OllamaModel { name: "llama3.1:8b".into(), size: 0, modified_at: None },
            OllamaModel { name: "deepseek-r1:14b".into(), size: 0, modified_at: None },
        ];
        assert_eq!(resolve_model("llama3.1:8b", &installed).unwrap(), "llama3.1:8b");
        assert_eq!(resolve_model("deepseek-r1", &installed).unwrap(), "deepseek-r1:14b");
        assert_eq!(resolve_model("deepseek-r1:latest", &installed).unwrap(), "deepseek-r1:14b");
        assert!(matches!(
            resolve_model("mistral", &installed),
            Err(LlmError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_timeout_follows_model_family() {
        assert_eq!(provider("http://x", "deepseek-r1:14b").timeout(), Duration::from_secs(180));
        assert_eq!(provider("http://x", "llama3.1:8b").timeout(), Duration::from_secs(90));
        assert_eq!(provider("http://x", "phi3").timeout(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_native_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": false, "tools": [{"type": "function"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{"function": {"name": "get_domains", "arguments": {}}}]
                },
                "done": true,
                "done_reason": "stop"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server.uri(), "llama3.1:8b")
            .complete(request())
            .await
            .unwrap();

        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        let calls = response.message.tool_calls.unwrap();
        assert_eq!(calls[0].name, "get_domains");
        assert!(calls[0].id.starts_with("call_"));
    }

    #[tokio::test]
    async fn test_reasoning_model_hides_thinking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"think": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "<think>plan</think>Two domains."},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server.uri(), "deepseek-r1:14b")
            .complete(request())
            .await
            .unwrap();

        assert_eq!(response.message.content, "Two domains.");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_missing_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "model 'nope' not found"})),
            )
            .mount(&server)
            .await;

        let err = provider(&server.uri(), "nope").complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_backend_unreachable() {
        let err = provider("http://127.0.0.1:9", "llama3")
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
    }

    #[tokio::test]
    async fn test_installed_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "llama3.1:8b", "size": 4920753328u64}]
            })))
            .mount(&server)
            .await;

        let models = installed_models(&server.uri()).await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "llama3.1:8b");
    }
}
