use crate::domain::{GetPromptResult, Prompt, PromptMessage, PromptPort};
use async_trait::async_trait;
use serde_json::Value;

pub const ASSISTANT_PROMPT_NAME: &str = "bloodhound_assistant";

/// System prompt for a BloodHound analyst; also seeds the local agent.
pub const ASSISTANT_PROMPT: &str = include_str!("../../assets/assistant_prompt.md");

pub struct AssistantPromptHandler;

#[async_trait]
impl PromptPort for AssistantPromptHandler {
    async fn get_prompt(&self, name: &str, _arguments: Option<Value>) -> anyhow::Result<GetPromptResult> {
        if name != ASSISTANT_PROMPT_NAME {
            return Err(anyhow::anyhow!("Prompt not found: {}", name));
        }
        Ok(GetPromptResult {
            description: Some("Analyst instructions for working with BloodHound data".to_string()),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                text: ASSISTANT_PROMPT.to_string(),
            }],
        })
    }

    async fn list_prompts(&self) -> anyhow::Result<Vec<Prompt>> {
        Ok(vec![Prompt {
            name: ASSISTANT_PROMPT_NAME.to_string(),
            description: "Analyst instructions for working with BloodHound data".to_string(),
            arguments: None,
        }])
    }
}
