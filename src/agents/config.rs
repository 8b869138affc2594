//! Configuration types for the local agent

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the interactive agent and its Ollama backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSettings {
    /// Base URL of the Ollama server
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    /// Model name; when unset the user is asked to pick one at startup
    #[serde(default)]
    pub model: Option<String>,
    /// Model round-trips allowed per user turn
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Wall-clock limit for one user turn, in seconds
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,
    /// Sampling temperature passed to the model
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Replaces the built-in system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub model_timeouts: ModelTimeouts,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            model: None,
            max_turns: default_max_turns(),
            max_duration_secs: default_max_duration(),
            temperature: None,
            system_prompt: None,
            memory: MemoryConfig::default(),
            model_timeouts: ModelTimeouts::default(),
        }
    }
}

impl AgentSettings {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_max_turns() -> u32 {
    8
}

fn default_max_duration() -> u64 {
    600
}

/// Conversation retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Memory management strategy
    #[serde(default)]
    pub strategy: MemoryStrategy,
    /// Maximum number of messages to retain
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            strategy: MemoryStrategy::Full,
            max_messages: default_max_messages(),
        }
    }
}

fn default_max_messages() -> usize {
    60
}

/// Memory management strategies
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryStrategy {
    /// Keep all messages (up to max_messages limit)
    #[default]
    Full,
    /// Sliding window of most recent messages
    SlidingWindow {
        /// Number of messages to keep
        size: usize,
    },
    /// Keep first N messages + last M messages
    FirstLast {
        /// Number of initial messages to keep
        first: usize,
        /// Number of recent messages to keep
        last: usize,
    },
}

/// Per-model request timeouts for the Ollama backend.
///
/// Keys are model family fragments matched case-insensitively against the
/// model name; the longest matching fragment wins.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelTimeouts {
    #[serde(default = "default_model_timeout")]
    pub default_secs: u64,
    #[serde(default = "default_family_timeouts")]
    pub families: BTreeMap<String, u64>,
}

impl Default for ModelTimeouts {
    fn default() -> Self {
        Self {
            default_secs: default_model_timeout(),
            families: default_family_timeouts(),
        }
    }
}

impl ModelTimeouts {
    pub fn for_model(&self, model: &str) -> Duration {
        let model = model.to_lowercase();
        let secs = self
            .families
            .iter()
            .filter(|(family, _)| model.contains(family.to_lowercase().as_str()))
            .max_by_key(|(family, _)| family.len())
            .map(|(_, secs)| *secs)
            .unwrap_or(self.default_secs);
        Duration::from_secs(secs)
    }
}

fn default_model_timeout() -> u64 {
    120
}

fn default_family_timeouts() -> BTreeMap<String, u64> {
    // reasoning models think out loud before answering
    [
        ("deepseek", 180),
        ("llama", 90),
        ("codellama", 90),
        ("mistral", 90),
        ("qwen", 90),
    ]
    .into_iter()
    .map(|(family, secs)| (family.to_string(), secs))
    .collect()
}
