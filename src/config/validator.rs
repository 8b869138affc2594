use secrecy::ExposeSecret;
use thiserror::Error;

use crate::agents::config::{AgentSettings, MemoryStrategy};
use crate::config::{BloodhoundSettings, ServerSettings, Settings, ToolSettings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        Self::validate_bloodhound(&settings.bloodhound, &mut errors);
        Self::validate_server(&settings.server, &mut errors);
        Self::validate_tools(&settings.tools, &mut errors);
        Self::validate_agent(&settings.agent, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_bloodhound(bh: &BloodhoundSettings, errors: &mut Vec<ValidationError>) {
        if bh.domain.trim().is_empty() {
            errors.push(ValidationError::MissingField(
                "bloodhound.domain (or BLOODHOUND_DOMAIN)".to_string(),
            ));
        } else if bh.domain.contains("://") || bh.domain.contains('/') {
            errors.push(ValidationError::invalid(
                "bloodhound.domain",
                "expected a host name without scheme or path",
            ));
        }

        if !matches!(bh.scheme.as_str(), "http" | "https") {
            errors.push(ValidationError::invalid(
                "bloodhound.scheme",
                format!("'{}' is not http or https", bh.scheme),
            ));
        }

        if bh.port == 0 {
            errors.push(ValidationError::invalid(
                "bloodhound.port",
                "Port must be greater than 0",
            ));
        }

        if bh.token_id.trim().is_empty() {
            errors.push(ValidationError::MissingField(
                "bloodhound.token_id (or BLOODHOUND_TOKEN_ID)".to_string(),
            ));
        }
        if bh.token_key.expose_secret().trim().is_empty() {
            errors.push(ValidationError::MissingField(
                "bloodhound.token_key (or BLOODHOUND_TOKEN_KEY)".to_string(),
            ));
        }

        if bh.request_timeout_secs == 0 {
            errors.push(ValidationError::invalid(
                "bloodhound.request_timeout_secs",
                "must be greater than 0",
            ));
        }
        if bh.max_retries > 10 {
            errors.push(ValidationError::invalid(
                "bloodhound.max_retries",
                "must be at most 10",
            ));
        }
        if bh.retry_initial_backoff_ms > bh.retry_max_backoff_ms {
            errors.push(ValidationError::invalid(
                "bloodhound.retry_initial_backoff_ms",
                "must not exceed retry_max_backoff_ms",
            ));
        }
        if bh.page_size == 0 {
            errors.push(ValidationError::invalid(
                "bloodhound.page_size",
                "must be greater than 0",
            ));
        }
        if bh.max_query_result_bytes == 0 {
            errors.push(ValidationError::invalid(
                "bloodhound.max_query_result_bytes",
                "must be greater than 0",
            ));
        }
    }

    fn validate_server(server: &ServerSettings, errors: &mut Vec<ValidationError>) {
        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::invalid(
                "server.port",
                "Port must be greater than 0",
            ));
        }
    }

    fn validate_tools(tools: &ToolSettings, errors: &mut Vec<ValidationError>) {
        for (field, secs) in [
            ("tools.lookup_timeout_secs", tools.lookup_timeout_secs),
            ("tools.listing_timeout_secs", tools.listing_timeout_secs),
            ("tools.raw_query_timeout_secs", tools.raw_query_timeout_secs),
        ] {
            if secs == 0 {
                errors.push(ValidationError::invalid(field, "must be greater than 0"));
            }
        }
    }

    fn validate_agent(agent: &AgentSettings, errors: &mut Vec<ValidationError>) {
        if !(agent.ollama_url.starts_with("http://") || agent.ollama_url.starts_with("https://")) {
            errors.push(ValidationError::invalid(
                "agent.ollama_url",
                "must start with http:// or https://",
            ));
        }
        if agent.max_turns == 0 {
            errors.push(ValidationError::invalid(
                "agent.max_turns",
                "must be at least 1",
            ));
        }
        if agent.max_duration_secs == 0 {
            errors.push(ValidationError::invalid(
                "agent.max_duration_secs",
                "must be greater than 0",
            ));
        }
        if agent.memory.max_messages < 2 {
            errors.push(ValidationError::invalid(
                "agent.memory.max_messages",
                "must keep at least 2 messages",
            ));
        }
        if agent.model_timeouts.families.keys().any(|k| k.trim().is_empty()) {
            errors.push(ValidationError::invalid(
                "agent.model_timeouts.families",
                "model family names must not be empty",
            ));
        }
        if agent.model_timeouts.default_secs == 0
            || agent.model_timeouts.families.values().any(|secs| *secs == 0)
        {
            errors.push(ValidationError::invalid(
                "agent.model_timeouts",
                "timeouts must be greater than 0",
            ));
        }
        match agent.memory.strategy {
            MemoryStrategy::SlidingWindow { size } if size == 0 => {
                errors.push(ValidationError::invalid(
                    "agent.memory.strategy.size",
                    "must be greater than 0",
                ));
            }
            MemoryStrategy::FirstLast { last, .. } if last == 0 => {
                errors.push(ValidationError::invalid(
                    "agent.memory.strategy.last",
                    "must be greater than 0",
                ));
            }
            _ => {}
        }
    }
}
