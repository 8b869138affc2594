//! Layered configuration: defaults, then `bloodhound-mcp.toml`, then
//! environment variables and command-line flags (via [`Cli`]).

use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use secrecy::SecretString;
use serde::Deserialize;

pub mod validator;

use crate::agents::config::AgentSettings;
use crate::bloodhound::Credential;
use crate::cli::{Cli, Command};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bloodhound: BloodhoundSettings,
    pub server: ServerSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Connection and credential settings for the BloodHound CE instance
#[derive(Debug, Clone, Deserialize)]
pub struct BloodhoundSettings {
    /// Host name only, e.g. `bloodhound.corp.local`
    pub domain: String,
    pub port: u16,
    pub scheme: String,
    pub token_id: String,
    pub token_key: SecretString,
    pub request_timeout_secs: u64,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    pub retry_initial_backoff_ms: u64,
    pub retry_max_backoff_ms: u64,
    /// Items per request when a listing spans several pages
    pub page_size: u32,
    /// Raw query results above this many bytes are refused
    pub max_query_result_bytes: usize,
}

impl Default for BloodhoundSettings {
    fn default() -> Self {
        Self {
            domain: String::new(),
            port: 443,
            scheme: "https".to_string(),
            token_id: String::new(),
            token_key: SecretString::new(String::new().into()),
            request_timeout_secs: 30,
            max_retries: 2,
            retry_initial_backoff_ms: 250,
            retry_max_backoff_ms: 10_000,
            page_size: 100,
            max_query_result_bytes: 1_000_000,
        }
    }
}

impl BloodhoundSettings {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.domain, self.port)
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.token_id.clone(), self.token_key.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Execution timeouts per tool class, in seconds
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
    #[serde(default = "default_listing_timeout")]
    pub listing_timeout_secs: u64,
    #[serde(default = "default_raw_query_timeout")]
    pub raw_query_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: default_lookup_timeout(),
            listing_timeout_secs: default_listing_timeout(),
            raw_query_timeout_secs: default_raw_query_timeout(),
        }
    }
}

impl ToolSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn raw_query_timeout(&self) -> Duration {
        Duration::from_secs(self.raw_query_timeout_secs)
    }
}

fn default_lookup_timeout() -> u64 {
    30
}

fn default_listing_timeout() -> u64 {
    60
}

fn default_raw_query_timeout() -> u64 {
    180
}

impl Settings {
    /// Load settings for a command-line invocation.
    ///
    /// Precedence is flags, then environment, then the config file, then
    /// built-in defaults. The result is validated before it is returned.
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load_file(&cli.config)?;
        settings.apply_cli_overrides(cli);
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a single file.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let settings = Self::load_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load_file(path: &Path) -> Result<Self, anyhow::Error> {
        let defaults = BloodhoundSettings::default();
        let s = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("bloodhound.domain", defaults.domain)?
            .set_default("bloodhound.port", i64::from(defaults.port))?
            .set_default("bloodhound.scheme", defaults.scheme)?
            .set_default("bloodhound.token_id", defaults.token_id)?
            .set_default("bloodhound.token_key", "")?
            .set_default("bloodhound.request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("bloodhound.max_retries", i64::from(defaults.max_retries))?
            .set_default("bloodhound.retry_initial_backoff_ms", defaults.retry_initial_backoff_ms as i64)?
            .set_default("bloodhound.retry_max_backoff_ms", defaults.retry_max_backoff_ms as i64)?
            .set_default("bloodhound.page_size", i64::from(defaults.page_size))?
            .set_default("bloodhound.max_query_result_bytes", defaults.max_query_result_bytes as i64)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(domain) = &cli.domain {
            self.bloodhound.domain = domain.clone();
        }
        if let Some(port) = cli.bh_port {
            self.bloodhound.port = port;
        }
        if let Some(scheme) = &cli.scheme {
            self.bloodhound.scheme = scheme.clone();
        }
        if let Some(token_id) = &cli.token_id {
            self.bloodhound.token_id = token_id.clone();
        }
        if let Some(token_key) = &cli.token_key {
            self.bloodhound.token_key = SecretString::new(token_key.clone().into());
        }

        if let Some(url) = &cli.ollama_url {
            self.agent.ollama_url = url.clone();
        }
        if let Some(model) = &cli.model {
            self.agent.model = Some(model.clone());
        }

        if let Some(Command::Serve { host, port, .. }) = &cli.command {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }
}
