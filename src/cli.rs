use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MCP server and local tool-calling agent for BloodHound Community Edition
#[derive(Parser, Debug, Clone)]
#[command(name = "bloodhound-mcp", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(
        short,
        long,
        env = "BLOODHOUND_MCP_CONFIG",
        default_value = "bloodhound-mcp.toml",
        global = true
    )]
    pub config: PathBuf,

    /// BloodHound host name
    #[arg(long, env = "BLOODHOUND_DOMAIN", global = true)]
    pub domain: Option<String>,

    /// BloodHound API port
    #[arg(long = "bh-port", env = "BLOODHOUND_PORT", global = true)]
    pub bh_port: Option<u16>,

    /// BloodHound URL scheme (http or https)
    #[arg(long, env = "BLOODHOUND_SCHEME", global = true)]
    pub scheme: Option<String>,

    /// BloodHound API token ID
    #[arg(long, env = "BLOODHOUND_TOKEN_ID", hide_env_values = true, global = true)]
    pub token_id: Option<String>,

    /// BloodHound API token key
    #[arg(
        long,
        env = "BLOODHOUND_TOKEN_KEY",
        hide = true,
        hide_env_values = true,
        global = true
    )]
    pub token_key: Option<String>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", global = true)]
    pub ollama_url: Option<String>,

    /// Ollama model (full name or unique prefix)
    #[arg(short, long, env = "OLLAMA_MODEL", global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Expose the BloodHound tools over MCP (stdio unless --http)
    Serve {
        /// Serve streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// HTTP listen address
        #[arg(long, env = "BLOODHOUND_MCP_HOST")]
        host: Option<String>,

        /// HTTP listen port
        #[arg(long, env = "BLOODHOUND_MCP_PORT")]
        port: Option<u16>,
    },
    /// Interactive chat with a local model that can call the tools
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question
        query: String,
    },
    /// List models available on the Ollama server
    Models,
    /// Verify BloodHound connectivity and credentials
    Check,
    /// Print the tool catalog
    Tools,
}

impl Cli {
    /// The subcommand to run; plain `bloodhound-mcp` serves MCP over stdio.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            http: false,
            host: None,
            port: None,
        })
    }
}
