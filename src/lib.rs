//! # bloodhound-mcp
//!
//! Exposes a BloodHound Community Edition instance to language models.
//!
//! ## Features
//!
//! - **MCP server**: every read-only BloodHound lookup as an MCP tool, over
//!   stdio or streamable HTTP, plus Cypher reference resources and an
//!   analyst prompt
//! - **Local agent**: a chat loop against a model served by Ollama that
//!   calls the same tools, bounded by per-turn turn and time budgets
//! - **Signed API client**: HMAC request signing, retry with backoff for
//!   transient failures, lazy pagination and a per-turn response cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bloodhound_mcp::config::Settings;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_file(Path::new("bloodhound-mcp.toml"))?;
//!     let (_client, router) = bloodhound_mcp::build_tool_router(&settings)?;
//!     println!("{} tools", router.catalog().len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: tool, resource and prompt types and the ports over them
//! - **BloodHound**: the signed HTTP client
//! - **Adapters**: the tool catalog, router and MCP server
//! - **Agents**: the Ollama-backed session state machine
//! - **Config**: layered configuration and validation

pub mod adapters;
pub mod agents;
pub mod bloodhound;
pub mod cli;
pub mod config;
pub mod domain;

use crate::adapters::bloodhound_tools::build_catalog;
use crate::adapters::health_handler::HealthHandler;
use crate::adapters::prompt_handler::AssistantPromptHandler;
use crate::adapters::resource_handler::StaticResourceHandler;
use crate::adapters::rmcp_server::BloodhoundServer;
use crate::adapters::tool_handler::{ToolRouter, ToolTimeouts};
use crate::bloodhound::{BloodhoundClient, ClientOptions};
use crate::config::Settings;
use axum::{routing::get, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use std::sync::Arc;

/// Build the API client and a tool router over the full catalog.
pub fn build_tool_router(
    settings: &Settings,
) -> anyhow::Result<(Arc<BloodhoundClient>, Arc<ToolRouter>)> {
    let mut options = ClientOptions::from(&settings.bloodhound);
    options.query_timeout = settings.tools.raw_query_timeout();
    let client = Arc::new(BloodhoundClient::new(settings.bloodhound.credential(), options)?);
    let catalog = build_catalog(client.clone())?;
    tracing::debug!(tools = catalog.len(), "Tool catalog built");
    let router = ToolRouter::new(Arc::new(catalog), ToolTimeouts::from(&settings.tools));
    Ok((client, Arc::new(router)))
}

/// Wrap a tool router with the static resources and prompt into an MCP server.
pub fn build_server(router: Arc<ToolRouter>) -> BloodhoundServer {
    BloodhoundServer::new(
        Arc::new(StaticResourceHandler::new()),
        router,
        Arc::new(AssistantPromptHandler),
    )
}

/// Creates the Axum application router.
///
/// MCP is served at `/mcp` over the streamable HTTP transport; `/health`
/// and `/health/ready` report liveness and BloodHound reachability.
pub fn create_app(server: BloodhoundServer, health_handler: Arc<HealthHandler>) -> Router {
    let session_manager = Arc::new(LocalSessionManager::default());
    let config = StreamableHttpServerConfig::default();
    let mcp_service =
        StreamableHttpService::new(move || Ok(server.clone()), session_manager, config);

    Router::new()
        .route(
            "/health",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.health().await }
                }
            }),
        )
        .route(
            "/health/ready",
            get({
                let handler = health_handler.clone();
                move || {
                    let h = handler.clone();
                    async move { h.ready().await }
                }
            }),
        )
        .nest_service("/mcp", mcp_service)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
