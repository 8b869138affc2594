//! RMCP Server Adapter
//!
//! Exposes the tool router, the Cypher reference resources and the analyst
//! prompt through the standard MCP protocol using the official rmcp SDK.
//! Tool failures are returned as `isError` results, never as protocol
//! errors, so a bad invocation cannot end the client's session.

use crate::domain::{PromptPort, ResourcePort, ToolInvocation, ToolPort};
use rmcp::{
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, Prompt, PromptArgument, PromptMessage, PromptMessageRole,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ResourceContents,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer,
};
use std::sync::Arc;
use tracing::info;

/// BloodHound MCP server
#[derive(Clone)]
pub struct BloodhoundServer {
    resource_handler: Arc<dyn ResourcePort>,
    tool_handler: Arc<dyn ToolPort>,
    prompt_handler: Arc<dyn PromptPort>,
}

impl BloodhoundServer {
    pub fn new(
        resource_handler: Arc<dyn ResourcePort>,
        tool_handler: Arc<dyn ToolPort>,
        prompt_handler: Arc<dyn PromptPort>,
    ) -> Self {
        Self {
            resource_handler,
            tool_handler,
            prompt_handler,
        }
    }
}

impl ServerHandler for BloodhoundServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "bloodhound_mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "Query a BloodHound Community Edition database: Active Directory and Azure \
                 objects, attack paths, ADCS and raw Cypher. Start with get_domains or \
                 search_objects to obtain object IDs."
                    .to_string(),
            ),
        }
    }

    fn ping(
        &self,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<(), McpError>> + Send + '_ {
        async move {
            info!("MCP ping received");
            Ok(())
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let handler = self.resource_handler.clone();
        async move {
            let resources = handler
                .list_resources()
                .await
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;

            let mcp_resources: Vec<Resource> = resources
                .into_iter()
                .map(|r| {
                    Resource::new(
                        RawResource {
                            uri: r.uri,
                            name: r.name,
                            title: None,
                            description: r.description,
                            mime_type: r.mime_type,
                            size: None,
                            icons: None,
                        },
                        None,
                    )
                })
                .collect();

            Ok(ListResourcesResult {
                resources: mcp_resources,
                next_cursor: None,
            })
        }
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        let handler = self.resource_handler.clone();
        async move {
            let result = handler
                .get_resource(request.uri.as_str())
                .await
                .map_err(|e| McpError::resource_not_found(e.to_string(), None))?;

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(result.content, result.uri)],
            })
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let handler = self.tool_handler.clone();
        async move {
            let tools: Vec<Tool> = handler
                .list_tools()
                .into_iter()
                .map(|t| {
                    let schema = match t.input_schema {
                        serde_json::Value::Object(obj) => obj,
                        _ => serde_json::Map::new(),
                    };
                    Tool::new(t.name, t.description, schema)
                })
                .collect();

            Ok(ListToolsResult {
                tools,
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let handler = self.tool_handler.clone();
        async move {
            let args = request
                .arguments
                .map(serde_json::Value::Object)
                .unwrap_or(serde_json::Value::Null);

            let result = handler
                .invoke(ToolInvocation::new(request.name.as_ref(), args))
                .await;

            let content = vec![Content::text(result.to_text())];
            if result.is_success() {
                Ok(CallToolResult::success(content))
            } else {
                Ok(CallToolResult::error(content))
            }
        }
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListPromptsResult, McpError>> + Send + '_ {
        let handler = self.prompt_handler.clone();
        async move {
            let prompts = handler
                .list_prompts()
                .await
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;

            let mcp_prompts: Vec<Prompt> = prompts
                .into_iter()
                .map(|p| {
                    let args: Option<Vec<PromptArgument>> = p.arguments.map(|args| {
                        args.into_iter()
                            .map(|a| PromptArgument {
                                name: a.name,
                                title: None,
                                description: a.description,
                                required: Some(a.required),
                            })
                            .collect()
                    });
                    Prompt::new(p.name, Some(p.description), args)
                })
                .collect();

            Ok(ListPromptsResult {
                prompts: mcp_prompts,
                next_cursor: None,
            })
        }
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<GetPromptResult, McpError>> + Send + '_ {
        let handler = self.prompt_handler.clone();
        async move {
            let args = request.arguments.map(serde_json::Value::Object);

            let result = handler
                .get_prompt(request.name.as_ref(), args)
                .await
                .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

            let messages: Vec<PromptMessage> = result
                .messages
                .into_iter()
                .map(|m| {
                    let role = match m.role.as_str() {
                        "assistant" => PromptMessageRole::Assistant,
                        _ => PromptMessageRole::User,
                    };
                    PromptMessage::new_text(role, m.text)
                })
                .collect();

            Ok(GetPromptResult {
                description: result.description,
                messages,
            })
        }
    }
}
