pub mod bloodhound_tools;
pub mod catalog;
pub mod health_handler;
pub mod prompt_handler;
pub mod resource_handler;
pub mod rmcp_server;
pub mod tool_handler;
