use crate::domain::{Resource, ResourcePort, ResourceReadResult};
use anyhow::Result;
use async_trait::async_trait;

/// A read-only text document served over MCP
#[derive(Debug, Clone, Copy)]
pub struct StaticResource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub content: &'static str,
}

pub const CYPHER_EXAMPLES_URI: &str = "bloodhound://cypher/examples";
pub const CYPHER_PATTERNS_URI: &str = "bloodhound://cypher/patterns";

static CYPHER_RESOURCES: &[StaticResource] = &[
    StaticResource {
        uri: CYPHER_EXAMPLES_URI,
        name: "cypher_examples",
        description: "Example Cypher queries for common BloodHound questions",
        mime_type: "text/markdown",
        content: include_str!("../../assets/cypher_examples.md"),
    },
    StaticResource {
        uri: CYPHER_PATTERNS_URI,
        name: "cypher_patterns",
        description: "Reusable Cypher patterns and BloodHound relationship kinds",
        mime_type: "text/markdown",
        content: include_str!("../../assets/cypher_patterns.md"),
    },
];

/// Serves the built-in Cypher reference documents.
pub struct StaticResourceHandler {
    resources: &'static [StaticResource],
}

impl StaticResourceHandler {
    pub fn new() -> Self {
        Self {
            resources: CYPHER_RESOURCES,
        }
    }
}

impl Default for StaticResourceHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourcePort for StaticResourceHandler {
    async fn get_resource(&self, uri: &str) -> Result<ResourceReadResult> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.uri == uri)
            .ok_or_else(|| anyhow::anyhow!("Resource not found: {}", uri))?;

        Ok(ResourceReadResult {
            uri: resource.uri.to_string(),
            mime_type: Some(resource.mime_type.to_string()),
            content: resource.content.to_string(),
        })
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        Ok(self
            .resources
            .iter()
            .map(|r| Resource {
                uri: r.uri.to_string(),
                name: r.name.to_string(),
                description: Some(r.description.to_string()),
                mime_type: Some(r.mime_type.to_string()),
            })
            .collect())
    }
}
