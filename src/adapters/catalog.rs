//! Registry of tool descriptors.
//!
//! Built once at startup and shared read-only afterwards. Registration order
//! is preserved so listings are stable across runs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::bloodhound::ApiError;
use crate::domain::{ParamSpec, ParamType, Tool, ToolClass, ToolHandler};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    #[error("Tool '{tool}' has an invalid schema: {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    NotFound(String),
}

/// A callable tool: its public contract plus the handler behind it
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub class: ToolClass,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        class: ToolClass,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            class,
            handler,
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// JSON Schema for the tool's arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = json!({
                "type": p.param_type.as_str(),
                "description": p.description,
            });
            if let Some(default) = &p.default {
                prop["default"] = default.clone();
            }
            if let Some(minimum) = p.minimum {
                prop["minimum"] = json!(minimum);
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    fn check_schema(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidSchema {
            tool: self.name.clone(),
            reason,
        };

        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(invalid("name must be non-empty snake_case".to_string()));
        }

        let mut seen = HashSet::new();
        for p in &self.params {
            if !seen.insert(p.name.as_str()) {
                return Err(invalid(format!("parameter '{}' declared twice", p.name)));
            }
            if let Some(default) = &p.default {
                if p.required {
                    return Err(invalid(format!(
                        "required parameter '{}' cannot have a default",
                        p.name
                    )));
                }
                if !p.param_type.accepts(default) {
                    return Err(invalid(format!(
                        "default for '{}' is not a {}",
                        p.name, p.param_type
                    )));
                }
                if !p.in_range(default) {
                    return Err(invalid(format!("default for '{}' is below its minimum", p.name)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<Arc<ToolDescriptor>>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names are unique; a second registration under the same
    /// name is rejected and the catalog is left unchanged.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), CatalogError> {
        descriptor.check_schema()?;
        if self.index.contains_key(&descriptor.name) {
            return Err(CatalogError::Duplicate(descriptor.name));
        }
        self.index
            .insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(Arc::new(descriptor));
        Ok(())
    }

    /// All tools in registration order
    pub fn list(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    pub fn lookup(&self, name: &str) -> Result<&Arc<ToolDescriptor>, CatalogError> {
        self.index
            .get(name)
            .and_then(|&i| self.tools.get(i))
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Typed accessors over validated tool arguments.
///
/// The router has already checked presence and types, so a miss here means
/// a handler asked for a parameter it never declared.
pub struct ToolArgs<'a>(pub &'a Map<String, Value>);

impl<'a> ToolArgs<'a> {
    pub fn str(&self, name: &str) -> Result<&'a str, ApiError> {
        self.opt_str(name)
            .ok_or_else(|| ApiError::bad_request(format!("missing string argument '{name}'")))
    }

    pub fn opt_str(&self, name: &str) -> Option<&'a str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn u64(&self, name: &str) -> Result<u64, ApiError> {
        self.opt_u64(name)
            .ok_or_else(|| ApiError::bad_request(format!("missing integer argument '{name}'")))
    }

    pub fn opt_u64(&self, name: &str) -> Option<u64> {
        let value = self.0.get(name)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.0.get(name).and_then(Value::as_bool).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, args: &Map<String, Value>) -> Result<Value, ApiError> {
            Ok(Value::Object(args.clone()))
        }
    }

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "test tool", ToolClass::Lookup, Arc::new(Echo))
            .param(ParamSpec::required("user_id", ParamType::String, "user object ID"))
            .param(
                ParamSpec::optional("limit", ParamType::Integer, "max results")
                    .with_default(json!(100)),
            )
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = ToolCatalog::new();
        catalog.register(descriptor("get_user_info")).unwrap();
        catalog.register(descriptor("get_user_sessions")).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup("get_user_sessions").unwrap().name, "get_user_sessions");
        assert_eq!(
            catalog.lookup("nope").unwrap_err(),
            CatalogError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn test_duplicate_rejected_and_catalog_unchanged() {
        let mut catalog = ToolCatalog::new();
        catalog.register(descriptor("get_user_info")).unwrap();

        let err = catalog.register(descriptor("get_user_info")).unwrap_err();
        assert_eq!(err, CatalogError::Duplicate("get_user_info".to_string()));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut catalog = ToolCatalog::new();
        for name in ["zeta", "alpha", "mid"] {
            catalog.register(descriptor(name)).unwrap();
        }
        let names: Vec<&str> = catalog.list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_input_schema() {
        let schema = descriptor("get_user_info").input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["user_id"]));
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["properties"]["limit"]["default"], 100);
    }

    #[test]
    fn test_bad_default_rejected() {
        let bad = ToolDescriptor::new("bad_tool", "x", ToolClass::Lookup, Arc::new(Echo)).param(
            ParamSpec::optional("limit", ParamType::Integer, "x").with_default(json!("ten")),
        );
        let mut catalog = ToolCatalog::new();
        assert!(matches!(
            catalog.register(bad),
            Err(CatalogError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_default_below_minimum_rejected() {
        let bad = ToolDescriptor::new("bad_tool", "x", ToolClass::Listing, Arc::new(Echo)).param(
            ParamSpec::optional("skip", ParamType::Integer, "x")
                .with_default(json!(-1))
                .at_least(0),
        );
        assert!(ToolCatalog::new().register(bad).is_err());
    }

    #[test]
    fn test_minimum_published_in_schema() {
        let tool = ToolDescriptor::new("paged", "x", ToolClass::Listing, Arc::new(Echo)).param(
            ParamSpec::optional("limit", ParamType::Integer, "x").at_least(1),
        );
        assert_eq!(tool.input_schema()["properties"]["limit"]["minimum"], 1);
    }

    #[test]
    fn test_duplicate_param_rejected() {
        let bad = ToolDescriptor::new("bad_tool", "x", ToolClass::Lookup, Arc::new(Echo))
            .param(ParamSpec::required("id", ParamType::String, "x"))
            .param(ParamSpec::optional("id", ParamType::Integer, "x"));
        assert!(ToolCatalog::new().register(bad).is_err());
    }

    #[test]
    fn test_tool_args() {
        let map = json!({"user_id": "S-1-5-21", "limit": 25.0, "flag": true});
        let args = ToolArgs(map.as_object().unwrap());
        assert_eq!(args.str("user_id").unwrap(), "S-1-5-21");
        assert_eq!(args.u64("limit").unwrap(), 25);
        assert!(args.bool_or("flag", false));
        assert!(args.str("missing").is_err());
    }
}
