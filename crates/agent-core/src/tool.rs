//! Tool System
//!
//! Extensible tool framework. Tools are registered once at startup and
//! looked up by name when the model requests them; the registry is
//! read-only while serving traffic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Parameter definition for a tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

/// Tool metadata shown to the model as part of the available-actions
/// catalog. Created at construction time, immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool identifier
    pub name: String,

    /// Natural-language description, used to prompt model selection
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

/// Record of one tool call made during a reasoning-loop run.
///
/// Never mutated after creation; attached to the final [`Reply`] for
/// observability.
///
/// [`Reply`]: crate::reasoning::Reply
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool the model asked for
    pub tool_name: String,

    /// Raw arguments text from the model
    pub arguments_text: String,

    /// Output text (result or failure message)
    pub result_text: String,

    /// Whether the handler ran to completion
    pub success: bool,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's catalog entry
    fn spec(&self) -> ToolSpec;

    /// Execute with the raw arguments text the model emitted.
    /// Errors are absorbed by the reasoning loop, never propagated to
    /// the caller of `handle_message`.
    async fn execute(&self, arguments_text: &str) -> Result<String>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.spec().name).finish_non_exhaustive()
    }
}

/// Registry for available tools
///
/// Preserves registration order for `list()`; the first registration
/// of a name wins and a duplicate never replaces it.
#[derive(Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    handlers: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool. Fails with `DuplicateTool` if the name is
    /// already taken; the existing registration stays active.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool handle
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let spec = tool.spec();
        if self.handlers.contains_key(&spec.name) {
            return Err(AgentError::DuplicateTool(spec.name));
        }
        self.handlers.insert(spec.name.clone(), tool);
        self.specs.push(spec);
        Ok(())
    }

    /// Resolve a tool by name
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    /// All tool specs in registration order
    pub fn list(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Generate the system-prompt section describing available tools
    pub fn catalog_prompt_section(&self) -> String {
        let mut prompt = String::from("## Available Tools\n\n");

        for spec in &self.specs {
            prompt.push_str(&format!("### {}\n", spec.name));
            prompt.push_str(&format!("{}\n", spec.description));

            if !spec.parameters.is_empty() {
                prompt.push_str("**Parameters:**\n");
                for param in &spec.parameters {
                    let required = if param.required { " (required)" } else { "" };
                    prompt.push_str(&format!(
                        "- `{}` ({}){}: {}\n",
                        param.name, param.param_type, required, param.description
                    ));
                }
            }
            prompt.push('\n');
        }

        prompt
    }
}

/// Parse arguments text as a JSON object, tolerating bare values:
/// if the text is not a JSON object, it is wrapped under `fallback_key`.
/// Tools use this so a model that emits `"2 + 2"` instead of
/// `{"expression": "2 + 2"}` still works.
pub fn parse_arguments(arguments_text: &str, fallback_key: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(arguments_text) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        _ => serde_json::json!({ fallback_key: arguments_text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: self.name.into(),
                description: "Echoes a fixed reply".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _arguments_text: &str) -> Result<String> {
            Ok(self.reply.into())
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_first_wins() {
        let mut registry = ToolRegistry::new();
        registry
            .register(EchoTool { name: "echo", reply: "first" })
            .unwrap();

        let err = registry
            .register(EchoTool { name: "echo", reply: "second" })
            .unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(name) if name == "echo"));

        let handler = registry.lookup("echo").unwrap();
        assert_eq!(handler.execute("").await.unwrap(), "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("missing").unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "missing"));
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { name: "b", reply: "" }).unwrap();
        registry.register(EchoTool { name: "a", reply: "" }).unwrap();
        registry.register(EchoTool { name: "c", reply: "" }).unwrap();

        assert_eq!(registry.names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_catalog_prompt_section() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { name: "echo", reply: "" }).unwrap();

        let section = registry.catalog_prompt_section();
        assert!(section.contains("### echo"));
        assert!(section.contains("Echoes a fixed reply"));
    }

    #[test]
    fn test_parse_arguments_fallback() {
        let parsed = parse_arguments("2 + 2", "expression");
        assert_eq!(parsed["expression"], "2 + 2");

        let parsed = parse_arguments(r#"{"expression": "3 * 3"}"#, "expression");
        assert_eq!(parsed["expression"], "3 * 3");
    }
}
