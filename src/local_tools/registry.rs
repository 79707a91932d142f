use futures::FutureExt;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use crate::config::LocalToolsConfig;
use crate::error::ToolError;

use super::{builtins, dynamic};

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

pub type ToolHandler =
    Box<dyn for<'a> Fn(&'a Map<String, Value>) -> ToolFuture<'a> + Send + Sync>;

pub struct LocalTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

impl LocalTool {
    /// Wrap a synchronous function as a tool.
    pub fn from_fn<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        f: F,
    ) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Box::new(move |args: &Map<String, Value>| -> ToolFuture<'_> {
                let result = f(args);
                Box::pin(async move { result })
            }),
        }
    }
}

/// Fixed mapping from tool names to implementations, built once at start-up.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, LocalTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in tools plus any command tools declared in config.
    pub fn from_config(config: &LocalToolsConfig) -> Self {
        let mut registry = Self::new();
        if !config.enabled {
            return registry;
        }

        let is_enabled = |name: &str| -> bool {
            config
                .tools
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.enabled)
                .unwrap_or(true)
        };

        for tool in builtins::builtin_tools() {
            if is_enabled(&tool.name) {
                registry.register(tool);
            }
        }

        for tool_config in &config.tools {
            if !tool_config.enabled || tool_config.r#type.is_none() {
                continue;
            }
            // Built-ins take precedence over a declared tool of the same name
            if registry.tools.contains_key(&tool_config.name) {
                tracing::warn!(tool = %tool_config.name, "declared tool shadows a built-in; skipping");
                continue;
            }

            match dynamic::create_command_tool(tool_config) {
                Ok(tool) => registry.register(tool),
                Err(e) => {
                    tracing::warn!(tool = %tool_config.name, error = %e, "failed to register declared tool");
                }
            }
        }

        registry
    }

    /// Add or replace a tool.
    pub fn register(&mut self, tool: LocalTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn resolve(&self, name: &str) -> Result<&LocalTool, ToolError> {
        self.tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn list(&self) -> Vec<&LocalTool> {
        self.tools.values().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn validate_arguments(&self, tool_name: &str, arguments: &Value) -> Result<(), String> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| format!("Tool '{}' not found", tool_name))?;

        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&tool.input_schema)
            .map_err(|e| format!("Invalid tool schema: {}", e))?;

        if let Err(errors) = schema.validate(arguments) {
            let error_messages: Vec<String> = errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect();
            return Err(error_messages.join("; "));
        }

        Ok(())
    }

    /// Run a tool. Every failure, including a panicking handler, comes back as
    /// a [`ToolError`].
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let tool = self.resolve(name)?;

        self.validate_arguments(name, &Value::Object(arguments.clone()))
            .map_err(|reason| ToolError::Execution {
                name: name.to_string(),
                reason: format!("invalid arguments: {}", reason),
            })?;

        let outcome = AssertUnwindSafe(async { (tool.handler)(arguments).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(reason)) => Err(ToolError::Execution {
                name: name.to_string(),
                reason,
            }),
            Err(_) => Err(ToolError::Execution {
                name: name.to_string(),
                reason: "tool panicked".to_string(),
            }),
        }
    }
}
