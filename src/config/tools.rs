use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::defaults::{
    default_confirmation_mode, default_local_tools_enabled, default_max_output_bytes,
    default_stdin_json, default_tool_timeout, default_tools_enabled, is_default_stdin_json,
};
use crate::turn::ConfirmationMode;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tools_enabled")]
    pub enabled: bool,
    #[serde(default = "default_confirmation_mode")]
    pub confirmation: ConfirmationMode,
    #[serde(default)]
    pub refusal_message: Option<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tools_enabled(),
            confirmation: default_confirmation_mode(),
            refusal_message: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalToolsConfig {
    #[serde(default = "default_local_tools_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub tools: Vec<LocalToolConfig>,
}

impl Default for LocalToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_local_tools_enabled(),
            tools: Vec::new(),
        }
    }
}

/// One entry under `local_tools.tools`. Without `type` it only toggles a
/// built-in; with `type: command` it declares a new tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalToolConfig {
    pub name: String,
    #[serde(default = "default_local_tools_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    // ${VAR} references are expanded at run time
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default = "default_stdin_json")]
    #[serde(skip_serializing_if = "is_default_stdin_json")]
    pub stdin_json: bool,
}
