pub mod defaults;
mod tools;
mod validation;

use crate::cli::Args;
use crate::error::{Result as TurnResult, TurnGateError};
use crate::models::{Reasoning, ReasoningEffort, DEFAULT_GREETING};
use crate::turn::ConfirmationMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub use tools::{LocalToolConfig, LocalToolsConfig, ToolsConfig};
pub use validation::{expand_env_var_in_string, expand_env_vars, normalize_endpoint, parse_flag};

use defaults::{
    default_connect_timeout, default_session_expiry_minutes, default_stream_timeout,
    DEFAULT_API_ENDPOINT, DEFAULT_MODEL, DEFAULT_REFUSAL_MESSAGE,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Seconds to wait for the next stream chunk.
    #[serde(default)]
    pub stream_timeout: Option<u64>,
    #[serde(default)]
    pub connect_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub effort: Option<ReasoningEffort>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub exclude: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub expiry_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Opening assistant message of a new session; an empty string disables it.
    #[serde(default)]
    pub greeting: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Only required once a request goes out to the model.
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub greeting: Option<String>,
    pub stream_timeout: u64,
    pub connect_timeout: u64,
    pub verbose: bool,
    pub reasoning: Option<Reasoning>,
    pub reasoning_exclude: bool,
    pub tools_enabled: bool,
    pub confirmation: ConfirmationMode,
    pub refusal_message: String,
    pub session_expiry_minutes: i64,
    pub local_tools_config: LocalToolsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JsonConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub local_tools: LocalToolsConfig,
}

impl Config {
    pub fn from_env_and_args(args: &Args) -> TurnResult<Self> {
        let json_config =
            JsonConfig::load().map_err(|e| TurnGateError::ConfigError(format!("{:#}", e)))?;
        Self::resolve(args, json_config, |key| env::var(key).ok())
    }

    /// Merge sources with precedence CLI args > environment > config file >
    /// defaults. `env` looks up one environment variable.
    pub fn resolve<F>(args: &Args, json_config: JsonConfig, env: F) -> TurnResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // The key only ever comes from the environment
        let api_key = env("TURNGATE_API_KEY")
            .or_else(|| env("OPENAI_API_KEY"))
            .filter(|k| !k.is_empty());

        let api_endpoint = args
            .api_endpoint
            .clone()
            .or_else(|| env("TURNGATE_API_ENDPOINT"))
            .or(json_config.api.endpoint.clone())
            .map(|endpoint| normalize_endpoint(&endpoint))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| env("TURNGATE_MODEL"))
            .or(json_config.model.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let system_prompt = env("TURNGATE_SYSTEM_PROMPT").or(json_config.model.system_prompt.clone());

        let greeting = match json_config.model.greeting.clone() {
            Some(g) if g.is_empty() => None,
            Some(g) => Some(g),
            None => Some(DEFAULT_GREETING.to_string()),
        };

        let stream_timeout = env("TURNGATE_STREAM_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .or(json_config.api.stream_timeout)
            .unwrap_or_else(default_stream_timeout);

        let connect_timeout = json_config
            .api
            .connect_timeout
            .unwrap_or_else(default_connect_timeout);

        let verbose = args.verbose
            || env("TURNGATE_VERBOSE")
                .map(|v| parse_flag(&v))
                .or(json_config.session.verbose)
                .unwrap_or(false);

        // --no-tools wins over everything else
        let tools_enabled = if args.no_tools {
            false
        } else {
            match env("TURNGATE_TOOLS_ENABLED") {
                Some(v) => parse_flag(&v),
                None => json_config.tools.enabled,
            }
        };

        let confirmation = match args.confirmation {
            Some(mode) => mode,
            None => match env("TURNGATE_CONFIRMATION") {
                Some(v) => v.parse::<ConfirmationMode>().map_err(TurnGateError::ConfigError)?,
                None => json_config.tools.confirmation,
            },
        };

        let refusal_message = json_config
            .tools
            .refusal_message
            .clone()
            .unwrap_or_else(|| DEFAULT_REFUSAL_MESSAGE.to_string());

        let session_expiry_minutes = json_config
            .session
            .expiry_minutes
            .unwrap_or_else(default_session_expiry_minutes);

        let reasoning_exclude = args.reasoning_exclude
            || env("TURNGATE_REASONING_EXCLUDE")
                .map(|v| parse_flag(&v))
                .or(json_config.reasoning.exclude)
                .unwrap_or(false);
        let reasoning =
            Self::build_reasoning_config(args, &json_config.reasoning, reasoning_exclude, &env);

        Ok(Config {
            api_key,
            api_endpoint,
            model,
            system_prompt,
            greeting,
            stream_timeout,
            connect_timeout,
            verbose,
            reasoning,
            reasoning_exclude,
            tools_enabled,
            confirmation,
            refusal_message,
            session_expiry_minutes,
            local_tools_config: json_config.local_tools,
        })
    }

    fn build_reasoning_config<F>(
        args: &Args,
        json_reasoning: &ReasoningConfig,
        exclude: bool,
        env: &F,
    ) -> Option<Reasoning>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_effort = |source: &str, value: String| match value.parse::<ReasoningEffort>() {
            Ok(effort) => Some(effort),
            Err(e) => {
                tracing::warn!(source, error = %e, "ignoring reasoning effort");
                None
            }
        };

        let enabled = args.reasoning_enabled
            || env("TURNGATE_REASONING_ENABLED").is_some_and(|v| parse_flag(&v))
            || json_reasoning.enabled.unwrap_or(false);

        let effort = args
            .reasoning_effort
            .clone()
            .and_then(|e| parse_effort("--reasoning-effort", e))
            .or_else(|| {
                env("TURNGATE_REASONING_EFFORT")
                    .and_then(|e| parse_effort("TURNGATE_REASONING_EFFORT", e))
            })
            .or(json_reasoning.effort);

        let max_tokens = args
            .reasoning_max_tokens
            .or_else(|| env("TURNGATE_REASONING_MAX_TOKENS").and_then(|s| s.parse::<u32>().ok()))
            .or(json_reasoning.max_tokens);

        if enabled || effort.is_some() || max_tokens.is_some() || exclude {
            Some(Reasoning {
                effort,
                max_tokens,
                exclude: exclude.then_some(true),
                enabled: enabled.then_some(true),
            })
        } else {
            None
        }
    }
}

impl JsonConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        Ok(JsonConfig::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );

        let config: JsonConfig = if is_yaml {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".turngate.yaml"),
            PathBuf::from(".turngate.yml"),
            PathBuf::from(".turngate.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("turngate");
            paths.push(config_dir.join("turngate.yaml"));
            paths.push(config_dir.join("turngate.yml"));
            paths.push(config_dir.join("turngate.json"));
        }

        paths
    }
}
