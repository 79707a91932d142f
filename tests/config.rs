use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;
use turngate::api::{ModelClient, OpenAiClient};
use turngate::cli::{Args, Command};
use turngate::config::{normalize_endpoint, Config, JsonConfig};
use turngate::error::TurnGateError;
use turngate::models::{Message, ReasoningEffort};
use turngate::turn::ConfirmationMode;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = Config::resolve(
        &Args::default(),
        JsonConfig::default(),
        env_from(&[("OPENAI_API_KEY", "sk-test")]),
    )
    .unwrap();

    assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.api_endpoint, "https://api.openai.com/v1/chat/completions");
    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.greeting.as_deref(), Some("How can I help you?"));
    assert_eq!(config.stream_timeout, 30);
    assert_eq!(config.session_expiry_minutes, 30);
    assert_eq!(config.confirmation, ConfirmationMode::Batch);
    assert!(config.tools_enabled);
    assert!(config.reasoning.is_none());
    assert_eq!(
        config.refusal_message,
        "You declined the tool call. I will try to answer without using tools."
    );
}

#[tokio::test]
async fn test_missing_api_key_fails_only_when_streaming() {
    let config = Config::resolve(&Args::default(), JsonConfig::default(), env_from(&[])).unwrap();
    assert!(config.api_key.is_none());

    let client = OpenAiClient::new(&config, Vec::new()).unwrap();
    let result = client.stream_turn(&[Message::user("hi")], false).await;
    assert!(matches!(result, Err(TurnGateError::ConfigError(_))));
}

#[test]
fn test_precedence_args_over_env_over_file() {
    let json_config: JsonConfig = serde_yaml::from_str(
        r#"
api:
  endpoint: http://file.example
  stream_timeout: 90
model:
  default_model: file-model
  greeting: ""
tools:
  confirmation: per_call
  refusal_message: No tools, then.
session:
  expiry_minutes: 120
"#,
    )
    .unwrap();

    let env = env_from(&[
        ("TURNGATE_API_KEY", "sk-primary"),
        ("OPENAI_API_KEY", "sk-fallback"),
        ("TURNGATE_MODEL", "env-model"),
        ("TURNGATE_API_ENDPOINT", "http://env.example/v1"),
        ("TURNGATE_CONFIRMATION", "auto"),
    ]);

    let from_env = Config::resolve(&Args::default(), json_config.clone(), &env).unwrap();
    assert_eq!(from_env.api_key.as_deref(), Some("sk-primary"));
    assert_eq!(from_env.model, "env-model");
    assert_eq!(from_env.api_endpoint, "http://env.example/v1/chat/completions");
    assert_eq!(from_env.confirmation, ConfirmationMode::Auto);
    assert_eq!(from_env.stream_timeout, 90);
    assert_eq!(from_env.session_expiry_minutes, 120);
    assert_eq!(from_env.refusal_message, "No tools, then.");
    assert!(from_env.greeting.is_none());

    let args = Args {
        model: Some("arg-model".to_string()),
        confirmation: Some(ConfirmationMode::Batch),
        no_tools: true,
        ..Args::default()
    };
    let from_args = Config::resolve(&args, json_config.clone(), &env).unwrap();
    assert_eq!(from_args.model, "arg-model");
    assert_eq!(from_args.confirmation, ConfirmationMode::Batch);
    assert!(!from_args.tools_enabled);

    let from_file = Config::resolve(
        &Args::default(),
        json_config,
        env_from(&[("OPENAI_API_KEY", "sk-fallback")]),
    )
    .unwrap();
    assert_eq!(from_file.model, "file-model");
    assert_eq!(from_file.api_endpoint, "http://file.example/v1/chat/completions");
    assert_eq!(from_file.confirmation, ConfirmationMode::PerCall);
}

#[test]
fn test_invalid_confirmation_mode_in_env() {
    let err = Config::resolve(
        &Args::default(),
        JsonConfig::default(),
        env_from(&[("OPENAI_API_KEY", "sk"), ("TURNGATE_CONFIRMATION", "sometimes")]),
    )
    .unwrap_err();
    assert!(matches!(err, TurnGateError::ConfigError(_)));
}

#[test]
fn test_reasoning_from_args() {
    let args = Args {
        reasoning_effort: Some("HIGH".to_string()),
        reasoning_exclude: true,
        ..Args::default()
    };
    let config = Config::resolve(&args, JsonConfig::default(), env_from(&[("OPENAI_API_KEY", "sk")]))
        .unwrap();

    let reasoning = config.reasoning.unwrap();
    assert_eq!(reasoning.effort, Some(ReasoningEffort::High));
    assert_eq!(reasoning.exclude, Some(true));
    assert!(config.reasoning_exclude);

    let serialized = serde_json::to_value(config_reasoning_for("low")).unwrap();
    assert_eq!(serialized, serde_json::json!({"effort": "low"}));
}

#[test]
fn test_reasoning_exclude_env_overrides_file() {
    let json_config: JsonConfig =
        serde_yaml::from_str("reasoning:\n  exclude: true\n  effort: medium\n").unwrap();

    let config = Config::resolve(
        &Args::default(),
        json_config.clone(),
        env_from(&[("OPENAI_API_KEY", "sk"), ("TURNGATE_REASONING_EXCLUDE", "false")]),
    )
    .unwrap();
    assert!(!config.reasoning_exclude);
    let reasoning = config.reasoning.unwrap();
    assert_eq!(reasoning.effort, Some(ReasoningEffort::Medium));
    assert_eq!(reasoning.exclude, None);

    let config =
        Config::resolve(&Args::default(), json_config, env_from(&[("OPENAI_API_KEY", "sk")])).unwrap();
    assert!(config.reasoning_exclude);
    assert_eq!(config.reasoning.unwrap().exclude, Some(true));
}

fn config_reasoning_for(effort: &str) -> turngate::models::Reasoning {
    let args = Args {
        reasoning_effort: Some(effort.to_string()),
        ..Args::default()
    };
    Config::resolve(&args, JsonConfig::default(), env_from(&[("OPENAI_API_KEY", "sk")]))
        .unwrap()
        .reasoning
        .unwrap()
}

#[test]
fn test_invalid_reasoning_effort_is_ignored() {
    let args = Args {
        reasoning_effort: Some("extreme".to_string()),
        ..Args::default()
    };
    let config = Config::resolve(&args, JsonConfig::default(), env_from(&[("OPENAI_API_KEY", "sk")]))
        .unwrap();
    assert!(config.reasoning.is_none());
}

#[test]
fn test_load_json_and_yaml_files() {
    let temp_dir = TempDir::new().unwrap();

    let yaml_path = temp_dir.path().join("turngate.yaml");
    fs::write(
        &yaml_path,
        "local_tools:\n  tools:\n    - name: time_now\n      enabled: false\n",
    )
    .unwrap();
    let yaml = JsonConfig::load_from(&yaml_path).unwrap();
    assert_eq!(yaml.local_tools.tools.len(), 1);
    assert!(!yaml.local_tools.tools[0].enabled);

    let json_path = temp_dir.path().join("turngate.json");
    fs::write(&json_path, r#"{"tools": {"confirmation": "per-call"}}"#).unwrap();
    let json = JsonConfig::load_from(&json_path).unwrap();
    assert_eq!(json.tools.confirmation, ConfirmationMode::PerCall);

    let bad_path = temp_dir.path().join("bad.json");
    fs::write(&bad_path, "{").unwrap();
    assert!(JsonConfig::load_from(&bad_path).is_err());
}

#[test]
fn test_normalize_endpoint() {
    assert_eq!(
        normalize_endpoint("http://localhost:11434"),
        "http://localhost:11434/v1/chat/completions"
    );
    assert_eq!(
        normalize_endpoint("http://localhost:11434/"),
        "http://localhost:11434/v1/chat/completions"
    );
    assert_eq!(
        normalize_endpoint("https://api.example.com/v1"),
        "https://api.example.com/v1/chat/completions"
    );
    assert_eq!(
        normalize_endpoint("https://api.example.com/v1/chat/completions"),
        "https://api.example.com/v1/chat/completions"
    );
}

#[test]
fn test_confirmation_mode_parsing() {
    assert_eq!("per-call".parse::<ConfirmationMode>().unwrap(), ConfirmationMode::PerCall);
    assert_eq!("AUTO".parse::<ConfirmationMode>().unwrap(), ConfirmationMode::Auto);
    assert!("never".parse::<ConfirmationMode>().is_err());
}

#[test]
fn test_cli_commands() {
    use clap::Parser;

    let args = Args::try_parse_from(["turngate", "what's", "the", "weather?"]).unwrap();
    assert_eq!(args.command(), Some(Command::Input("what's the weather?".to_string())));

    let args = Args::try_parse_from(["turngate", "--approve"]).unwrap();
    assert_eq!(args.command(), Some(Command::Approve));

    let args = Args::try_parse_from(["turngate", "--confirmation", "per-call", "hi"]).unwrap();
    assert_eq!(args.confirmation, Some(ConfirmationMode::PerCall));

    assert!(Args::try_parse_from(["turngate", "--approve", "--deny"]).is_err());
    assert_eq!(Args::try_parse_from(["turngate"]).unwrap().command(), None);
}
