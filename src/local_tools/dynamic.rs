use serde_json::{json, Map, Value};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::config::{expand_env_var_in_string, expand_env_vars, LocalToolConfig};

use super::registry::{LocalTool, ToolFuture, ToolHandler};

/// Build a tool that runs an external command declared in config.
pub fn create_command_tool(tool_config: &LocalToolConfig) -> Result<LocalTool, String> {
    let tool_type = tool_config
        .r#type
        .as_deref()
        .ok_or_else(|| format!("Tool '{}' is missing 'type' field", tool_config.name))?;

    if tool_type != "command" {
        return Err(format!(
            "Tool '{}' has invalid type '{}' (must be 'command')",
            tool_config.name, tool_type
        ));
    }

    if tool_config.command.is_none() {
        return Err(format!(
            "Tool '{}' (type: command) requires 'command' field",
            tool_config.name
        ));
    }

    let description = tool_config
        .description
        .clone()
        .ok_or_else(|| format!("Tool '{}' is missing 'description' field", tool_config.name))?;

    let input_schema = tool_config
        .input_schema
        .clone()
        .unwrap_or_else(|| json!({"type": "object"}));

    let config = tool_config.clone();
    let handler: ToolHandler = Box::new(move |args: &Map<String, Value>| -> ToolFuture<'_> {
        let arguments = Value::Object(args.clone());
        let config = config.clone();
        Box::pin(async move { execute_command(&config, &arguments).await })
    });

    Ok(LocalTool {
        name: tool_config.name.clone(),
        description,
        input_schema,
        handler,
    })
}

/// Run the configured command, passing the JSON arguments on stdin when
/// `stdin_json` is set. Stdout is the tool result.
pub async fn execute_command(
    tool_config: &LocalToolConfig,
    arguments: &Value,
) -> Result<String, String> {
    let start_time = Instant::now();
    let command = tool_config.command.as_deref().ok_or_else(|| {
        format!(
            "Tool '{}' (type: command) requires 'command' field",
            tool_config.name
        )
    })?;

    let args: Vec<String> = tool_config
        .args
        .iter()
        .map(|arg| expand_env_var_in_string(arg))
        .collect();
    let env_vars = expand_env_vars(&tool_config.env);

    tracing::debug!(
        tool = %tool_config.name,
        command,
        args = ?args,
        timeout_secs = tool_config.timeout_secs,
        "running command tool"
    );

    let mut cmd = Command::new(command);
    cmd.args(&args)
        .envs(&env_vars)
        .stdin(if tool_config.stdin_json {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(ref working_dir) = tool_config.working_dir {
        cmd.current_dir(expand_env_var_in_string(working_dir));
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("Failed to spawn '{}': {}", command, e))?;

    let payload = serde_json::to_string(arguments)
        .map_err(|e| format!("Failed to serialize arguments: {}", e))?;

    // The stdin write shares the deadline: a child that never reads would
    // otherwise block it once the pipe buffer fills.
    let run = async move {
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.as_bytes())
                .await
                .map_err(|e| format!("Failed to write to stdin: {}", e))?;
            // Dropping stdin closes the pipe so the child sees EOF
            drop(stdin);
        }
        child
            .wait_with_output()
            .await
            .map_err(|e| format!("Failed to wait for process: {}", e))
    };

    let output = timeout(Duration::from_secs(tool_config.timeout_secs), run)
        .await
        .map_err(|_| {
            format!(
                "Command timed out after {} seconds",
                tool_config.timeout_secs
            )
        })??;

    tracing::debug!(
        tool = %tool_config.name,
        exit_code = output.status.code().unwrap_or(-1),
        duration_ms = start_time.elapsed().as_millis() as u64,
        output_size = output.stdout.len(),
        "command tool finished"
    );

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "Command exited with code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim_end()
        ));
    }

    if output.stdout.len() as u64 > tool_config.max_output_bytes {
        return Err(format!(
            "Command output too large: {} bytes (max: {} bytes)",
            output.stdout.len(),
            tool_config.max_output_bytes
        ));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| format!("Command output is not valid UTF-8: {}", e))
}
