use serde::Serialize;
use serde_json::{json, Map, Value};
use std::io;

use super::registry::LocalTool;

pub fn builtin_tools() -> Vec<LocalTool> {
    vec![
        LocalTool::from_fn(
            "get_current_weather",
            "Get the current weather in a given location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city and state, e.g. San Francisco, CA"
                    },
                    "unit": {
                        "type": "string",
                        "enum": ["celsius", "fahrenheit"]
                    }
                },
                "required": ["location"]
            }),
            handle_get_current_weather,
        ),
        LocalTool::from_fn(
            "echo",
            "Echo back the provided text. Useful for testing or simple text output.",
            json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "The text to echo back"
                    }
                },
                "required": ["text"],
                "additionalProperties": false
            }),
            handle_echo,
        ),
        LocalTool::from_fn(
            "time_now",
            "Get the current date and time in ISO-8601 format.",
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
            handle_time_now,
        ),
    ]
}

/// Canned weather lookup. Results are serialized with `", "` and `": "`
/// separators so they read the same as the demo service's JSON.
pub fn handle_get_current_weather(args: &Map<String, Value>) -> Result<String, String> {
    let location = args
        .get("location")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing required argument: location".to_string())?;
    let unit = args
        .get("unit")
        .and_then(|v| v.as_str())
        .unwrap_or("fahrenheit");

    let lower = location.to_lowercase();
    let report = if lower.contains("tokyo") {
        json!({"location": "Tokyo", "temperature": "10", "unit": unit})
    } else if lower.contains("san francisco") {
        json!({"location": "San Francisco", "temperature": "72", "unit": unit})
    } else if lower.contains("paris") {
        json!({"location": "Paris", "temperature": "22", "unit": unit})
    } else {
        json!({"location": location, "temperature": "unknown"})
    };

    to_spaced_json(&report).map_err(|e| format!("Failed to serialize weather report: {}", e))
}

pub fn handle_echo(args: &Map<String, Value>) -> Result<String, String> {
    let text = args
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing required argument: text".to_string())?;
    Ok(text.to_string())
}

pub fn handle_time_now(_args: &Map<String, Value>) -> Result<String, String> {
    Ok(chrono::Utc::now().to_rfc3339())
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn to_spaced_json(value: &Value) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
