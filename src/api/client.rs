use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tokio::time::Duration;

use crate::api::delta::DeltaStream;
use crate::api::models::{to_wire_messages, RequestBody};
use crate::api::streaming::delta_stream;
use crate::api::ModelClient;
use crate::config::Config;
use crate::error::{Result, TurnGateError};
use crate::models::{Message, Reasoning};

/// Streaming client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    has_api_key: bool,
    endpoint: String,
    model: String,
    system_prompt: Option<String>,
    reasoning: Option<Reasoning>,
    stream_timeout: Duration,
    tools: Vec<Value>,
}

impl OpenAiClient {
    /// `tools` is the schema list offered to the model whenever a call has
    /// tools enabled.
    pub fn new(config: &Config, tools: Vec<Value>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                    TurnGateError::ConfigError(format!("Invalid authorization header: {}", e))
                })?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()?;

        Ok(Self {
            http,
            has_api_key: config.api_key.is_some(),
            endpoint: config.api_endpoint.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            reasoning: config.reasoning.clone(),
            stream_timeout: Duration::from_secs(config.stream_timeout),
            tools,
        })
    }

    pub fn build_request(&self, history: &[Message], tools_enabled: bool) -> RequestBody {
        let tools = if tools_enabled && !self.tools.is_empty() {
            Some(self.tools.clone())
        } else {
            None
        };

        RequestBody {
            model: self.model.clone(),
            messages: to_wire_messages(self.system_prompt.as_deref(), history),
            stream: true,
            reasoning: self.reasoning.clone(),
            tools,
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn stream_turn(&self, history: &[Message], tools_enabled: bool) -> Result<DeltaStream> {
        if !self.has_api_key {
            return Err(TurnGateError::ConfigError(
                "TURNGATE_API_KEY (or OPENAI_API_KEY) environment variable not set".to_string(),
            ));
        }

        let body = self.build_request(history, tools_enabled);
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map_or(0, Vec::len),
            "opening chat completion stream"
        );

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        tracing::debug!(status = %response.status(), "chat completion response");

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TurnGateError::ApiError { status, message });
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TurnGateError::from));
        Ok(delta_stream(chunks, self.stream_timeout))
    }
}
