//! Chat-completions client that picks one tool for a prompt.

use crate::config::RawConfig;
use crate::errors::AuditError;
use crate::registry::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Settings for the tool-selection endpoint (Ollama-compatible chat API).
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub llm_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            llm_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 120,
        }
    }
}

/// The decision returned by the LLM: which tool, with which arguments.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: RawConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    tools: &'a [ToolDefinition],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallMessage>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallMessage {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: Value,
}

const SELECTOR_SYSTEM_PROMPT: &str = "You are a repository audit assistant. \
Pick exactly one of the provided tools that answers the user's request and \
fill in its arguments. Dates use YYYY-MM-DD format.";

/// Client for the tool-selection step.
pub struct ToolSelector {
    config: SelectorConfig,
    http: reqwest::Client,
}

impl ToolSelector {
    pub fn new(config: SelectorConfig) -> Result<Self, AuditError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(AuditError::upstream)?;
        Ok(Self { config, http })
    }

    /// Send the catalog and prompt, return the tool the model picked.
    pub async fn select_tool(
        &self,
        prompt: &str,
        catalog: &[ToolDefinition],
    ) -> Result<ToolInvocation, AuditError> {
        let url = format!("{}/api/chat", self.config.llm_url);

        let request = ChatRequest {
            model: &self.config.model_name,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SELECTOR_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            tools: catalog,
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Requesting tool selection from {}", url);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuditError::upstream(format!(
                        "LLM request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    AuditError::upstream(format!(
                        "Cannot connect to LLM endpoint at {}",
                        self.config.llm_url
                    ))
                } else {
                    AuditError::upstream(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::upstream(format!(
                "LLM API error {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AuditError::upstream(format!("Failed to parse LLM response: {}", e)))?;

        let call = chat
            .message
            .tool_calls
            .and_then(|mut calls| if calls.is_empty() { None } else { Some(calls.remove(0)) })
            .ok_or_else(|| {
                AuditError::upstream(format!(
                    "LLM returned no tool call (said: {})",
                    chat.message.content
                ))
            })?;

        Ok(ToolInvocation {
            name: call.function.name,
            arguments: arguments_object(call.function.arguments)?,
        })
    }
}

/// Tool-call arguments must be a JSON object; some models return them
/// as a JSON-encoded string instead, which is accepted and re-parsed.
fn arguments_object(arguments: Value) -> Result<RawConfig, AuditError> {
    match arguments {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(RawConfig::new()),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(AuditError::config(format!(
                "tool-call arguments are not a JSON object: {}",
                text
            ))),
        },
        other => Err(AuditError::config(format!(
            "tool-call arguments are not a JSON object: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arguments_object_accepts_object() {
        let args = arguments_object(json!({"start_date": "2024-01-01"})).unwrap();
        assert_eq!(args["start_date"], "2024-01-01");
    }

    #[test]
    fn test_arguments_object_accepts_encoded_string() {
        let args = arguments_object(json!("{\"old_pr_days\": 14}")).unwrap();
        assert_eq!(args["old_pr_days"], 14);
    }

    #[test]
    fn test_arguments_object_rejects_array() {
        let err = arguments_object(json!([1, 2])).expect_err("array is not an object");
        assert!(matches!(err, AuditError::Configuration(_)));
    }

    #[test]
    fn test_response_parsing() {
        let raw = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "old_open_prs", "arguments": {"old_pr_days": 14}}}
                ]
            },
            "done": true
        });

        let chat: ChatResponse = serde_json::from_value(raw).unwrap();
        let calls = chat.message.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "old_open_prs");
    }
}
