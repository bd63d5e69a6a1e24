use super::{
    parse_tool_calls, parsing::arguments_to_string, unwrap_response_json, AssistantMessage,
    LLMError, LLMProvider, Message, MessageRole, ToolCall, ToolDefinition,
};
use crate::config::LLMConfig;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

/// Client for any OpenAI-compatible `/chat/completions` endpoint
/// (OpenAI itself, Ollama, vLLM, LM Studio, ...)
pub struct OpenAIProvider {
    config: LLMConfig,
    api_key: Option<String>,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Build a provider, reading the API key from the configured environment variable
    pub fn new(config: LLMConfig) -> Self {
        let api_key = config.api_key();
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: LLMConfig, api_key: Option<String>) -> Self {
        let retry = RetryPolicy::new(config.max_retries, config.timeout());
        Self {
            config,
            api_key,
            retry,
            client: reqwest::Client::new(),
        }
    }

    /// Override the retry schedule
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Wall-clock bound on one [`LLMProvider::complete`] call, retries included
    pub fn deadline(&self) -> std::time::Duration {
        self.retry.deadline()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_payload(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let api_messages: Vec<Value> = messages.iter().map(message_to_json).collect();

        let mut payload = json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        if !tools.is_empty() {
            let api_tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            payload["tools"] = Value::Array(api_tools);
            payload["tool_choice"] = json!("auto");
        }

        payload
    }

    async fn send_once(&self, payload: &Value) -> super::Result<Value> {
        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(payload);

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LLMError::Timeout
            } else {
                LLMError::NetworkError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                code if code >= 500 => {
                    LLMError::ProviderUnavailable(format!("HTTP {}: {}", code, text))
                }
                _ => LLMError::InvalidRequest(text),
            });
        }

        response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> super::Result<AssistantMessage> {
        let payload = self.build_payload(messages, tools);
        debug!(
            "Sending {} messages and {} tools to {}",
            messages.len(),
            tools.len(),
            self.config.model
        );

        let data = self
            .retry
            .run("completion request", || self.send_once(&payload))
            .await?;

        parse_completion(&data)
    }
}

fn message_to_json(msg: &Message) -> Value {
    let mut value = json!({
        "role": msg.role.to_string(),
        "content": msg.content,
    });

    if msg.role == MessageRole::Assistant && !msg.tool_calls.is_empty() {
        let calls: Vec<Value> = msg
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments,
                    }
                })
            })
            .collect();
        value["tool_calls"] = Value::Array(calls);
    }

    if let Some(id) = &msg.tool_call_id {
        value["tool_call_id"] = json!(id);
    }

    value
}

/// Turn a `/chat/completions` response body into an [`AssistantMessage`]
pub(crate) fn parse_completion(data: &Value) -> super::Result<AssistantMessage> {
    let choice = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string);

    let reasoning = message
        .get("reasoning_content")
        .or_else(|| message.get("reasoning"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let mut tool_calls = Vec::new();
    if let Some(native) = message.get("tool_calls").and_then(Value::as_array) {
        for call in native {
            let function = call
                .get("function")
                .ok_or_else(|| LLMError::ParseError("Tool call without function".to_string()))?;
            let name = function
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| LLMError::ParseError("Tool call without name".to_string()))?;
            let arguments = function
                .get("arguments")
                .map(arguments_to_string)
                .unwrap_or_else(|| "{}".to_string());

            let tool_call = match call.get("id").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => ToolCall::new(id, name, arguments),
                _ => ToolCall::generated(name, arguments),
            };
            tool_calls.push(tool_call);
        }
    }

    // Fall back to calls written into the content body
    if tool_calls.is_empty() {
        if let Some(text) = &content {
            let embedded = parse_tool_calls(text);
            if !embedded.is_empty() {
                debug!("Recovered {} tool call(s) from content", embedded.len());
                return Ok(AssistantMessage {
                    content: None,
                    tool_calls: embedded,
                    reasoning,
                });
            }
        }
    }

    let content = content.map(|text| unwrap_response_json(&text).unwrap_or(text));

    Ok(AssistantMessage {
        content,
        tool_calls,
        reasoning,
    })
}
