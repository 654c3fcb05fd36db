//! OpenAI Model Client
//!
//! `ModelClient` implementation for the OpenAI chat-completions API
//! (or any compatible endpoint) using native tool calling. The raw
//! tool-call arguments are passed through untouched; argument parsing
//! belongs to the tools themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agent_core::{
    error::{AgentError, Result},
    message::{Conversation, Role},
    model::{ModelClient, ModelTurn, ToolCallRequest},
    tool::ToolSpec,
};

/// OpenAI endpoint configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key. An empty key fails validation at construction rather
    /// than at first request.
    pub api_key: String,

    /// Model identifier (e.g. "gpt-4", "gpt-4o-mini")
    pub model: String,

    /// API base URL, for OpenAI-compatible endpoints
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4".into(),
            base_url: "https://api.openai.com/v1".into(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl OpenAiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            ..defaults
        }
    }
}

/// OpenAI-compatible model client
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    /// Map conversation roles onto the wire format. Tool results are
    /// sent as user-role context because the loop already labels them.
    fn convert_messages(conversation: &Conversation) -> Vec<WireMessage> {
        conversation
            .messages()
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User | Role::ToolResult => "user",
                    Role::Assistant => "assistant",
                },
                content: m.content.clone(),
            })
            .collect()
    }

    /// Render one tool spec as an OpenAI function definition
    fn tool_definition(spec: &ToolSpec) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &spec.parameters {
            properties.insert(
                param.name.clone(),
                serde_json::json!({
                    "type": param.param_type,
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(param.name.clone());
            }
        }

        serde_json::json!({
            "type": "function",
            "function": {
                "name": spec.name,
                "description": spec.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            },
        })
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn infer(&self, conversation: &Conversation, catalog: &[ToolSpec])
        -> Result<ModelTurn> {
        let tools = if catalog.is_empty() {
            None
        } else {
            Some(catalog.iter().map(Self::tool_definition).collect())
        };

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(conversation),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(format!("chat completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "chat completion returned an error");
            return Err(AgentError::Upstream(format!(
                "chat completion failed with {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Upstream(format!("malformed completion response: {e}")))?;

        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AgentError::Upstream("completion contained no choices".into()))?;

        if message.tool_calls.is_empty() {
            Ok(ModelTurn::Final(message.content.unwrap_or_default()))
        } else {
            Ok(ModelTurn::ToolCalls(
                message
                    .tool_calls
                    .into_iter()
                    .map(|c| ToolCallRequest {
                        name: c.function.name,
                        arguments_text: c.function.arguments,
                    })
                    .collect(),
            ))
        }
    }

    async fn probe(&self) -> Result<()> {
        if self.config.api_key.trim().is_empty() {
            return Err(AgentError::Config(
                "OPENAI_API_KEY not provided - check your .env file".into(),
            ));
        }

        let response = self
            .http
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(format!("model endpoint unreachable: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AgentError::Config(format!(
                "model endpoint rejected credentials ({status})"
            )));
        }
        if !status.is_success() {
            return Err(AgentError::Upstream(format!(
                "model endpoint returned {status}"
            )));
        }

        Ok(())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ParameterSchema;
    use agent_core::Message;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_message_conversion() {
        let mut conversation = Conversation::with_system_prompt("You are helpful.");
        conversation.push(Message::user("Hello"));
        conversation.push(Message::assistant("[tool call] calculator({})"));
        conversation.push(Message::tool_result("[tool 'calculator' returned]\n4"));

        let converted = OpenAiClient::convert_messages(&conversation);
        let roles: Vec<&str> = converted.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn test_tool_definition_shape() {
        let spec = ToolSpec {
            name: "calculator".into(),
            description: "Evaluate an expression".into(),
            parameters: vec![ParameterSchema {
                name: "expression".into(),
                param_type: "string".into(),
                description: "The expression".into(),
                required: true,
            }],
        };

        let def = OpenAiClient::tool_definition(&spec);
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], "calculator");
        assert_eq!(
            def["function"]["parameters"]["properties"]["expression"]["type"],
            "string"
        );
        assert_eq!(def["function"]["parameters"]["required"][0], "expression");
    }

    #[tokio::test]
    async fn test_probe_fails_fast_without_key() {
        let client = OpenAiClient::new(OpenAiConfig::default()).unwrap();
        let err = client.probe().await.unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
