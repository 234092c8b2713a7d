use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{Completion, Provider};
use super::configs::OpenAiProviderConfig;
use super::utils::{messages_to_openai_spec, openai_response_to_completion, tools_to_openai_spec};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Buffered backend for OpenAI compatible chat completion endpoints
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(ProviderError::Server(status))
            }
            status => Err(ProviderError::Rejected {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion, ProviderError> {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let mut messages_array = vec![system_message];
        messages_array.extend(messages_to_openai_spec(messages));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array
        });

        let tools_spec = tools_to_openai_spec(tools)?;
        if !tools_spec.is_empty() {
            payload["tools"] = json!(tools_spec);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }
        if let Some(tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(tokens);
        }

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "sending completion request"
        );
        let response = self.post(payload).await?;

        if let Some(error) = response.get("error") {
            return Err(ProviderError::InvalidResponse(format!(
                "OpenAI API error: {}",
                error
            )));
        }

        openai_response_to_completion(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(status: u16, response_body: Value) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .respond_with(ResponseTemplate::new(status).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        };

        let provider = OpenAiProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_server, provider) = setup_mock_server(200, response_body).await;
        let messages = vec![Message::user("Hello?")];

        let completion = provider
            .complete("You are a helpful assistant.", &messages, &[])
            .await?;

        assert_eq!(
            completion.text.as_deref(),
            Some("Hello! How can I assist you today?")
        );
        assert!(!completion.has_tool_calls());
        assert_eq!(completion.usage.input_tokens, Some(12));
        assert_eq!(completion.usage.output_tokens, Some(15));
        assert_eq!(completion.usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "get_weather",
                            "arguments": "{\"location\":\"San Francisco, CA\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 20,
                "completion_tokens": 15,
                "total_tokens": 35
            }
        });

        let (_server, provider) = setup_mock_server(200, response_body).await;
        let messages = vec![Message::user("What's the weather in San Francisco?")];
        let tool = Tool::new(
            "get_weather",
            "Gets the current weather for a location",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "The city and state, e.g. New York, NY"
                    }
                },
                "required": ["location"]
            }),
        );

        let completion = provider
            .complete("You are a helpful assistant.", &messages, &[tool])
            .await?;

        assert!(completion.text.is_none());
        let call = &completion.tool_calls[0];
        assert_eq!(call.id, "call_123");
        assert_eq!(call.name, "get_weather");
        assert_eq!(
            call.decoded_arguments(),
            json!({"location": "San Francisco, CA"})
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_server_error() -> Result<()> {
        let (_server, provider) = setup_mock_server(500, json!({})).await;
        let result = provider
            .complete("You are a helpful assistant.", &[Message::user("Hello?")], &[])
            .await;

        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Server error: 500"));
        Ok(())
    }

    #[tokio::test]
    async fn test_does_not_stream() {
        let (_server, provider) = setup_mock_server(200, json!({})).await;
        assert!(!provider.supports_streaming());
        assert!(matches!(
            provider.stream("", &[]).await,
            Err(ProviderError::StreamingUnsupported(_))
        ));
    }
}
