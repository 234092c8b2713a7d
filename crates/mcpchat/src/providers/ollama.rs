use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::base::{Completion, FragmentStream, Provider};
use super::configs::OllamaProviderConfig;
use super::utils::{messages_to_ollama_spec, ollama_response_to_completion, tools_to_openai_spec};
use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Token streaming backend for a local Ollama server, using its native chat API
pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self, system: &str, messages: &[Message], stream: bool) -> Value {
        let mut messages_array = vec![json!({
            "role": "system",
            "content": system
        })];
        messages_array.extend(messages_to_ollama_spec(messages));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array,
            "stream": stream,
        });
        if let Some(temp) = self.config.temperature {
            payload["options"] = json!({ "temperature": temp });
        }
        payload
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let response = self.client.post(&url).json(payload).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response),
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

/// What one line of a streamed chat response carried
#[derive(Debug, PartialEq)]
enum StreamLine {
    Fragment(String),
    Empty,
    /// Last chunk, which may still carry text
    Done(Option<String>),
    Failed(String),
}

fn parse_stream_line(line: &str) -> StreamLine {
    let line = line.trim();
    if line.is_empty() {
        return StreamLine::Empty;
    }
    let chunk: Value = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => return StreamLine::Failed(format!("Malformed stream chunk: {}", e)),
    };
    if let Some(error) = chunk.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return StreamLine::Failed(message);
    }
    let content = chunk
        .pointer("/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string);
    let done = chunk.get("done").and_then(Value::as_bool).unwrap_or(false);
    match (content, done) {
        (content, true) => StreamLine::Done(content),
        (Some(content), false) => StreamLine::Fragment(content),
        (None, false) => StreamLine::Empty,
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion, ProviderError> {
        let mut payload = self.payload(system, messages, false);
        let tools_spec = tools_to_openai_spec(tools)?;
        if !tools_spec.is_empty() {
            payload["tools"] = json!(tools_spec);
        }

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            tools = tools.len(),
            "sending completion request"
        );
        let response: Value = self.post(&payload).await?.json().await?;
        ollama_response_to_completion(&response)
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[Message],
    ) -> Result<FragmentStream<'_>, ProviderError> {
        let payload = self.payload(system, messages, true);
        debug!(model = %self.config.model, messages = messages.len(), "starting stream");
        let response = self.post(&payload).await?;
        let mut bytes = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut chunks = 0usize;
            'read: loop {
                let next = bytes.next().await;
                let at_end = next.is_none();
                match next {
                    Some(Ok(data)) => buffer.extend_from_slice(&data),
                    Some(Err(e)) => {
                        yield Err(ProviderError::Stream(e.to_string()));
                        break 'read;
                    }
                    // Flush a trailing line without a newline
                    None if !buffer.is_empty() => buffer.push(b'\n'),
                    None => {}
                }

                while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line);
                    match parse_stream_line(&line) {
                        StreamLine::Fragment(fragment) => {
                            chunks += 1;
                            yield Ok(fragment);
                        }
                        StreamLine::Empty => {}
                        StreamLine::Done(last) => {
                            if let Some(fragment) = last {
                                chunks += 1;
                                yield Ok(fragment);
                            }
                            debug!(chunks, "stream completed");
                            break 'read;
                        }
                        StreamLine::Failed(message) => {
                            warn!(error = %message, "stream failed");
                            yield Err(ProviderError::Stream(message));
                            break 'read;
                        }
                    }
                }

                if at_end {
                    yield Err(ProviderError::Stream(
                        "connection closed before the response was complete".to_string(),
                    ));
                    break 'read;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(OllamaProviderConfig {
            host: server.uri(),
            model: "qwen2.5".to_string(),
            temperature: None,
        })
        .unwrap()
    }

    async fn collect(stream: FragmentStream<'_>) -> Vec<Result<String, ProviderError>> {
        stream.collect().await
    }

    #[test]
    fn test_parse_stream_line() {
        assert_eq!(
            parse_stream_line(r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#),
            StreamLine::Fragment("Hel".to_string())
        );
        assert_eq!(
            parse_stream_line(r#"{"message":{"role":"assistant","content":""},"done":true}"#),
            StreamLine::Done(None)
        );
        assert_eq!(
            parse_stream_line(r#"{"message":{"role":"assistant","content":"!"},"done":true}"#),
            StreamLine::Done(Some("!".to_string()))
        );
        assert_eq!(parse_stream_line("   "), StreamLine::Empty);
        assert_eq!(
            parse_stream_line(r#"{"error":"model not found"}"#),
            StreamLine::Failed("model not found".to_string())
        );
        assert!(matches!(parse_stream_line("{nope"), StreamLine::Failed(_)));
    }

    #[tokio::test]
    async fn test_complete_tool_request_synthesizes_id() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "qwen2.5",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {"name": "read_file", "arguments": {"filename": "test.txt"}}
                    }]
                },
                "done": true
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let tool = Tool::new(
            "read_file",
            "Read the content of a file",
            json!({"type": "object", "properties": {"filename": {"type": "string"}}}),
        );
        let completion = provider
            .complete("You are a helpful assistant.", &[Message::user("read it")], &[tool])
            .await?;

        let call = &completion.tool_calls[0];
        assert!(call.id.starts_with("call_read_file_"));
        assert_eq!(call.arguments, "{\"filename\":\"test.txt\"}");
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_in_order() -> Result<()> {
        let server = MockServer::start().await;
        let body = [
            r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":"lo, "},"done":false}"#,
            r#"{"message":{"role":"assistant","content":"world"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        ]
        .join("\n");
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let items = collect(provider.stream("", &[Message::user("hi")]).await?).await;
        let fragments: Vec<String> = items.into_iter().collect::<Result<_, _>>()?;

        assert_eq!(fragments, vec!["Hel", "lo, ", "world"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_reports_error_once() -> Result<()> {
        let server = MockServer::start().await;
        let body = [
            r#"{"message":{"role":"assistant","content":"Par"},"done":false}"#,
            r#"{"error":"model crashed"}"#,
            r#"{"message":{"role":"assistant","content":"never"},"done":false}"#,
        ]
        .join("\n");
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let items = collect(provider.stream("", &[Message::user("hi")]).await?).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Par");
        assert!(items[1]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("model crashed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_truncated_response_is_an_error() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"message":{"role":"assistant","content":"Hal"},"done":false}"#,
            ))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let items = collect(provider.stream("", &[Message::user("hi")]).await?).await;

        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(ProviderError::Stream(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_server_error_before_first_fragment() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let result = provider.stream("", &[Message::user("hi")]).await;
        assert!(matches!(result, Err(ProviderError::Server(_))));
        Ok(())
    }
}
