use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Completion, FragmentStream, Provider};

/// A mock provider that returns pre-configured responses for testing.
/// Clones share the same script.
#[derive(Clone)]
pub struct MockProvider {
    completions: Arc<Mutex<VecDeque<Result<Completion, ProviderError>>>>,
    streams: Arc<Mutex<VecDeque<Vec<Result<String, ProviderError>>>>>,
    streaming: bool,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new buffered mock provider with a sequence of completions
    pub fn new(completions: Vec<Completion>) -> Self {
        Self {
            completions: Arc::new(Mutex::new(completions.into_iter().map(Ok).collect())),
            streams: Arc::new(Mutex::new(VecDeque::new())),
            streaming: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Completions that may fail
    pub fn with_results(results: Vec<Result<Completion, ProviderError>>) -> Self {
        let provider = Self::new(Vec::new());
        *provider.completions.lock().unwrap() = results.into_iter().collect();
        provider
    }

    /// Make the provider streaming, answering each `stream` call with the next script
    pub fn streaming(mut self, streams: Vec<Vec<Result<String, ProviderError>>>) -> Self {
        self.streaming = true;
        self.streams = Arc::new(Mutex::new(streams.into_iter().collect()));
        self
    }

    /// Histories seen by `complete`, in call order
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[Tool],
    ) -> Result<Completion, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        // Empty response once the script runs out
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Completion::default()))
    }

    async fn stream(
        &self,
        _system: &str,
        _messages: &[Message],
    ) -> Result<FragmentStream<'_>, ProviderError> {
        if !self.streaming {
            return Err(ProviderError::StreamingUnsupported(self.name().to_string()));
        }
        let script = self.streams.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(script)))
    }
}
