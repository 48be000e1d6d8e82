//! Mock backend for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::traits::*;

/// A scripted reply of the mock backend.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Final text answer
    Text(String),
    /// Turn requesting these tool calls, in order
    ToolCalls(Vec<ToolCall>),
    /// Reject the exchange as a bad credential would
    Reject(String),
}

impl MockReply {
    fn into_result(self, prompt_tokens: u32) -> Result<GenerateResponse, LlmError> {
        let parts = match self {
            Self::Text(text) => vec![Part::Text(text)],
            Self::ToolCalls(calls) => calls.into_iter().map(Part::ToolCall).collect(),
            Self::Reject(reason) => return Err(LlmError::Rejected(reason)),
        };

        let completion_tokens = parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => text.len() as u32 / 4,
                _ => 8,
            })
            .sum();

        Ok(GenerateResponse {
            parts,
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens,
                completion_tokens,
            },
        })
    }
}

/// Mock backend for testing.
///
/// Replies are consumed from a script in order; once the script runs out
/// the fallback reply is repeated. Every request is recorded.
pub struct MockBackend {
    model_id: String,
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    requests: Mutex<Vec<GenerateRequest>>,
    call_count: AtomicU32,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: MockReply::Text("Mock response".to_string()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the reply used once the script is exhausted.
    pub fn with_response(mut self, content: impl Into<String>) -> Self {
        self.fallback = MockReply::Text(content.into());
        self
    }

    /// Set an arbitrary fallback reply.
    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Queue a scripted reply.
    pub fn then(self, reply: MockReply) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
        self
    }

    /// Queue a text reply.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(MockReply::Text(text.into()))
    }

    /// Queue a turn of tool calls.
    pub fn then_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.then(MockReply::ToolCalls(calls))
    }

    /// Get the number of times generate was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        // Estimate token counts
        let prompt_tokens: u32 = request
            .contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|part| match part {
                Part::Text(text) => text.len() as u32 / 4,
                Part::ToolResult(result) => result.result.len() as u32 / 4,
                Part::ToolCall(_) => 8,
            })
            .sum();

        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let reply = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        reply.into_result(prompt_tokens)
    }
}
