//! Conversation driver.
//!
//! Runs the request/response loop with the backend for one prompt. Tool
//! calls in a response are executed in order and their results fed back
//! before resubmitting, until the model answers with text only or the
//! round bound is hit.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::traits::{Content, GenerateRequest, GenerateResponse, LlmBackend, LlmError};
use crate::config::ConversationConfig;
use crate::tools::{ToolError, ToolRegistry};

/// Where a conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    /// Waiting on the backend
    AwaitingResponse,
    /// The last response asked for tools
    ToolCallPending,
    /// Final text received
    Complete,
    /// Aborted with an error
    Failed,
}

/// Error types for a conversation.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    /// The model kept calling tools past the round bound
    #[error("Conversation exceeded {max_rounds} submissions without a final answer")]
    DepthExceeded { max_rounds: usize },

    /// The backend refused the exchange
    #[error("Backend rejected the conversation: {0}")]
    BackendRejected(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(LlmError),

    /// A tool failed
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Cancelled or timed out
    #[error("Conversation cancelled: {0}")]
    Cancelled(String),
}

impl From<LlmError> for ConversationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Rejected(reason) => Self::BackendRejected(reason),
            other => Self::Backend(other),
        }
    }
}

/// Outcome of a completed conversation.
#[derive(Debug, Clone)]
pub struct ConversationResult {
    /// Concatenated text of the final response
    pub text: String,
    /// Backend submissions made
    pub rounds: usize,
    /// Tool calls executed
    pub tool_calls: usize,
    /// Full history, final response included
    pub history: Vec<Content>,
}

/// Drives one prompt to a final text answer.
pub struct ConversationDriver {
    backend: Arc<dyn LlmBackend>,
    tools: Arc<ToolRegistry>,
    config: ConversationConfig,
    system_instruction: Option<String>,
    temperature: Option<f32>,
}

impl ConversationDriver {
    /// Create a driver with default configuration.
    pub fn new(backend: Arc<dyn LlmBackend>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            backend,
            tools,
            config: ConversationConfig::default(),
            system_instruction: None,
            temperature: None,
        }
    }

    /// Create with configuration.
    pub fn with_config(mut self, config: ConversationConfig) -> Self {
        self.config = config;
        self
    }

    /// Send a system instruction with every submission.
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Sampling temperature for every submission.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Run the conversation for a prompt.
    pub async fn run(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<ConversationResult, ConversationError> {
        let mut history = vec![Content::user_text(prompt)];
        let mut rounds = 0;
        let mut tool_calls = 0;
        let mut state = ConversationState::AwaitingResponse;

        loop {
            if rounds >= self.config.max_rounds {
                warn!(
                    max_rounds = self.config.max_rounds,
                    tool_calls, "Conversation depth exceeded"
                );
                return Err(ConversationError::DepthExceeded {
                    max_rounds: self.config.max_rounds,
                });
            }

            rounds += 1;
            debug!(round = rounds, ?state, history_len = history.len(), "Submitting conversation");

            let response = match self.submit(&history, cancel).await {
                Ok(response) => response,
                Err(e) => {
                    state = ConversationState::Failed;
                    if let ConversationError::BackendRejected(reason) = &e {
                        error!(round = rounds, %reason, ?state, "Backend rejected the conversation");
                    }
                    return Err(e);
                }
            };

            if !response.has_tool_calls() {
                state = ConversationState::Complete;
                let text = response.text();
                info!(rounds, tool_calls, ?state, "Conversation complete");
                history.push(response.into_content());
                return Ok(ConversationResult {
                    text,
                    rounds,
                    tool_calls,
                    history,
                });
            }

            state = ConversationState::ToolCallPending;
            let calls: Vec<_> = response.tool_calls().cloned().collect();
            history.push(response.into_content());

            for call in calls {
                if cancel.is_cancelled() {
                    return Err(ConversationError::Cancelled(
                        "cancelled before tool call".to_string(),
                    ));
                }
                let result = self.tools.invoke(&call.name, call.args).await?;
                history.push(Content::tool_result(call.name, result));
                tool_calls += 1;
            }

            state = ConversationState::AwaitingResponse;
        }
    }

    async fn submit(
        &self,
        history: &[Content],
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse, ConversationError> {
        let mut request = GenerateRequest::new(history.to_vec()).with_tools(self.tools.declarations());
        if let Some(system) = &self.system_instruction {
            request = request.with_system(system.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let start = Instant::now();
        let call = async {
            match self.config.call_timeout() {
                Some(limit) => match tokio::time::timeout(limit, self.backend.generate(request)).await {
                    Ok(result) => result.map_err(ConversationError::from),
                    Err(_) => Err(ConversationError::Cancelled(format!(
                        "backend call timed out after {}ms",
                        limit.as_millis()
                    ))),
                },
                None => self.backend.generate(request).await.map_err(ConversationError::from),
            }
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ConversationError::Cancelled("cancelled by caller".to_string()));
            }
            result = call => result?,
        };

        debug!(
            backend = self.backend.id(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            tokens = response.usage.total(),
            "Backend responded"
        );

        Ok(response)
    }
}
