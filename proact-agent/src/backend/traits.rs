//! Core traits for generative backends.
//!
//! This module defines the `LlmBackend` trait and the conversation types it
//! exchanges. A response is an ordered list of parts, each either text or a
//! request to call one of the tools offered with the request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error types for backend operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The backend refused the exchange (invalid credential or argument)
    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    /// Backend is not available
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Rate limited by the backend
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Request failed for another reason
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Core trait for generative backends.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Get the backend identifier (e.g., model name).
    fn id(&self) -> &str;

    /// Submit the full conversation and return the model's next turn.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

/// Request for the next model turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// System instruction (optional)
    pub system_instruction: Option<String>,
    /// Full conversation so far
    pub contents: Vec<Content>,
    /// Tools the model may call
    pub tools: Vec<ToolDeclaration>,
    /// Temperature (0.0-2.0)
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    /// Create a request from a conversation history.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Default::default()
        }
    }

    /// Create a request with a single user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(vec![Content::user_text(text)])
    }

    /// Offer tools to the model.
    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    /// Add a system instruction.
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp.clamp(0.0, 2.0));
        self
    }
}

/// Function declaration offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object
    pub parameters: Value,
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// User turn with plain text.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Model turn with plain text.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// User turn carrying a tool's result back to the model.
    pub fn tool_result(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::ToolResult(ToolResult {
                name: name.into(),
                result: result.into(),
            })],
        }
    }
}

/// Part of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// Request from the model to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Keyword arguments
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Textual result of a tool call, keyed by the tool's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub result: String,
}

/// The model's next turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Parts in the order the model produced them
    pub parts: Vec<Part>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Token usage
    pub usage: Usage,
}

impl GenerateResponse {
    /// Response made of a single text part.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    /// Tool-call parts in order.
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::ToolCall(call) => Some(call),
            _ => None,
        })
    }

    /// Whether any part asks for a tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }

    /// Concatenated text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// This response as a model turn for the history.
    pub fn into_content(self) -> Content {
        Content {
            role: Role::Model,
            parts: self.parts,
        }
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max tokens limit
    Length,
    /// Content was filtered
    ContentFilter,
    /// Anything else the backend reports
    Other,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl Usage {
    /// Get total tokens.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}
