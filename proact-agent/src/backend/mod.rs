//! Generative backend abstraction layer.
//!
//! Provides a trait-based interface over the model that writes missions:
//! - Gemini `generateContent` over HTTP
//! - Mock backend for testing

pub mod gemini;
pub mod mock;
pub mod traits;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};
pub use traits::{
    Content, GenerateRequest, GenerateResponse, LlmBackend, LlmError, Part, Role, ToolCall,
    ToolDeclaration, ToolResult,
};
