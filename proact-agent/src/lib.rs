//! Proact Agent - personalised environmental mission generation
//!
//! Provides the pipeline that turns a user's profile into new missions:
//! - Trait-based generative backends (Gemini, mock)
//! - A small tool registry the model can call mid-conversation (internet search)
//! - A conversation driver that executes tool calls until a final answer
//! - A two-pass parser from the model's JSON answer to mission trees
//! - Bounded regeneration and children-first persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           MissionGenerator              │
//! │  (prompt → conversation → parse → save) │
//! └───────┬───────────────┬─────────────┬───┘
//!         │               │             │
//!         ▼               ▼             ▼
//! ┌──────────────┐ ┌─────────────┐ ┌─────────────┐
//! │ Conversation │ │   Parser    │ │MissionStore │
//! │   Driver     │ │ (two-pass)  │ │             │
//! └──────┬───────┘ └─────────────┘ └─────────────┘
//!        │
//!   ┌────┴─────────┐
//!   ▼              ▼
//! ┌────────────┐ ┌──────────────┐
//! │ LlmBackend │ │ ToolRegistry │
//! │  (Gemini)  │ │  (search)    │
//! └────────────┘ └──────────────┘
//! ```

pub mod audit;
pub mod backend;
pub mod config;
pub mod conversation;
pub mod parser;
pub mod prompt;
pub mod service;
pub mod store;
pub mod tools;

// Re-export main types for convenience
pub use audit::{AttemptOutcome, AttemptRecord, GenerationLog};
pub use backend::traits::{GenerateRequest, GenerateResponse, LlmBackend, LlmError};
pub use config::AgentConfig;
pub use conversation::{ConversationDriver, ConversationError, ConversationResult};
pub use parser::{parse_missions, ParseError};
pub use prompt::{PromptBuilder, NO_PAST_MISSIONS};
pub use service::{GenerationError, MissionGenerator, MissionPrompter, MissionRequest};
pub use store::{InMemoryMissionStore, MissionStore, StoreError, UserProfile};
pub use tools::{ToolError, ToolRegistry};
