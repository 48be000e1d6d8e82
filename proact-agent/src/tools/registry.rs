//! Registry of tools the model may call.
//!
//! The registry is filled once at startup and then shared read-only, so it
//! needs no lock.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::search::SearchError;
use crate::backend::traits::ToolDeclaration;
use crate::parser::json_type_name;

/// Errors raised while resolving or running a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under this name
    #[error("Unknown tool `{0}`")]
    UnknownTool(String),

    /// Tool broke the string-result contract
    #[error("Tool `{name}` returned {found}, expected a string")]
    ToolResultTypeError { name: String, found: &'static str },

    /// Arguments did not fit the tool's parameters
    #[error("Invalid arguments for tool `{name}`: {reason}")]
    InvalidArguments { name: String, reason: String },

    /// No search credential was configured
    #[error("Internet search unavailable: {0}")]
    SearchUnavailable(String),

    /// The search collaborator failed
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration sent to the model.
    fn declaration(&self) -> ToolDeclaration;

    /// Run the tool with keyword arguments.
    ///
    /// The result is re-embedded into the conversation as text, so it must
    /// be a JSON string.
    async fn call(&self, args: Map<String, Value>) -> Result<Value, ToolError>;
}

/// Name-keyed set of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration under the same name wins.
    pub fn register(&mut self, name: impl Into<String>, tool: Arc<dyn Tool>) {
        let name = name.into();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Tool replaced in toolbox");
        }
        info!(tool = %name, "Tool added to toolbox");
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Declarations for every tool, sorted by name. Each declaration is
    /// published under the name it was registered with.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                self.tools.get(&name).map(|tool| ToolDeclaration {
                    name,
                    ..tool.declaration()
                })
            })
            .collect()
    }

    /// Run the named tool and return its textual result.
    pub async fn invoke(&self, name: &str, args: Map<String, Value>) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        info!(tool = %name, params = ?args, "Tool call requested");

        let output = tool.call(args).await?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match output {
            Value::String(text) => {
                info!(tool = %name, elapsed_ms, "Tool call finished");
                debug!(tool = %name, result = %text, "Tool result");
                Ok(text)
            }
            other => {
                warn!(tool = %name, found = json_type_name(&other), "Tool returned a non-string result");
                Err(ToolError::ToolResultTypeError {
                    name: name.to_string(),
                    found: json_type_name(&other),
                })
            }
        }
    }
}
