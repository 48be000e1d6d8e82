//! Configuration for mission generation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backend::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::tools::search::DEFAULT_SEARCH_URL;

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the Tavily API key.
pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Generative backend
    pub gemini: GeminiConfig,
    /// Internet search
    pub search: SearchConfig,
    /// Conversation driver
    pub conversation: ConversationConfig,
    /// Orchestrator and prompt settings
    pub generation: GenerationConfig,
}

impl AgentConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Fill API keys from the environment where the file left them unset.
    pub fn with_env_overrides(mut self) -> Self {
        if self.gemini.api_key.is_none() {
            self.gemini.api_key = std::env::var(GEMINI_API_KEY_ENV).ok();
        }
        if self.search.api_key.is_none() {
            self.search.api_key = std::env::var(TAVILY_API_KEY_ENV).ok();
        }
        self
    }
}

/// Gemini backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Model name
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// API key
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: None,
        }
    }
}

/// Search provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// API base URL
    pub base_url: String,
    /// API key; the search tool is only registered when set
    pub api_key: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_URL.to_string(),
            api_key: None,
        }
    }
}

/// Conversation driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Maximum backend submissions per conversation
    pub max_rounds: usize,
    /// Per-submission timeout (ms)
    pub call_timeout_ms: Option<u64>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            call_timeout_ms: Some(60_000),
        }
    }
}

impl ConversationConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

/// Word ceilings written into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLimits {
    pub title_words: usize,
    pub description_words: usize,
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Missions requested when the caller does not say
    pub default_count: usize,
    /// Prompt → conversation → parse attempts before giving up
    pub max_attempts: u32,
    /// Limits for weekly missions
    pub weekly_limits: PromptLimits,
    /// Limits for ongoing missions
    pub ongoing_limits: PromptLimits,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_count: 3,
            max_attempts: 5,
            weekly_limits: PromptLimits {
                title_words: 8,
                description_words: 40,
            },
            ongoing_limits: PromptLimits {
                title_words: 10,
                description_words: 80,
            },
        }
    }
}
