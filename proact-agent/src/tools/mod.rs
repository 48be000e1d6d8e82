//! Tools the model may call mid-conversation.
//!
//! The tool surface is a small fixed set built at startup; currently only
//! internet search.

pub mod registry;
pub mod search;

pub use registry::{Tool, ToolError, ToolRegistry};
pub use search::{
    register_search_tool, InternetSearchTool, SearchClient, SearchDepth, SearchError,
    TavilyClient, INTERNET_SEARCH_TOOL,
};
