//! Tools the agent can call.
//!
//! A tool is a named capability with a natural-language description the
//! model reads when deciding what to do next. Tools take the raw
//! `Action Input` text and return an observation string.

mod search;
mod web;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

pub use search::{SearchProvider, SearchTool};
pub use web::SerpApiClient;

/// A capability offered to the agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to select this tool.
    fn name(&self) -> &str;

    /// What the tool is useful for.
    fn description(&self) -> &str;

    /// Run the tool on the model-provided input.
    async fn execute(&self, input: &str) -> anyhow::Result<String>;
}

/// Name/description pair for prompts and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Ordered set of tools with unique names.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; names must be unique within one registry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> anyhow::Result<()> {
        if self.get(tool.name()).is_some() {
            anyhow::bail!("Tool '{}' is already registered", tool.name());
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
