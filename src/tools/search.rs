//! The `Search` tool: a thin descriptor over a web-search backend.

use std::sync::Arc;

use async_trait::async_trait;

use super::Tool;

/// Anything that can answer a free-text web query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn run(&self, query: &str) -> anyhow::Result<String>;
}

/// Tool named `Search` that delegates to a `SearchProvider`.
pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl SearchTool {
    pub const NAME: &'static str = "Search";
    pub const DESCRIPTION: &'static str = "Useful for finding product info";

    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        // Models often wrap the query in quotes.
        let query = input.trim().trim_matches('"').trim();
        tracing::debug!(query = %query, "Running web search");
        self.provider.run(query).await
    }
}
