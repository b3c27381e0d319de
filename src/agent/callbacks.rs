//! Lifecycle notifications emitted while the agent runs.

use serde::Serialize;

/// One notification from the agent loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A model call is about to be made.
    ModelStart,
    /// A model call returned.
    ModelEnd,
    /// A tool is about to run.
    ToolStart { name: String, input: String },
    /// A tool returned.
    ToolEnd { output: String },
    /// Intermediate reasoning text.
    Thought { text: String },
}

/// Receiver of lifecycle events, one method per kind.
///
/// Errors returned here abort the run; the agent never swallows them.
pub trait AgentCallbacks: Send + Sync {
    fn on_llm_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_llm_end(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_tool_start(&self, name: &str, input: &str) -> anyhow::Result<()>;

    fn on_tool_end(&self, output: &str) -> anyhow::Result<()>;

    fn on_text(&self, text: &str) -> anyhow::Result<()>;

    /// Dispatch a tagged event to the matching method.
    fn on_event(&self, event: &LifecycleEvent) -> anyhow::Result<()> {
        match event {
            LifecycleEvent::ModelStart => self.on_llm_start(),
            LifecycleEvent::ModelEnd => self.on_llm_end(),
            LifecycleEvent::ToolStart { name, input } => self.on_tool_start(name, input),
            LifecycleEvent::ToolEnd { output } => self.on_tool_end(output),
            LifecycleEvent::Thought { text } => self.on_text(text),
        }
    }
}
