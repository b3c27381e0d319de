//! Rendering of agent lifecycle events onto the page.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::agent::AgentCallbacks;

/// Maximum number of characters of tool output shown per block.
pub const TOOL_OUTPUT_LIMIT: usize = 500;

/// Kind of a rendered log block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    ToolCall,
    ToolOutput,
    Thought,
}

/// One line in the page's log region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogBlock {
    pub kind: LogKind,
    /// Plain-text rendering, e.g. `Tool Output: ...`
    pub text: String,
    /// Markdown rendering shown on the page: bold label, code spans for tool name and input.
    pub markdown: String,
    /// Creation time (RFC 3339)
    pub timestamp: String,
}

impl LogBlock {
    pub fn tool_call(name: &str, input: &str) -> Self {
        Self::new(
            LogKind::ToolCall,
            format!("Tool Call: {} with input: {}", name, input),
            format!("**Tool Call:** `{}` with input: `{}`", name, input),
        )
    }

    pub fn tool_output(output: &str) -> Self {
        let shown = truncate_output(output);
        Self::new(
            LogKind::ToolOutput,
            format!("Tool Output: {}", shown),
            format!("**Tool Output:** {}", shown),
        )
    }

    pub fn thought(text: &str) -> Self {
        Self::new(
            LogKind::Thought,
            format!("Agent Thought: {}", text),
            format!("**Agent Thought:** {}", text),
        )
    }

    fn new(kind: LogKind, text: String, markdown: String) -> Self {
        Self {
            kind,
            text,
            markdown,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Cut tool output to `TOOL_OUTPUT_LIMIT` characters, marking the cut with `...`.
pub fn truncate_output(output: &str) -> String {
    match output.char_indices().nth(TOOL_OUTPUT_LIMIT) {
        Some((cut, _)) => format!("{}...", &output[..cut]),
        None => output.to_string(),
    }
}

/// Everything the page can display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    Info { message: String },
    Log { block: LogBlock },
    Success { message: String },
    Summary { heading: String, content: String },
    Error { message: String },
    Done,
}

impl PageEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            PageEvent::Info { .. } => "info",
            PageEvent::Log { .. } => "log",
            PageEvent::Success { .. } => "success",
            PageEvent::Summary { .. } => "summary",
            PageEvent::Error { .. } => "error",
            PageEvent::Done => "done",
        }
    }
}

/// Output region of the page.
pub trait PageSink: Send + Sync {
    fn emit(&self, event: PageEvent) -> anyhow::Result<()>;
}

/// Page that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryPage {
    events: Mutex<Vec<PageEvent>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn log_texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PageEvent::Log { block } => Some(block.text),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> Option<(String, String)> {
        self.events().into_iter().find_map(|e| match e {
            PageEvent::Summary { heading, content } => Some((heading, content)),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PageEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl PageSink for MemoryPage {
    fn emit(&self, event: PageEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("page state poisoned"))?
            .push(event);
        Ok(())
    }
}

/// Page backed by a channel drained by a streaming response.
pub struct ChannelPage {
    tx: mpsc::UnboundedSender<PageEvent>,
}

impl ChannelPage {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PageSink for ChannelPage {
    fn emit(&self, event: PageEvent) -> anyhow::Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow::anyhow!("page disconnected"))
    }
}

/// Forwards tool and reasoning events to the page log, one block per event.
///
/// Model start/end notifications are deliberately not rendered.
pub struct LogRenderer {
    sink: Arc<dyn PageSink>,
}

impl LogRenderer {
    pub fn new(sink: Arc<dyn PageSink>) -> Self {
        Self { sink }
    }

    fn append(&self, block: LogBlock) -> anyhow::Result<()> {
        self.sink.emit(PageEvent::Log { block })
    }
}

impl AgentCallbacks for LogRenderer {
    fn on_llm_start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_llm_end(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_tool_start(&self, name: &str, input: &str) -> anyhow::Result<()> {
        self.append(LogBlock::tool_call(name, input))
    }

    fn on_tool_end(&self, output: &str) -> anyhow::Result<()> {
        self.append(LogBlock::tool_output(output))
    }

    fn on_text(&self, text: &str) -> anyhow::Result<()> {
        self.append(LogBlock::thought(text))
    }
}
