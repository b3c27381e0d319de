//! # Insight Agent
//!
//! A demo web page that compares two products for a marketing campaign using
//! an autonomous, tool-using agent.
//!
//! This library provides:
//! - An HTTP API serving the page and streaming run progress via SSE
//! - A zero-shot ReAct agent loop with lifecycle callbacks
//! - A SerpAPI-backed `Search` tool and an OpenAI-compatible LLM client
//!
//! ## Architecture
//!
//! 1. The page submits two product names (and optionally API keys)
//! 2. The controller validates credentials and builds the `Search` tool
//! 3. The agent alternates between model calls and tool calls
//! 4. Each tool call, tool output, and thought is rendered as a log block
//! 5. The final answer is shown under "Marketing Summary"
//!
//! ## Example
//!
//! ```rust,ignore
//! use insight_agent::{config::Config, page::{MemoryPage, PageController, RunForm}};
//!
//! let config = Config::from_env()?;
//! let controller = PageController::from_config(config);
//! let page = std::sync::Arc::new(MemoryPage::new());
//! let outcome = controller
//!     .submit(RunForm::products("Nike Pegasus", "Adidas Ultraboost"), page.clone())
//!     .await;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod page;
pub mod tools;

pub use config::Config;
