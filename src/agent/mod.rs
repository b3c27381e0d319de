//! Agent module - the reasoning loop.
//!
//! The agent follows the zero-shot ReAct pattern:
//! 1. Describe the available tools and the task to the model
//! 2. The model answers with a Thought plus either an Action or a Final Answer
//! 3. Actions run a tool; the result is appended as an Observation
//! 4. Repeat until a final answer or the iteration limit
//!
//! Every step is reported to an [`AgentCallbacks`] implementation.

mod agent_loop;
mod callbacks;
mod parser;
mod prompt;

pub use agent_loop::{
    AgentRequest, AgentRuntime, ModelHandle, ReactAgent, EXCEPTION_TOOL_NAME,
    ITERATION_LIMIT_MESSAGE,
};
pub use callbacks::{AgentCallbacks, LifecycleEvent};
pub use parser::{parse_react_output, AgentStep, OutputParseError};
pub use prompt::build_react_prompt;
