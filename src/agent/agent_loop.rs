//! Core agent loop implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{ChatMessage, CompletionOptions, LlmClient};
use crate::tools::ToolRegistry;

use super::callbacks::AgentCallbacks;
use super::parser::{parse_react_output, AgentStep};
use super::prompt::{append_step, build_react_prompt, OBSERVATION_STOP};

/// Returned when the loop runs out of iterations.
pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Tool name reported when a malformed model turn is fed back as an observation.
pub const EXCEPTION_TOOL_NAME: &str = "_Exception";

/// A configured language model.
#[derive(Clone)]
pub struct ModelHandle {
    pub client: Arc<dyn LlmClient>,
    pub model: String,
    pub temperature: f32,
}

impl ModelHandle {
    /// Deterministic (zero-temperature) handle.
    pub fn deterministic(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.0,
        }
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Everything one agent run needs.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub tools: ToolRegistry,
    pub model: ModelHandle,
    pub prompt: String,
    /// Log each step at `info` instead of `debug`.
    pub verbose: bool,
    /// Feed malformed model output back as an observation instead of failing.
    pub handle_parsing_errors: bool,
}

/// A reasoning loop that turns a task into a final answer.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(
        &self,
        request: AgentRequest,
        callbacks: &dyn AgentCallbacks,
    ) -> anyhow::Result<String>;
}

/// Zero-shot ReAct agent.
pub struct ReactAgent {
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }
}

impl Default for ReactAgent {
    fn default() -> Self {
        Self::new(15)
    }
}

fn log_step(verbose: bool, iteration: usize, kind: &str, detail: &str) {
    if verbose {
        tracing::info!(iteration, kind, detail = %detail, "Agent step");
    } else {
        tracing::debug!(iteration, kind, detail = %detail, "Agent step");
    }
}

#[async_trait]
impl AgentRuntime for ReactAgent {
    async fn run(
        &self,
        request: AgentRequest,
        callbacks: &dyn AgentCallbacks,
    ) -> anyhow::Result<String> {
        let AgentRequest {
            tools,
            model,
            prompt,
            verbose,
            handle_parsing_errors,
        } = request;

        let options = CompletionOptions {
            temperature: model.temperature,
            stop: vec![OBSERVATION_STOP.to_string()],
        };
        let mut scratchpad = String::new();

        for iteration in 1..=self.max_iterations {
            let step_prompt = build_react_prompt(&tools, &prompt, &scratchpad);

            callbacks.on_llm_start()?;
            let response = model
                .client
                .chat_completion(&model.model, &[ChatMessage::user(step_prompt)], &options)
                .await?;
            callbacks.on_llm_end()?;

            if response.is_truncated() {
                tracing::warn!(iteration, "Model output cut at the token limit");
            }
            let output = response.content;
            log_step(verbose, iteration, "llm_output", &output);

            match parse_react_output(&output) {
                Ok(AgentStep::Finish { output: answer, thought }) => {
                    if !thought.is_empty() {
                        callbacks.on_text(&thought)?;
                    }
                    log_step(verbose, iteration, "final_answer", &answer);
                    return Ok(answer);
                }
                Ok(AgentStep::Action {
                    tool,
                    input,
                    thought,
                }) => {
                    if !thought.is_empty() {
                        callbacks.on_text(&thought)?;
                    }
                    callbacks.on_tool_start(&tool, &input)?;

                    let observation = match tools.get(&tool) {
                        Some(t) => t.execute(&input).await?,
                        None => format!(
                            "{} is not a valid tool, try one of [{}].",
                            tool,
                            tools.names().join(", ")
                        ),
                    };

                    callbacks.on_tool_end(&observation)?;
                    log_step(verbose, iteration, "observation", &observation);
                    append_step(&mut scratchpad, &output, &observation);
                }
                Err(e) => {
                    if !handle_parsing_errors {
                        return Err(e.into());
                    }
                    tracing::warn!(iteration, error = %e.observation, "Malformed agent output");

                    callbacks.on_tool_start(EXCEPTION_TOOL_NAME, &e.observation)?;
                    callbacks.on_tool_end(&e.observation)?;
                    append_step(&mut scratchpad, &output, &e.observation);
                }
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "Agent hit iteration limit");
        Ok(ITERATION_LIMIT_MESSAGE.to_string())
    }
}
