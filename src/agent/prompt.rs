//! Prompt templates for the zero-shot ReAct agent.

use crate::tools::ToolRegistry;

const PREFIX: &str = "Answer the following questions as best you can. You have access to the following tools:";

const SUFFIX: &str = "Begin!";

/// Stop sequence that keeps the model from inventing observations.
pub const OBSERVATION_STOP: &str = "\nObservation:";

/// Build the full prompt for one agent step.
///
/// `scratchpad` holds the previous steps, each ending in `Thought: ` so the
/// model continues with its next reasoning line.
pub fn build_react_prompt(tools: &ToolRegistry, question: &str, scratchpad: &str) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    let tool_names = tools.names().join(", ");

    format!(
        r#"{PREFIX}

{tool_descriptions}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

{SUFFIX}

Question: {question}
Thought:{scratchpad}"#
    )
}

/// Append one completed step to the scratchpad.
pub fn append_step(scratchpad: &mut String, model_output: &str, observation: &str) {
    scratchpad.push_str(model_output);
    scratchpad.push_str("\nObservation: ");
    scratchpad.push_str(observation);
    scratchpad.push_str("\nThought: ");
}
