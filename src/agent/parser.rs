//! Parser for ReAct-formatted model output.

use std::sync::OnceLock;

use regex::Regex;

pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";

const MISSING_ACTION_AFTER_THOUGHT: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
const MISSING_ACTION_INPUT_AFTER_ACTION: &str =
    "Invalid Format: Missing 'Action Input:' after 'Action:'";
const FINAL_ANSWER_AND_ACTION: &str =
    "Parsing LLM output produced both a final answer and a parse-able action";

/// What the model decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    Action {
        tool: String,
        input: String,
        thought: String,
    },
    Finish {
        output: String,
        thought: String,
    },
}

/// The model's output did not follow the format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Could not parse LLM output: `{llm_output}`: {observation}")]
pub struct OutputParseError {
    /// Text fed back to the model when parse errors are tolerated.
    pub observation: String,
    pub llm_output: String,
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("static regex")
    })
}

fn bare_action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("static regex"))
}

fn action_input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").expect("static regex")
    })
}

/// Reasoning text that precedes `marker_start`, without a leading `Thought:`.
fn thought_before(text: &str, marker_start: usize) -> String {
    let head = text[..marker_start].trim();
    head.strip_prefix("Thought:").unwrap_or(head).trim().to_string()
}

fn parse_error(observation: &str, text: &str) -> OutputParseError {
    OutputParseError {
        observation: observation.to_string(),
        llm_output: text.to_string(),
    }
}

/// Parse one model turn into an action or a final answer.
pub fn parse_react_output(text: &str) -> Result<AgentStep, OutputParseError> {
    let final_answer_at = text.find(FINAL_ANSWER_ACTION);

    if let Some(caps) = action_regex().captures(text) {
        if final_answer_at.is_some() {
            return Err(parse_error(FINAL_ANSWER_AND_ACTION, text));
        }

        let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let tool = caps.get(1).map(|m| m.as_str()).unwrap_or("").trim();
        let input = caps
            .get(2)
            .map(|m| m.as_str())
            .unwrap_or("")
            .trim_matches(' ')
            .trim_matches('"');

        return Ok(AgentStep::Action {
            tool: tool.to_string(),
            input: input.to_string(),
            thought: thought_before(text, whole),
        });
    }

    if let Some(at) = final_answer_at {
        let output = text
            .rsplit(FINAL_ANSWER_ACTION)
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        return Ok(AgentStep::Finish {
            output,
            thought: thought_before(text, at),
        });
    }

    if !bare_action_regex().is_match(text) {
        return Err(parse_error(MISSING_ACTION_AFTER_THOUGHT, text));
    }
    if !action_input_regex().is_match(text) {
        return Err(parse_error(MISSING_ACTION_INPUT_AFTER_ACTION, text));
    }
    Err(parse_error(&format!("Could not parse LLM output: `{}`", text), text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_with_thought() {
        let text = " I need reviews of both shoes.\nAction: Search\nAction Input: \"Nike Pegasus reviews\"";
        assert_eq!(
            parse_react_output(text).unwrap(),
            AgentStep::Action {
                tool: "Search".to_string(),
                input: "Nike Pegasus reviews".to_string(),
                thought: "I need reviews of both shoes.".to_string(),
            }
        );
    }

    #[test]
    fn parses_numbered_action() {
        let text = "Thought: look it up\nAction 1: Search\nAction 1 Input: Ultraboost price";
        match parse_react_output(text).unwrap() {
            AgentStep::Action {
                tool,
                input,
                thought,
            } => {
                assert_eq!(tool, "Search");
                assert_eq!(input, "Ultraboost price");
                assert_eq!(thought, "look it up");
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn parses_final_answer() {
        let text = " I now know the final answer\nFinal Answer: Nike: light; Adidas: bouncy";
        assert_eq!(
            parse_react_output(text).unwrap(),
            AgentStep::Finish {
                output: "Nike: light; Adidas: bouncy".to_string(),
                thought: "I now know the final answer".to_string(),
            }
        );
    }

    #[test]
    fn final_answer_uses_last_marker() {
        let text = "Final Answer: draft\nFinal Answer: real";
        match parse_react_output(text).unwrap() {
            AgentStep::Finish { output, .. } => assert_eq!(output, "real"),
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn rejects_answer_and_action_together() {
        let text = "Action: Search\nAction Input: x\nFinal Answer: y";
        let err = parse_react_output(text).unwrap_err();
        assert_eq!(err.observation, FINAL_ANSWER_AND_ACTION);
    }

    #[test]
    fn reports_missing_action() {
        let err = parse_react_output("I am just musing").unwrap_err();
        assert_eq!(err.observation, MISSING_ACTION_AFTER_THOUGHT);
        assert_eq!(err.llm_output, "I am just musing");
    }

    #[test]
    fn reports_missing_action_input() {
        let err = parse_react_output("Thought: hmm\nAction: Search").unwrap_err();
        assert_eq!(err.observation, MISSING_ACTION_INPUT_AFTER_ACTION);
    }
}
