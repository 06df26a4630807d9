// ABOUTME: Prompt rendering for the ReAct protocol - system prompt with the
// ABOUTME: tool catalog, observation formatting, and corrective instructions.

use crate::llm::ToolDefinition;

use super::parser::ParseError;

/// Preamble used when the configuration does not supply one.
pub const DEFAULT_PREAMBLE: &str = "Answer the following question as accurately as you can. \
You cannot see any data directly; use the tools below to look things up or compute results.";

/// Render the tool catalog, one tool per line with its argument schema.
pub fn render_catalog(catalog: &[ToolDefinition]) -> String {
    catalog
        .iter()
        .map(|t| format!("{}: {}. Arguments: {}", t.name, t.description, t.input_schema))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full system prompt: preamble, catalog, and protocol rules.
pub fn system_prompt(preamble: Option<&str>, catalog: &[ToolDefinition]) -> String {
    let names: Vec<&str> = catalog.iter().map(|t| t.name.as_str()).collect();
    format!(
        "{preamble}\n\n\
         You have access to the following tools:\n\n\
         {tools}\n\n\
         To use a tool, reply in exactly this format:\n\n\
         Thought: your reasoning about what to do next\n\
         Action: the tool to use, one of [{names}]\n\
         Action Input: the arguments as a JSON object, or None if the tool takes no arguments\n\n\
         Then stop and wait. The result will be sent back to you prefixed with \"Observation:\". \
         Never write an Observation yourself. Request one action per reply.\n\n\
         When you know the answer, reply in exactly this format:\n\n\
         Thought: I now know the final answer\n\
         Final Answer: the answer to the original question",
        preamble = preamble.unwrap_or(DEFAULT_PREAMBLE),
        tools = render_catalog(catalog),
        names = names.join(", "),
    )
}

/// Text appended to the context for a tool result.
pub fn observation(rendered: &str, max_chars: Option<usize>) -> String {
    match max_chars {
        Some(max) if rendered.chars().count() > max => {
            let cut: String = rendered.chars().take(max).collect();
            format!("Observation: {}\n[truncated, {} characters total]", cut, rendered.chars().count())
        }
        _ => format!("Observation: {}", rendered),
    }
}

/// Instruction sent back to the model after output it failed to parse.
pub fn correction(error: &ParseError) -> String {
    format!(
        "Your last reply could not be processed: {}. \
         Reply with either\n\
         Action: <tool name>\nAction Input: <JSON object>\n\
         or\n\
         Final Answer: <answer>",
        error
    )
}
