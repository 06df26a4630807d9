// ABOUTME: Parser for the ReAct text protocol - extracts a final answer or a
// ABOUTME: tool call (Action / Action Input) from raw model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::tool::ToolCall;

// A marker label at the start of a line, tolerating indentation and
// markdown emphasis such as `**Action:**`.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:\*\*|__)?[ \t]*(thought|action[ \t]+input|action|final[ \t]+answer|observation)[ \t]*(?:\*\*|__)?[ \t]*:[ \t]*(?:\*\*|__)?",
    )
    .expect("marker pattern is valid")
});

static TOOL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-/]+$").expect("tool name pattern is valid"));

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n?(.*?)\n?[ \t]*```$").expect("fence pattern is valid")
});

/// What the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    /// The run is finished with this answer.
    FinalAnswer(String),

    /// Run a tool and report back.
    Tool(ToolCall),
}

/// A successfully parsed model turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    pub thought: Option<String>,
    pub action: AgentAction,
}

/// Why model output did not follow the protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("the response was empty")]
    Empty,

    #[error("the response contains neither an 'Action:' nor a 'Final Answer:' marker")]
    MissingMarkers,

    #[error("the response is ambiguous: {0}")]
    Ambiguous(String),

    #[error("'Action:' must be followed by an 'Action Input:' line")]
    MissingActionInput,

    #[error("'{0}' is not a valid tool name")]
    InvalidToolName(String),

    #[error("the Action Input could not be parsed: {0}")]
    InvalidActionInput(String),

    #[error("'Final Answer:' is not followed by any text")]
    EmptyFinalAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    ActionInput,
    FinalAnswer,
    Observation,
}

impl Marker {
    fn from_label(label: &str) -> Self {
        let normalized: String = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "thought" => Marker::Thought,
            "action" => Marker::Action,
            "action input" => Marker::ActionInput,
            "final answer" => Marker::FinalAnswer,
            _ => Marker::Observation,
        }
    }
}

/// Parse one model response.
///
/// Everything after the first `Observation:` marker is ignored: the model
/// is not allowed to invent tool results.
pub fn parse_output(text: &str) -> Result<ParsedOutput, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut sections: Vec<(Marker, &str)> = Vec::new();
    let matches: Vec<_> = MARKER.captures_iter(text).collect();
    let preamble = matches
        .first()
        .and_then(|c| c.get(0))
        .map_or(text, |m| &text[..m.start()]);

    for (i, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let marker = Marker::from_label(label.as_str());
        if marker == Marker::Observation {
            break;
        }
        sections.push((marker, text[whole.end()..end].trim()));
    }

    let count = |m: Marker| sections.iter().filter(|(k, _)| *k == m).count();
    let first = |m: Marker| sections.iter().find(|(k, _)| *k == m).map(|(_, v)| *v);

    let thought = first(Marker::Thought)
        .or_else(|| Some(preamble.trim()))
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let actions = count(Marker::Action);
    let finals = count(Marker::FinalAnswer);

    if actions > 0 && finals > 0 {
        return Err(ParseError::Ambiguous(
            "it contains both an 'Action:' and a 'Final Answer:'".to_string(),
        ));
    }
    if actions > 1 || count(Marker::ActionInput) > 1 {
        return Err(ParseError::Ambiguous(
            "it requests more than one action".to_string(),
        ));
    }
    if finals > 1 {
        return Err(ParseError::Ambiguous(
            "it contains more than one 'Final Answer:'".to_string(),
        ));
    }

    if let Some(answer) = first(Marker::FinalAnswer) {
        if answer.is_empty() {
            return Err(ParseError::EmptyFinalAnswer);
        }
        return Ok(ParsedOutput {
            thought,
            action: AgentAction::FinalAnswer(answer.to_string()),
        });
    }

    let Some(action_pos) = sections.iter().position(|(k, _)| *k == Marker::Action) else {
        return Err(ParseError::MissingMarkers);
    };
    let input = sections[action_pos..]
        .iter()
        .find(|(k, _)| *k == Marker::ActionInput)
        .map(|(_, v)| *v)
        .ok_or(ParseError::MissingActionInput)?;

    let name = parse_tool_name(sections[action_pos].1)?;
    let arguments = parse_action_input(input)?;

    Ok(ParsedOutput {
        thought,
        action: AgentAction::Tool(ToolCall::new(name, arguments)),
    })
}

fn parse_tool_name(raw: &str) -> Result<String, ParseError> {
    let line = raw.lines().next().unwrap_or("").trim();
    let name = line.trim_matches(|c| matches!(c, '`' | '"' | '\'' | '*')).trim();
    if TOOL_NAME.is_match(name) {
        Ok(name.to_string())
    } else {
        Err(ParseError::InvalidToolName(line.to_string()))
    }
}

/// Parse the argument blob after `Action Input:`.
///
/// Accepts a JSON object (optionally fenced), `None`/empty for no arguments,
/// or `key=value` / `key: value` pairs separated by commas or newlines.
pub fn parse_action_input(raw: &str) -> Result<Value, ParseError> {
    let mut body = raw.trim();
    if let Some(inner) = CODE_FENCE.captures(body).and_then(|c| c.get(1)) {
        body = inner.as_str().trim();
    }

    if body.is_empty() || body.eq_ignore_ascii_case("none") || body == "{}" {
        return Ok(Value::Object(Map::new()));
    }

    if body.starts_with('{') {
        // Only the leading object counts; models often add prose after it.
        let first = serde_json::Deserializer::from_str(body)
            .into_iter::<Value>()
            .next();
        return match first {
            Some(Ok(value @ Value::Object(_))) => Ok(value),
            Some(Ok(other)) => Err(ParseError::InvalidActionInput(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Some(Err(e)) => Err(ParseError::InvalidActionInput(e.to_string())),
            None => Ok(Value::Object(Map::new())),
        };
    }

    let mut args = Map::new();
    for pair in split_pairs(body)? {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some(split_at) = pair.find(['=', ':']) else {
            return Err(ParseError::InvalidActionInput(format!(
                "expected key=value, got '{}'",
                pair
            )));
        };
        let key = pair[..split_at]
            .trim()
            .trim_matches(|c| c == '"' || c == '\'');
        if key.is_empty() {
            return Err(ParseError::InvalidActionInput(format!(
                "missing key in '{}'",
                pair
            )));
        }
        args.insert(key.to_string(), scalar(pair[split_at + 1..].trim()));
    }
    Ok(Value::Object(args))
}

// Split on commas and newlines that are not inside quotes. A quote only
// opens at the start of a key or value, so apostrophes in bare text such
// as `Cote d'Ivoire` stay literal.
fn split_pairs(body: &str) -> Result<Vec<&str>, ParseError> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if matches!(prev, None | Some('=' | ':')) => quote = Some(c),
            (None, ',' | '\n') => {
                parts.push(&body[start..i]);
                start = i + c.len_utf8();
                prev = None;
                continue;
            }
            (None, _) => {}
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }

    if let Some(q) = quote {
        return Err(ParseError::InvalidActionInput(format!(
            "unterminated {} quote in '{}'",
            q,
            &body[start..]
        )));
    }
    parts.push(&body[start..]);
    Ok(parts)
}

fn scalar(raw: &str) -> Value {
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')));
    if quoted {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "none" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    Value::String(raw.to_string())
}
