// ABOUTME: ToolCall, ToolResult and Observation - the request a model makes, what
// ABOUTME: a tool hands back, and the recorded outcome of running it.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to run.
    pub name: String,

    /// Arguments exactly as the model supplied them.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Category of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    InvalidArguments,
    ToolExecution,
}

impl From<&ToolError> for FailureKind {
    fn from(err: &ToolError) -> Self {
        match err {
            ToolError::UnknownTool(_) => FailureKind::UnknownTool,
            ToolError::InvalidArguments(_) => FailureKind::InvalidArguments,
            ToolError::Execution(_) => FailureKind::ToolExecution,
        }
    }
}

/// What a tool implementation hands back. `is_error` marks a failure the
/// tool detected itself, e.g. a country missing from its data.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,

    /// Recorded in traces, never shown to the model.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Serialize `value` compactly as the content.
    pub fn json(value: &impl Serialize) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Self::text)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
            ..Self::default()
        }
    }

    /// Attach a metadata value; values that fail to serialize are dropped.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }
}

impl From<ToolResult> for ToolOutcome {
    fn from(result: ToolResult) -> Self {
        if result.is_error {
            ToolOutcome::Failure {
                kind: FailureKind::ToolExecution,
                message: result.content,
            }
        } else {
            ToolOutcome::Success {
                content: result.content,
                metadata: result.metadata,
            }
        }
    }
}

/// What a tool call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success {
        content: String,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        metadata: HashMap<String, serde_json::Value>,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

/// The recorded result of executing one ToolCall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// The call this observation answers.
    pub call: ToolCall,

    pub outcome: ToolOutcome,

    /// Wall-clock time spent in the executor.
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
}

impl Observation {
    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    /// The failure category, if the call failed.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            ToolOutcome::Failure { kind, .. } => Some(*kind),
            ToolOutcome::Success { .. } => None,
        }
    }

    /// Text handed back to the model after `Observation:`.
    pub fn render(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { content, .. } => content.clone(),
            ToolOutcome::Failure { kind, message } => {
                let label = match kind {
                    FailureKind::UnknownTool => "unknown tool",
                    FailureKind::InvalidArguments => "invalid arguments",
                    FailureKind::ToolExecution => "tool execution failed",
                };
                format!("Error ({}): {}", label, message)
            }
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
