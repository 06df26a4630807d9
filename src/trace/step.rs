// ABOUTME: Step and Trace types - the ordered record of one agent run, with
// ABOUTME: views for flat trace entries, evaluation contexts, and prompt replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{Turn, TurnRole};
use crate::tool::{Observation, ToolCall, ToolOutcome};

/// What happened in a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// The model requested a tool and the executor answered.
    Action {
        call: ToolCall,
        observation: Observation,
    },

    /// The model produced the final answer.
    FinalAnswer { answer: String },

    /// The model output broke the protocol. `correction` is the instruction
    /// sent back, absent when the retry budget was already spent.
    ParseError {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correction: Option<String>,
    },
}

/// One model turn and its consequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position in the trace, assigned by the recorder.
    pub index: usize,

    /// 1-based think-act cycle this step belongs to.
    pub iteration: usize,

    /// 1-based attempt within the iteration; above 1 after parse failures.
    pub attempt: usize,

    /// Raw model output.
    pub model_output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,

    pub kind: StepKind,

    /// Turns this step appended to the agent context, in order.
    pub appended: Vec<Turn>,

    pub timestamp: DateTime<Utc>,
}

impl Step {
    pub fn new(
        iteration: usize,
        attempt: usize,
        model_output: impl Into<String>,
        thought: Option<String>,
        kind: StepKind,
        appended: Vec<Turn>,
    ) -> Self {
        Self {
            index: 0,
            iteration,
            attempt,
            model_output: model_output.into(),
            thought,
            kind,
            appended,
            timestamp: Utc::now(),
        }
    }

    /// The tool call, if this step made one.
    pub fn tool_call(&self) -> Option<&ToolCall> {
        match &self.kind {
            StepKind::Action { call, .. } => Some(call),
            _ => None,
        }
    }

    /// The observation, if this step made a tool call.
    pub fn observation(&self) -> Option<&Observation> {
        match &self.kind {
            StepKind::Action { observation, .. } => Some(observation),
            _ => None,
        }
    }
}

/// Flattened trace record for external inspectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<ToolOutcome>,
    pub timestamp: DateTime<Utc>,
}

/// The sealed, ordered record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub run_id: String,
    pub input: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<Step>,
}

impl Trace {
    /// Number of tool calls made during the run.
    pub fn tool_calls(&self) -> usize {
        self.steps.iter().filter(|s| s.tool_call().is_some()).count()
    }

    /// Flatten into role/content entries, starting with the user question.
    pub fn entries(&self) -> Vec<TraceEntry> {
        let mut entries = vec![TraceEntry {
            role: TurnRole::User,
            content: self.input.clone(),
            tool_name: None,
            tool_input: None,
            tool_output: None,
            timestamp: self.started_at,
        }];

        for step in &self.steps {
            let call = step.tool_call();
            for turn in &step.appended {
                let (tool_input, tool_output) = match turn.role {
                    TurnRole::Assistant => (call.map(|c| c.arguments.clone()), None),
                    TurnRole::Tool => (None, step.observation().map(|o| o.outcome.clone())),
                    TurnRole::User => (None, None),
                };
                let tool_name = match turn.role {
                    TurnRole::Assistant | TurnRole::Tool => call.map(|c| c.name.clone()),
                    TurnRole::User => None,
                };
                entries.push(TraceEntry {
                    role: turn.role,
                    content: turn.content.clone(),
                    tool_name,
                    tool_input,
                    tool_output,
                    timestamp: turn.timestamp,
                });
            }
        }
        entries
    }

    /// Per-step context strings, as used for evaluation reports: a
    /// `**Step N**` block with the model output, followed by the tool
    /// response for action steps.
    pub fn contexts(&self) -> Vec<String> {
        let mut contexts = Vec::new();
        for step in &self.steps {
            contexts.push(format!("**Step {}**\n{}", step.index, step.model_output.trim()));
            if let Some(observation) = step.observation() {
                contexts.push(observation.render());
            }
        }
        contexts
    }

    /// Reconstruct the context the model saw when producing step `index`
    /// (1-based). Returns None for an index outside the trace.
    pub fn prompt_for(&self, index: usize) -> Option<Vec<Turn>> {
        if index == 0 || index > self.steps.len() {
            return None;
        }
        let mut turns = vec![Turn {
            role: TurnRole::User,
            content: self.input.clone(),
            timestamp: self.started_at,
        }];
        for step in &self.steps[..index - 1] {
            turns.extend(step.appended.iter().cloned());
        }
        Some(turns)
    }
}
