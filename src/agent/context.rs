// ABOUTME: AgentContext - the append-only conversation of one run: the user
// ABOUTME: question, model turns, tool observations, and corrective prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
}

/// One entry in the agent context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Tool, content)
    }
}

/// Ordered turns of a single run. Owned by one controller invocation and
/// only ever appended to.
#[derive(Debug, Clone)]
pub struct AgentContext {
    turns: Vec<Turn>,
}

impl AgentContext {
    /// Start a context with the user's question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::user(question)],
        }
    }

    /// The question that started the run.
    pub fn question(&self) -> &str {
        &self.turns[0].content
    }

    /// All turns in chronological order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn.
    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}
