// ABOUTME: AgentService - OpenAI-compatible chat completion endpoints over a
// ABOUTME: shared controller, synchronous and streaming. Transport-agnostic.

use std::pin::Pin;

use chrono::Utc;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::{Controller, RunEvent};
use crate::error::ReagentError;
use crate::trace::{Step, StepKind};

/// A chat message in OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// `POST /v1/chat/completions` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// The question is the last user message.
    pub fn question(&self) -> Result<&str, ReagentError> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user" && !m.content.trim().is_empty())
            .map(|m| m.content.as_str())
            .ok_or_else(|| ReagentError::InvalidRequest("no user message".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Completed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

/// One streamed piece of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, ReagentError>> + Send + 'static>>;

/// Serves chat completions from one controller.
#[derive(Clone)]
pub struct AgentService {
    controller: Controller,
    model: String,
}

impl AgentService {
    /// `model` is the name reported back in responses.
    pub fn new(controller: Controller, model: impl Into<String>) -> Self {
        Self {
            controller,
            model: model.into(),
        }
    }

    /// Run the agent to completion and answer in one response.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ReagentError> {
        let question = request.question()?;
        tracing::debug!(model = %self.model_for(request), "chat completion");
        let outcome = self.controller.run(question).await?;
        if !outcome.is_success() {
            tracing::warn!(run_id = %outcome.run_id, "chat completion run failed");
        }

        Ok(ChatResponse {
            id: completion_id(),
            object: "chat.completion".into(),
            created: Utc::now().timestamp(),
            model: self.model_for(request),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage {
                    role: "assistant".into(),
                    content: outcome.response_text(),
                },
                finish_reason: FINISH_REASON.into(),
            }],
        })
    }

    /// Stream one chunk per agent step, then the answer. Dropping the
    /// stream cancels the run at its next iteration.
    pub fn stream(&self, request: &ChatRequest) -> ChunkStream {
        let question = request.question().map(str::to_string);
        let controller = self.controller.clone();
        let model = self.model_for(request);

        Box::pin(async_stream::try_stream! {
            let question = question?;
            let id = completion_id();
            let cancel = CancellationToken::new();
            let _guard = cancel.clone().drop_guard();
            let (tx, mut rx) = mpsc::channel(16);

            let run = tokio::spawn(async move {
                controller.run_with_events(&question, cancel, tx).await
            });

            let mut first = true;
            while let Some(event) = rx.recv().await {
                let (content, finish) = match event {
                    RunEvent::Started { .. } => continue,
                    RunEvent::Step(step) => match describe_step(&step) {
                        Some(text) => (text, None),
                        None => continue,
                    },
                    RunEvent::Finished(outcome) => {
                        (outcome.response_text(), Some(FINISH_REASON.to_string()))
                    }
                };
                yield chunk(&id, &model, first, content, finish);
                first = false;
            }

            let result = run.await.map_err(|e| ReagentError::Task(e.to_string()))?;
            result?;
        })
    }

    fn model_for(&self, request: &ChatRequest) -> String {
        request.model.clone().unwrap_or_else(|| self.model.clone())
    }
}

fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

// A failed run still ends normally on the wire; the failure is in the content.
const FINISH_REASON: &str = "stop";

// Intermediate progress text; final answers arrive with the Finished event.
fn describe_step(step: &Step) -> Option<String> {
    match &step.kind {
        StepKind::Action { call, observation } => Some(format!(
            "[step {}] {} {} -> {}\n",
            step.index,
            call.name,
            call.arguments,
            observation.render()
        )),
        StepKind::ParseError { error, .. } => {
            Some(format!("[step {}] unparseable model output: {}\n", step.index, error))
        }
        StepKind::FinalAnswer { .. } => None,
    }
}

fn chunk(id: &str, model: &str, first: bool, content: String, finish: Option<String>) -> ChatChunk {
    ChatChunk {
        id: id.to_string(),
        object: "chat.completion.chunk".into(),
        created: Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta: ChunkDelta {
                role: first.then(|| "assistant".to_string()),
                content: Some(content),
            },
            finish_reason: finish,
        }],
    }
}
