// ABOUTME: Controller - the ReAct state machine. Alternates model turns and
// ABOUTME: tool executions under iteration and parse-retry limits, recording every step.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::config::AgentConfig;
use super::context::{AgentContext, Turn};
use super::gateway::ModelGateway;
use super::parser::{AgentAction, ParsedOutput, parse_output};
use super::prompt;
use crate::error::{ConfigError, RunFailure, TraceError};
use crate::llm::ToolDefinition;
use crate::tool::{Executor, ToolCall};
use crate::trace::{Step, StepKind, Trace, TraceRecorder, TraceStore};

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// Waiting for the model's next turn.
    AwaitingModel { iteration: usize, attempt: usize },

    /// The model asked for a tool; waiting for the executor.
    AwaitingToolResult {
        iteration: usize,
        attempt: usize,
        model_output: String,
        thought: Option<String>,
        call: ToolCall,
    },

    /// The run is over.
    Terminated(RunStatus),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded { answer: String },
    Failed { failure: RunFailure },
}

/// Result of one controller run, successful or not. Always carries the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    #[serde(flatten)]
    pub status: RunStatus,
    pub trace: Trace,

    /// Think-act cycles entered.
    pub iterations: usize,

    /// Tool calls made.
    pub tool_calls: usize,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded { .. })
    }

    /// The final answer, if the run succeeded.
    pub fn answer(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Succeeded { answer } => Some(answer),
            RunStatus::Failed { .. } => None,
        }
    }

    /// The failure, if the run failed.
    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.status {
            RunStatus::Succeeded { .. } => None,
            RunStatus::Failed { failure } => Some(failure),
        }
    }

    /// The answer, or a description of why there is none.
    pub fn response_text(&self) -> String {
        match &self.status {
            RunStatus::Succeeded { answer } => answer.clone(),
            RunStatus::Failed { failure } => format!("Agent failed: {}", failure),
        }
    }
}

/// Progress notifications from `Controller::run_with_events`.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Started { run_id: String },
    Step(Step),
    Finished(Box<RunOutcome>),
}

/// Drives runs for one agent configuration. Cheap to clone and safe to
/// share: every run owns its own context.
#[derive(Clone)]
pub struct Controller {
    gateway: Arc<dyn ModelGateway>,
    executor: Executor,
    config: AgentConfig,
    recorder: Arc<TraceRecorder>,
    store: Option<Arc<dyn TraceStore>>,
}

impl Controller {
    /// Create a controller. Fails if the limits in `config` are unusable.
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        executor: Executor,
        config: AgentConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            gateway,
            executor,
            config,
            recorder: Arc::new(TraceRecorder::new()),
            store: None,
        })
    }

    /// Share a recorder with other controllers or inspectors.
    pub fn with_recorder(mut self, recorder: Arc<TraceRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Persist every finished trace.
    pub fn with_trace_store(mut self, store: Arc<dyn TraceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn recorder(&self) -> &Arc<TraceRecorder> {
        &self.recorder
    }

    /// Answer a question.
    pub async fn run(&self, input: &str) -> Result<RunOutcome, TraceError> {
        self.drive(input, CancellationToken::new(), None).await
    }

    /// Answer a question, giving up between iterations once `cancel` fires.
    pub async fn run_cancellable(
        &self,
        input: &str,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, TraceError> {
        self.drive(input, cancel, None).await
    }

    /// Answer a question, reporting each recorded step on `events`.
    /// A closed receiver does not stop the run.
    pub async fn run_with_events(
        &self,
        input: &str,
        cancel: CancellationToken,
        events: mpsc::Sender<RunEvent>,
    ) -> Result<RunOutcome, TraceError> {
        self.drive(input, cancel, Some(&events)).await
    }

    async fn drive(
        &self,
        input: &str,
        cancel: CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunOutcome, TraceError> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("agent_run", run_id = %run_id, question = %input);

        async {
            self.recorder.begin(&run_id, input)?;
            emit(events, RunEvent::Started {
                run_id: run_id.clone(),
            })
            .await;
            tracing::info!(max_iterations = self.config.max_iterations, "run started");

            let result = self.step_loop(&run_id, input, &cancel, events).await;
            // Seal even when bookkeeping failed so the run is not left open.
            let trace = self.recorder.finalize(&run_id)?;
            let (status, iterations) = result?;

            let outcome = RunOutcome {
                run_id: run_id.clone(),
                status,
                tool_calls: trace.tool_calls(),
                trace,
                iterations,
            };

            match &outcome.status {
                RunStatus::Succeeded { .. } => tracing::info!(
                    iterations = outcome.iterations,
                    tool_calls = outcome.tool_calls,
                    "run succeeded"
                ),
                RunStatus::Failed { failure } => tracing::warn!(
                    iterations = outcome.iterations,
                    error = %failure,
                    "run failed"
                ),
            }

            // The answer outlives a failed save; the trace is still on the outcome.
            if let Some(store) = &self.store {
                if let Err(e) = store.save(&outcome.trace).await {
                    tracing::warn!(error = %e, "trace could not be saved");
                }
            }
            emit(events, RunEvent::Finished(Box::new(outcome.clone()))).await;
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn step_loop(
        &self,
        run_id: &str,
        input: &str,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<(RunStatus, usize), TraceError> {
        let catalog = self.executor.registry().catalog();
        let mut context = AgentContext::new(input);
        let mut iterations = 0;
        let mut state = RunState::AwaitingModel {
            iteration: 1,
            attempt: 1,
        };

        loop {
            state = match state {
                RunState::AwaitingModel { iteration, attempt } => {
                    if cancel.is_cancelled() {
                        RunState::Terminated(failed(RunFailure::Cancelled))
                    } else if iteration > self.config.max_iterations {
                        RunState::Terminated(failed(RunFailure::IterationLimit {
                            max_iterations: self.config.max_iterations,
                        }))
                    } else {
                        iterations = iteration;
                        self.think(run_id, &mut context, &catalog, cancel, events, iteration, attempt)
                            .await?
                    }
                }

                RunState::AwaitingToolResult {
                    iteration,
                    attempt,
                    model_output,
                    thought,
                    call,
                } => {
                    let observation = self.executor.execute(call.clone()).await;
                    let assistant = Turn::assistant(&model_output);
                    let tool = Turn::tool(prompt::observation(
                        &observation.render(),
                        self.config.max_observation_chars,
                    ));
                    context.push(assistant.clone());
                    context.push(tool.clone());

                    let step = Step::new(
                        iteration,
                        attempt,
                        model_output,
                        thought,
                        StepKind::Action { call, observation },
                        vec![assistant, tool],
                    );
                    self.record(run_id, step, events).await?;

                    RunState::AwaitingModel {
                        iteration: iteration + 1,
                        attempt: 1,
                    }
                }

                RunState::Terminated(status) => return Ok((status, iterations)),
            };
        }
    }

    // One model call and the transition it implies.
    #[allow(clippy::too_many_arguments)]
    async fn think(
        &self,
        run_id: &str,
        context: &mut AgentContext,
        catalog: &[ToolDefinition],
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
        iteration: usize,
        attempt: usize,
    ) -> Result<RunState, TraceError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(RunState::Terminated(failed(RunFailure::Cancelled)));
            }
            response = self
                .gateway
                .complete(context, catalog)
                .instrument(tracing::debug_span!("model_call", iteration, attempt)) => response,
        };

        let model_output = match response {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(iteration, error = %e, "model call failed");
                return Ok(RunState::Terminated(failed(RunFailure::Model {
                    message: e.to_string(),
                })));
            }
        };

        match parse_output(&model_output) {
            Ok(ParsedOutput {
                thought,
                action: AgentAction::Tool(call),
            }) => {
                tracing::debug!(iteration, tool = %call.name, "model requested tool");
                Ok(RunState::AwaitingToolResult {
                    iteration,
                    attempt,
                    model_output,
                    thought,
                    call,
                })
            }

            Ok(ParsedOutput {
                thought,
                action: AgentAction::FinalAnswer(answer),
            }) => {
                let assistant = Turn::assistant(&model_output);
                context.push(assistant.clone());
                let step = Step::new(
                    iteration,
                    attempt,
                    model_output,
                    thought,
                    StepKind::FinalAnswer {
                        answer: answer.clone(),
                    },
                    vec![assistant],
                );
                self.record(run_id, step, events).await?;
                Ok(RunState::Terminated(RunStatus::Succeeded { answer }))
            }

            Err(error) => {
                tracing::warn!(iteration, attempt, error = %error, "unparseable model output");
                let exhausted = attempt > self.config.parse_retries;

                let assistant = Turn::assistant(&model_output);
                context.push(assistant.clone());
                let mut appended = vec![assistant];
                let correction = if exhausted {
                    None
                } else {
                    let text = prompt::correction(&error);
                    let turn = Turn::user(&text);
                    context.push(turn.clone());
                    appended.push(turn);
                    Some(text)
                };

                let step = Step::new(
                    iteration,
                    attempt,
                    model_output,
                    None,
                    StepKind::ParseError {
                        error: error.to_string(),
                        correction,
                    },
                    appended,
                );
                self.record(run_id, step, events).await?;

                if exhausted {
                    Ok(RunState::Terminated(failed(RunFailure::ParseExhausted {
                        attempts: attempt,
                        last_error: error.to_string(),
                    })))
                } else {
                    Ok(RunState::AwaitingModel {
                        iteration,
                        attempt: attempt + 1,
                    })
                }
            }
        }
    }

    async fn record(
        &self,
        run_id: &str,
        step: Step,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<(), TraceError> {
        match events {
            Some(_) => {
                let index = self.recorder.record(run_id, step.clone())?;
                let mut step = step;
                step.index = index;
                emit(events, RunEvent::Step(step)).await;
            }
            None => {
                self.recorder.record(run_id, step)?;
            }
        }
        Ok(())
    }
}

fn failed(failure: RunFailure) -> RunStatus {
    RunStatus::Failed { failure }
}

async fn emit(events: Option<&mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        // The run carries on if nobody is listening.
        let _ = tx.send(event).await;
    }
}
