// ABOUTME: Tool Executor - resolves, validates, and runs a ToolCall, always
// ABOUTME: producing an Observation; failures are captured, never propagated.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;

use super::{Observation, Registry, ToolCall, ToolOutcome, ToolResult};
use crate::error::ToolError;

/// Runs tool calls against a shared, read-only registry.
#[derive(Clone)]
pub struct Executor {
    registry: Arc<Registry>,
}

impl Executor {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Execute a tool call.
    ///
    /// Unknown tools, invalid arguments, tool errors and tool panics all end
    /// up as a failed Observation so one bad call never aborts a run.
    pub async fn execute(&self, call: ToolCall) -> Observation {
        let span = tracing::info_span!("tool_call", tool = %call.name);
        let started = Instant::now();
        let result = self.invoke(&call).instrument(span.clone()).await;
        let duration = started.elapsed();

        let outcome = match result {
            Ok(result) => ToolOutcome::from(result),
            Err(err) => {
                let kind = (&err).into();
                let message = self.failure_message(&err);
                span.in_scope(|| tracing::warn!(error = %message, "tool call failed"));
                ToolOutcome::Failure { kind, message }
            }
        };

        span.in_scope(|| {
            tracing::debug!(duration_ms = duration.as_millis() as u64, "tool call finished")
        });
        Observation {
            call,
            outcome,
            duration,
        }
    }

    async fn invoke(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let spec = self
            .registry
            .resolve(&call.name)
            .map_err(|_| ToolError::UnknownTool(call.name.clone()))?;
        let args = spec.schema().validate(&call.arguments)?;

        AssertUnwindSafe(spec.tool().execute(args))
            .catch_unwind()
            .await
            .map_err(|panic| {
                ToolError::Execution(anyhow::anyhow!("tool panicked: {}", panic_message(&panic)))
            })?
            .map_err(ToolError::Execution)
    }

    fn failure_message(&self, err: &ToolError) -> String {
        match err {
            ToolError::UnknownTool(name) => format!(
                "no tool named '{}'. Available tools: {}",
                name,
                self.registry.list().join(", ")
            ),
            ToolError::InvalidArguments(reason) => reason.clone(),
            ToolError::Execution(source) => format!("{:#}", source),
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
