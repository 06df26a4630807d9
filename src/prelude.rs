// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use reagent::prelude::*;` to get started quickly.

pub use crate::agent::{
    AgentConfig, AgentContext, Controller, LlmGateway, ModelGateway, ModelSettings, RunEvent,
    RunOutcome, RunStatus, Turn, TurnRole,
};
pub use crate::config::{ToolFactory, Workflow, WorkflowConfig};
pub use crate::error::{
    ConfigError, EvalError, LlmError, ReagentError, RegistryError, RunFailure, ToolError,
    TraceError,
};
pub use crate::eval::{
    EvalCase, EvalSummary, Evaluator, ExactMatchJudge, Judge, Judgment, LlmJudge, NumericJudge,
};
pub use crate::llm::{LlmClient, Message, OpenAiCompatClient, Request, Response, ToolDefinition};
pub use crate::service::{AgentService, ChatChunk, ChatMessage, ChatRequest, ChatResponse};
pub use crate::tool::{
    Arguments, Executor, FailureKind, InputSchema, Observation, ParamSpec, Registry, Tool,
    ToolCall, ToolOutcome, ToolResult,
};
pub use crate::tools::{ClimateDataset, TemperatureRecord, climate_tools};
pub use crate::trace::{
    FileTraceStore, MemoryTraceStore, Step, StepKind, Trace, TraceRecorder, TraceStore,
};
