// ABOUTME: Defines all error types for the reagent library using thiserror.
// ABOUTME: Each submodule has its own error enum, unified under ReagentError.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for the reagent library.
///
/// Only setup-time problems surface through this type. Failures that happen
/// while an agent is running are reported inside the run's outcome instead.
#[derive(Debug, thiserror::Error)]
pub enum ReagentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Agent task failed: {0}")]
    Task(String),
}

/// Errors from LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised while building a tool registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{tool}' consumes parameter '{param}' that its schema does not declare")]
    UndeclaredParameter { tool: String, param: String },

    #[error("Tool '{tool}' declares parameter '{param}' but never consumes it")]
    UnconsumedParameter { tool: String, param: String },

    #[error("Tool '{tool}' has an invalid schema: {reason}")]
    InvalidSchema { tool: String, reason: String },
}

/// Errors from a single tool invocation.
///
/// These never escape the executor; they are folded into the observation
/// handed back to the model.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution failed: {0}")]
    Execution(#[source] anyhow::Error),
}

/// Why an agent run ended without an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    #[error("Model output could not be parsed after {attempts} attempts: {last_error}")]
    ParseExhausted { attempts: usize, last_error: String },

    #[error("No final answer after {max_iterations} iterations")]
    IterationLimit { max_iterations: usize },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Model gateway failed: {message}")]
    Model { message: String },
}

/// Errors from loading or materialising a workflow configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Environment variable not set: {0}")]
    MissingEnv(String),

    #[error("Unknown LLM '{0}'")]
    UnknownLlm(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Unknown tool type '{0}'")]
    UnknownToolType(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load data from {path}: {reason}")]
    Data { path: PathBuf, reason: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors from trace recording and persistence.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Unknown run: {0}")]
    UnknownRun(String),

    #[error("Run already started: {0}")]
    DuplicateRun(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from evaluation datasets and reports.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset: {0}")]
    Dataset(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Judge failed: {0}")]
    Judge(String),
}
