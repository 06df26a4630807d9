// ABOUTME: Agent module - the ReAct controller, its context, model gateway,
// ABOUTME: output parser, and prompt rendering.

mod config;
mod context;
mod controller;
mod gateway;
pub mod parser;
pub mod prompt;

pub use config::{AgentConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_PARSE_RETRIES};
pub use context::{AgentContext, Turn, TurnRole};
pub use controller::{Controller, RunEvent, RunOutcome, RunState, RunStatus};
pub use gateway::{LlmGateway, ModelGateway, ModelSettings};
pub use parser::{AgentAction, ParseError, ParsedOutput};
