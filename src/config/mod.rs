// ABOUTME: Configuration module - the YAML workflow file, the tool factory,
// ABOUTME: and building a runnable Workflow from them.

mod factory;
mod schema;
mod workflow;

pub use factory::{BuildContext, DEFAULT_DATA_PATH, ToolConstructor, ToolFactory};
pub use schema::{
    DatasetConfig, EvalConfig, EvalGeneral, EvaluatorConfig, FunctionConfig, LlmConfig,
    REACT_AGENT, WorkflowConfig, WorkflowSection,
};
pub use workflow::{
    ClientProvider, EvalSetup, EvaluatorReport, NIM_BASE_URL, Workflow, default_client,
};
