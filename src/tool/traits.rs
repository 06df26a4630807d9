// ABOUTME: Defines the Tool trait - the core abstraction for agent capabilities.
// ABOUTME: Tools have a name, description, typed input schema, and async execute method.

use async_trait::async_trait;

use super::{InputSchema, ToolResult};

/// Validated tool arguments, keyed by parameter name.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

/// A tool that can be executed by an agent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    fn name(&self) -> &str;

    /// Returns a human-readable description for the model.
    fn description(&self) -> &str;

    /// Returns the declared input parameters.
    fn schema(&self) -> InputSchema;

    /// Names of the parameters `execute` actually reads.
    ///
    /// Registration fails unless this matches the schema exactly, so a
    /// parameter cannot be advertised to the model and then ignored.
    fn consumes(&self) -> &[&str];

    /// Execute the tool with arguments that already passed schema validation.
    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error>;
}
