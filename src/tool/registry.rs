// ABOUTME: Implements the Registry - the set of tools an agent may call,
// ABOUTME: built once at startup and read-only while agents run.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::{InputSchema, Tool};
use crate::error::RegistryError;
use crate::llm::ToolDefinition;

static TOOL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-/]+$").expect("tool name pattern is valid")
});

/// A registered tool: the contract shown to the model plus the
/// implementation behind it. Immutable once registered.
pub struct ToolSpec {
    name: String,
    description: String,
    schema: InputSchema,
    tool: Arc<dyn Tool>,
}

impl ToolSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &InputSchema {
        &self.schema
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }

    /// Catalog entry for the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// The set of tools available to an agent.
///
/// Populated through `&mut self` during setup, then shared behind an `Arc`;
/// concurrent runs only ever read it.
#[derive(Default, Clone)]
pub struct Registry {
    specs: Vec<Arc<ToolSpec>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<Arc<ToolSpec>, RegistryError> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<Arc<ToolSpec>, RegistryError> {
        let description = tool.description().to_string();
        self.register_with_description(tool, description)
    }

    /// Register a tool under a description supplied by configuration rather
    /// than by the implementation.
    pub fn register_with_description(
        &mut self,
        tool: Arc<dyn Tool>,
        description: impl Into<String>,
    ) -> Result<Arc<ToolSpec>, RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        if !TOOL_NAME.is_match(&name) {
            return Err(RegistryError::InvalidSchema {
                tool: name,
                reason: "tool names may only contain letters, digits, '_', '.', '-' and '/'"
                    .to_string(),
            });
        }

        let schema = tool.schema();
        schema
            .check()
            .map_err(|reason| RegistryError::InvalidSchema {
                tool: name.clone(),
                reason,
            })?;
        check_consumed(&name, &schema, tool.consumes())?;

        let spec = Arc::new(ToolSpec {
            name: name.clone(),
            description: description.into(),
            schema,
            tool,
        });
        self.index.insert(name, self.specs.len());
        self.specs.push(Arc::clone(&spec));
        Ok(spec)
    }

    /// Resolve a tool by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolSpec>, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<ToolSpec>> {
        self.index.get(name).map(|&i| Arc::clone(&self.specs[i]))
    }

    /// List all tool names in registration order.
    pub fn list(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Tool catalog for the model, in registration order.
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.specs.iter().map(|s| s.definition()).collect()
    }
}

fn check_consumed(tool: &str, schema: &InputSchema, consumes: &[&str]) -> Result<(), RegistryError> {
    let declared: BTreeSet<&str> = schema.names().collect();
    let consumed: BTreeSet<&str> = consumes.iter().copied().collect();

    if let Some(param) = consumed.difference(&declared).next() {
        return Err(RegistryError::UndeclaredParameter {
            tool: tool.to_string(),
            param: param.to_string(),
        });
    }
    if let Some(param) = declared.difference(&consumed).next() {
        return Err(RegistryError::UnconsumedParameter {
            tool: tool.to_string(),
            param: param.to_string(),
        });
    }
    Ok(())
}
