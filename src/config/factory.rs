// ABOUTME: ToolFactory - the closed map from configured tool types to
// ABOUTME: constructors, with the built-in climate tool types registered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::FunctionConfig;
use crate::error::ConfigError;
use crate::tool::{Arguments, InputSchema, Tool, ToolResult};
use crate::tools::{
    CalculateStatisticsTool, ClimateDataset, FilterByCountryTool, FindExtremeYearsTool,
    ListCountriesTool, StationStatisticsTool,
};

/// Builds one tool from its configuration.
pub type ToolConstructor =
    Box<dyn Fn(&FunctionConfig, &BuildContext) -> Result<Arc<dyn Tool>, ConfigError> + Send + Sync>;

/// Climate data file used when a function does not set `data_path`.
pub const DEFAULT_DATA_PATH: &str = "data/temperature_annual.json";

/// Shared state while materialising one workflow's tools.
pub struct BuildContext {
    base_dir: PathBuf,
    datasets: Mutex<HashMap<PathBuf, Arc<ClimateDataset>>>,
}

impl BuildContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            datasets: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load a climate dataset once per path; later tools share it.
    pub fn climate_dataset(&self, path: &str) -> Result<Arc<ClimateDataset>, ConfigError> {
        let path = self.resolve(path);
        let mut datasets = self.datasets.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(data) = datasets.get(&path) {
            return Ok(Arc::clone(data));
        }
        let data = Arc::new(ClimateDataset::load(&path)?);
        datasets.insert(path, Arc::clone(&data));
        Ok(data)
    }
}

/// Known tool types.
pub struct ToolFactory {
    constructors: HashMap<String, ToolConstructor>,
}

impl Default for ToolFactory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolFactory {
    /// A factory with no tool types.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A factory with the `climate_analyzer/*` tool types.
    pub fn builtin() -> Self {
        let mut factory = Self::empty();
        factory.register_climate("climate_analyzer/list_countries", |d| {
            Arc::new(ListCountriesTool::new(d))
        });
        factory.register_climate("climate_analyzer/calculate_statistics", |d| {
            Arc::new(CalculateStatisticsTool::new(d))
        });
        factory.register_climate("climate_analyzer/filter_by_country", |d| {
            Arc::new(FilterByCountryTool::new(d))
        });
        factory.register_climate("climate_analyzer/find_extreme_years", |d| {
            Arc::new(FindExtremeYearsTool::new(d))
        });
        factory.register_climate("climate_analyzer/station_statistics", |d| {
            Arc::new(StationStatisticsTool::new(d))
        });
        factory
    }

    /// Register (or replace) a tool type.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&FunctionConfig, &BuildContext) -> Result<Arc<dyn Tool>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    fn register_climate<F>(&mut self, kind: &str, build: F)
    where
        F: Fn(Arc<ClimateDataset>) -> Arc<dyn Tool> + Send + Sync + 'static,
    {
        self.register(kind, move |function, ctx| {
            let path = function.option_str("data_path").unwrap_or(DEFAULT_DATA_PATH);
            Ok(build(ctx.climate_dataset(path)?))
        });
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort();
        kinds
    }

    /// Build the tool for a configured function. The tool is exposed under
    /// `name` even when its implementation uses another name.
    pub fn create(
        &self,
        name: &str,
        function: &FunctionConfig,
        ctx: &BuildContext,
    ) -> Result<Arc<dyn Tool>, ConfigError> {
        let constructor = self
            .constructors
            .get(&function.kind)
            .ok_or_else(|| ConfigError::UnknownToolType(function.kind.clone()))?;
        let tool = constructor(function, ctx)?;
        if tool.name() == name {
            Ok(tool)
        } else {
            Ok(Arc::new(AliasedTool {
                name: name.to_string(),
                inner: tool,
            }))
        }
    }
}

/// A tool exposed under a configured name.
struct AliasedTool {
    name: String,
    inner: Arc<dyn Tool>,
}

#[async_trait]
impl Tool for AliasedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn schema(&self) -> InputSchema {
        self.inner.schema()
    }

    fn consumes(&self) -> &[&str] {
        self.inner.consumes()
    }

    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error> {
        self.inner.execute(args).await
    }
}
