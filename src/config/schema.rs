// ABOUTME: Workflow configuration file - LLMs, functions (tools), the agent
// ABOUTME: workflow and evaluation settings, with environment expansion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::{DEFAULT_MAX_ITERATIONS, DEFAULT_PARSE_RETRIES};
use crate::error::ConfigError;

/// The only workflow type this runtime executes.
pub const REACT_AGENT: &str = "react_agent";

/// A language model endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `openai` or `nim`.
    #[serde(rename = "_type")]
    pub kind: String,
    pub model_name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// A tool instance: a registered tool type plus its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    #[serde(rename = "_type")]
    pub kind: String,

    /// Replaces the tool's built-in description in the model's catalog.
    #[serde(default)]
    pub description: Option<String>,

    /// Type-specific options, e.g. `data_path`.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl FunctionConfig {
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }
}

/// The agent itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSection {
    #[serde(rename = "_type")]
    pub kind: String,
    pub llm_name: String,
    #[serde(default)]
    pub tool_names: Vec<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_parse_retries")]
    pub parse_agent_response_max_retries: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_observation_chars: Option<usize>,
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_parse_retries() -> usize {
    DEFAULT_PARSE_RETRIES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalGeneral {
    pub dataset: DatasetConfig,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_eval_name")]
    pub eval_name: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".tmp/eval")
}

fn default_eval_name() -> String {
    "eval".to_string()
}

fn default_concurrency() -> usize {
    1
}

/// One scoring method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// `answer_accuracy`, `exact_match` or `numeric_match`.
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default)]
    pub llm_name: Option<String>,
    #[serde(default)]
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub general: EvalGeneral,
    pub evaluators: BTreeMap<String, EvaluatorConfig>,
}

/// A whole workflow file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub llms: BTreeMap<String, LlmConfig>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionConfig>,
    pub workflow: WorkflowSection,
    #[serde(default)]
    pub eval: Option<EvalConfig>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl WorkflowConfig {
    /// Read and validate a workflow file. Relative paths in it resolve
    /// against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse and validate YAML, expanding `$VAR`, `${VAR}` and `~` in every
    /// string value.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(text)?;
        expand_env(&mut value)?;
        let config: Self = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross references between sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.kind != REACT_AGENT {
            return Err(ConfigError::Invalid(format!(
                "unsupported workflow type '{}', expected '{}'",
                self.workflow.kind, REACT_AGENT
            )));
        }
        self.llm(&self.workflow.llm_name)?;
        for name in &self.workflow.tool_names {
            self.function(name)?;
        }
        if let Some(eval) = &self.eval {
            if eval.evaluators.is_empty() {
                return Err(ConfigError::Invalid("eval has no evaluators".to_string()));
            }
            for evaluator in eval.evaluators.values() {
                if let Some(llm) = &evaluator.llm_name {
                    self.llm(llm)?;
                }
            }
        }
        Ok(())
    }

    pub fn llm(&self, name: &str) -> Result<&LlmConfig, ConfigError> {
        self.llms
            .get(name)
            .ok_or_else(|| ConfigError::UnknownLlm(name.to_string()))
    }

    pub fn function(&self, name: &str) -> Result<&FunctionConfig, ConfigError> {
        self.functions
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFunction(name.to_string()))
    }

    /// Resolve a path from the file against `base_dir`.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn expand_env(value: &mut serde_yaml::Value) -> Result<(), ConfigError> {
    match value {
        serde_yaml::Value::String(s) => {
            let expanded = shellexpand::full(s.as_str())
                .map_err(|e| ConfigError::MissingEnv(e.var_name))?
                .into_owned();
            *s = expanded;
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                expand_env(item)?;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                expand_env(item)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => expand_env(&mut tagged.value)?,
        _ => {}
    }
    Ok(())
}
