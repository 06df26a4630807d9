// ABOUTME: Workflow - materialises a WorkflowConfig into a registry, model
// ABOUTME: gateway, controller, and optional evaluation setup.

use std::path::PathBuf;
use std::sync::Arc;

use super::{BuildContext, LlmConfig, ToolFactory, WorkflowConfig};
use crate::agent::{AgentConfig, Controller, LlmGateway, ModelSettings};
use crate::error::{ConfigError, ReagentError};
use crate::eval::{
    EvalSummary, Evaluator, ExactMatchJudge, Judge, LlmJudge, NumericJudge, ReportPaths,
    load_dataset, report_dir, write_report,
};
use crate::llm::{DEFAULT_BASE_URL, LlmClient, OpenAiCompatClient};
use crate::tool::{Executor, Registry};

/// Base URL for `_type: nim` models without an explicit `base_url`.
pub const NIM_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";

/// Creates the client for a configured model.
pub type ClientProvider = dyn Fn(&LlmConfig) -> Result<Arc<dyn LlmClient>, ConfigError>;

/// Client for an `openai` or `nim` model entry.
pub fn default_client(llm: &LlmConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let base_url = match (llm.kind.as_str(), &llm.base_url) {
        (_, Some(url)) if !url.is_empty() => url.clone(),
        ("openai", _) => DEFAULT_BASE_URL.to_string(),
        ("nim", _) => NIM_BASE_URL.to_string(),
        (other, _) => {
            return Err(ConfigError::Invalid(format!(
                "unsupported llm type '{}', expected 'openai' or 'nim'",
                other
            )));
        }
    };
    Ok(Arc::new(OpenAiCompatClient::new(
        base_url,
        llm.api_key.clone().unwrap_or_default(),
    )))
}

fn settings(llm: &LlmConfig) -> ModelSettings {
    ModelSettings {
        model: llm.model_name.clone(),
        temperature: llm.temperature,
        top_p: llm.top_p,
        max_tokens: llm.max_tokens,
    }
}

/// Evaluation settings with paths resolved and judges built.
pub struct EvalSetup {
    pub dataset_path: PathBuf,
    pub report_dir: PathBuf,
    pub concurrency: usize,
    /// Judges keyed by evaluator name, in name order.
    pub judges: Vec<(String, Arc<dyn Judge>)>,
}

/// Summary and report files for one evaluator.
pub struct EvaluatorReport {
    pub name: String,
    pub summary: EvalSummary,
    pub paths: ReportPaths,
}

/// A ready-to-run agent.
pub struct Workflow {
    controller: Controller,
    registry: Arc<Registry>,
    eval: Option<EvalSetup>,
    verbose: bool,
}

impl Workflow {
    /// Build with real HTTP clients.
    pub fn build(config: &WorkflowConfig, factory: &ToolFactory) -> Result<Self, ConfigError> {
        Self::build_with(config, factory, &default_client)
    }

    /// Build with a custom client provider.
    pub fn build_with(
        config: &WorkflowConfig,
        factory: &ToolFactory,
        clients: &ClientProvider,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let section = &config.workflow;

        let ctx = BuildContext::new(&config.base_dir);
        let mut registry = Registry::new();
        for name in &section.tool_names {
            let function = config.function(name)?;
            let tool = factory.create(name, function, &ctx)?;
            let description = function
                .description
                .clone()
                .unwrap_or_else(|| tool.description().to_string());
            registry.register_with_description(tool, description)?;
        }
        let registry = Arc::new(registry);

        let llm = config.llm(&section.llm_name)?;
        let mut gateway = LlmGateway::new(clients(llm)?, settings(llm));
        if let Some(prompt) = &section.system_prompt {
            gateway = gateway.preamble(prompt.clone());
        }

        let mut agent = AgentConfig::new()
            .max_iterations(section.max_iterations)
            .parse_retries(section.parse_agent_response_max_retries);
        if let Some(max) = section.max_observation_chars {
            agent = agent.max_observation_chars(max);
        }

        let controller = Controller::new(
            Arc::new(gateway),
            Executor::new(Arc::clone(&registry)),
            agent,
        )?;

        let eval = match &config.eval {
            Some(eval) => {
                let mut judges = Vec::new();
                for (name, evaluator) in &eval.evaluators {
                    let judge: Arc<dyn Judge> = match evaluator.kind.as_str() {
                        "exact_match" => Arc::new(ExactMatchJudge),
                        "numeric_match" => Arc::new(match evaluator.tolerance {
                            Some(t) => NumericJudge::new(t),
                            None => NumericJudge::default(),
                        }),
                        "answer_accuracy" => {
                            let judge_llm = config.llm(
                                evaluator.llm_name.as_deref().unwrap_or(&section.llm_name),
                            )?;
                            Arc::new(LlmJudge::new(clients(judge_llm)?, settings(judge_llm)))
                        }
                        other => {
                            return Err(ConfigError::Invalid(format!(
                                "unknown evaluator type '{}'",
                                other
                            )));
                        }
                    };
                    judges.push((name.clone(), judge));
                }
                Some(EvalSetup {
                    dataset_path: config.resolve_path(&eval.general.dataset.file_path),
                    report_dir: report_dir(
                        config.resolve_path(&eval.general.output_dir),
                        &eval.general.eval_name,
                    ),
                    concurrency: eval.general.concurrency,
                    judges,
                })
            }
            None => None,
        };

        tracing::info!(
            tools = registry.len(),
            model = %llm.model_name,
            max_iterations = section.max_iterations,
            "workflow built"
        );

        Ok(Self {
            controller,
            registry,
            eval,
            verbose: section.verbose,
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn eval(&self) -> Option<&EvalSetup> {
        self.eval.as_ref()
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Run the configured evaluation: each case runs once, every evaluator
    /// scores it, and each writes its reports.
    pub async fn evaluate(&self) -> Result<Vec<EvaluatorReport>, ReagentError> {
        let setup = self
            .eval
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("no eval section configured".to_string()))?;
        let dataset = load_dataset(&setup.dataset_path).await?;

        let evaluator = Evaluator::new(self.controller.clone()).concurrency(setup.concurrency);
        let judges: Vec<&dyn Judge> = setup.judges.iter().map(|(_, j)| j.as_ref()).collect();
        let summaries = evaluator.run_many(&dataset, &judges).await;

        let mut reports = Vec::new();
        for ((name, _), summary) in setup.judges.iter().zip(summaries) {
            let paths = write_report(&summary, name, &setup.report_dir).await?;
            reports.push(EvaluatorReport {
                name: name.clone(),
                summary,
                paths,
            });
        }
        Ok(reports)
    }
}
