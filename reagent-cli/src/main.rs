// ABOUTME: reagent command line - run one question, evaluate a dataset, or
// ABOUTME: chat interactively with a workflow described by a YAML config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use reagent::prelude::*;

#[derive(Parser)]
#[command(name = "reagent", version, about = "ReAct agent runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question.
    Run {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        input: String,

        /// Save the run's trace as JSON into this directory.
        #[arg(long)]
        trace_dir: Option<PathBuf>,
    },

    /// Run the configured evaluation dataset and write reports.
    Eval {
        #[arg(long)]
        config: PathBuf,
    },

    /// Ask questions interactively.
    Chat {
        #[arg(long)]
        config: PathBuf,
    },
}

impl Command {
    fn config(&self) -> &Path {
        match self {
            Command::Run { config, .. } | Command::Eval { config } | Command::Chat { config } => {
                config
            }
        }
    }
}

// `verbose: true` in the workflow file turns on debug output for this crate.
fn init_tracing(log_level: &str, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{},reagent=debug", log_level))
        } else {
            EnvFilter::new(log_level)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_step(step: &Step) {
    match &step.kind {
        StepKind::Action { call, observation } => {
            println!("[{}] {} {}", step.index, call.name, call.arguments);
            let rendered = observation.render();
            if rendered.chars().count() > 500 {
                let cut: String = rendered.chars().take(500).collect();
                println!("    {}...", cut);
            } else {
                println!("    {}", rendered);
            }
        }
        StepKind::ParseError { error, .. } => println!("[{}] parse error: {}", step.index, error),
        StepKind::FinalAnswer { .. } => {}
    }
}

async fn run(workflow: Workflow, input: String, trace_dir: Option<PathBuf>) -> Result<()> {
    let mut controller = workflow.controller().clone();
    if let Some(dir) = trace_dir {
        controller = controller.with_trace_store(Arc::new(FileTraceStore::new(dir)));
    }

    let outcome = controller.run(&input).await?;
    if workflow.verbose() {
        outcome.trace.steps.iter().for_each(print_step);
    }
    println!("{}", outcome.response_text());
    tracing::info!(run_id = %outcome.run_id, "trace recorded");

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn eval(workflow: Workflow) -> Result<()> {
    for report in workflow.evaluate().await? {
        println!(
            "{}: average score {:.3} over {} cases ({} failed runs)",
            report.name,
            report.summary.average_score,
            report.summary.results.len(),
            report.summary.failed_runs()
        );
        for result in &report.summary.results {
            println!("  {:<24} {:.2}  {}", result.case.id, result.score, result.response);
        }
        println!("  report: {}", report.paths.evaluator_output.display());
    }
    Ok(())
}

async fn chat(workflow: Workflow) -> Result<()> {
    let controller = workflow.controller().clone();
    let mut rl = DefaultEditor::new()?;

    println!("Tools: {}", workflow.registry().list().join(", "));
    println!("Type 'quit' to exit.\n");

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        let _ = rl.add_history_entry(line);

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(16);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let RunEvent::Step(step) = event {
                    print_step(&step);
                }
            }
        });

        let run = controller.run_with_events(line, cancel.clone(), tx);
        tokio::pin!(run);
        // Ctrl-C stops the run between iterations; the trace is still sealed.
        let outcome = tokio::select! {
            outcome = &mut run => outcome?,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                run.await?
            }
        };
        let _ = printer.await;
        println!("\n{}\n", outcome.response_text());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let path = cli.command.config();
    let config =
        WorkflowConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    init_tracing(&cli.log_level, config.workflow.verbose);
    let workflow = Workflow::build(&config, &ToolFactory::builtin())?;

    match cli.command {
        Command::Run {
            input, trace_dir, ..
        } => run(workflow, input, trace_dir).await,
        Command::Eval { .. } => eval(workflow).await,
        Command::Chat { .. } => chat(workflow).await,
    }
}
