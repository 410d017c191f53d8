//! Command-line interface for solving JSON problem files.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::application::SolveOrchestrator;
use crate::domain::{
    BackendKind, CancellationToken, Problem, Solution, SolverConfig, SolvingMode, Verbosity,
};

/// splitopt - partitioned LP/MIP solving.
#[derive(Parser, Debug)]
#[command(name = "splitopt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON problem file
    pub problem: PathBuf,

    /// Solving mode
    #[arg(long, value_enum, default_value_t = SolvingMode::Auto)]
    pub mode: SolvingMode,

    /// Backend used in custom mode
    #[arg(long, value_enum, default_value_t = BackendKind::BlackBox)]
    pub backend: BackendKind,

    /// Maximum independent components per backend call, 0 disables partitioning
    #[arg(long, default_value_t = 1)]
    pub partition_size: usize,

    /// Backend arguments as whitespace separated key=value pairs
    #[arg(long)]
    pub arguments: Option<String>,

    /// Number of partitions solved at the same time
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Log verbosity
    #[arg(long, value_enum, default_value_t = Verbosity::Warn)]
    pub verbosity: Verbosity,

    /// Write the solution to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Map the command line onto a solver configuration.
    pub fn solver_config(&self) -> SolverConfig {
        let config = SolverConfig::default()
            .with_mode(self.mode)
            .with_custom_backend(self.backend)
            .with_partition_size(self.partition_size)
            .with_workers(self.workers)
            .with_verbosity(self.verbosity);
        match &self.arguments {
            Some(arguments) => config.with_arguments(arguments.clone()),
            None => config,
        }
    }
}

/// Load a problem file.
pub fn load_problem(path: &Path) -> anyhow::Result<Problem> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read problem file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse problem file {}", path.display()))
}

/// Solve the problem named on the command line and print the solution as JSON.
pub async fn run(cli: Cli, cancel: CancellationToken) -> anyhow::Result<Solution> {
    let problem = load_problem(&cli.problem)?;
    let config = cli.solver_config();
    info!(
        problem = %cli.problem.display(),
        variables = problem.variable_count,
        constraints = problem.num_constraints(),
        mode = %config.mode,
        "problem loaded"
    );

    let orchestrator = SolveOrchestrator::new(config);
    let solution = if cli.workers > 1 {
        orchestrator.solve_concurrent(problem, &cancel).await
    } else {
        tokio::task::spawn_blocking(move || orchestrator.solve(problem, &cancel))
            .await
            .context("solver task failed")?
    }
    .context("solve failed")?;

    let json = serde_json::to_string_pretty(&solution).context("failed to encode solution")?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(solution)
}
