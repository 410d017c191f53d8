// Solve orchestrator
// Validates a problem, resolves the solving mode, partitions, dispatches every
// partition to a backend and merges the partial results

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Dispatch};

use super::compactor::{compact, VariableMap};
use super::merger::merge;
use super::partitioner::{partition, Partition, Partitioning};
use crate::domain::{
    BackendConfig, CancellationToken, Problem, Result, Solution, SolverBackend, SolverConfig,
    SolverError, SolverResult, SolverStatistics, SolvingMode, Verbosity,
};
use crate::solver::SolverFactory;

/// Stage of a solve request
///
/// `Init -> Partition -> Solve -> Merge -> Done`; `Error` can follow any stage
/// before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStage {
    Init,
    Partition,
    Solve { partition: usize, of: usize },
    Merge,
    Done,
    Error,
}

#[derive(Debug)]
struct Run {
    stage: SolveStage,
    started: Instant,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: SolveStage::Init,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, stage: SolveStage) {
        debug!(from = ?self.stage, to = ?stage, "solve stage");
        self.stage = stage;
    }

    fn fail(&mut self, error: SolverError) -> SolverError {
        if error.is_cancelled() {
            info!(stage = ?self.stage, "solve cancelled");
        } else {
            warn!(stage = ?self.stage, %error, "solve aborted");
        }
        self.stage = SolveStage::Error;
        error
    }
}

/// One physical backend call
#[derive(Debug)]
struct Job {
    partition: Option<usize>,
    problem: Problem,
    constraint_origin: Option<Vec<usize>>,
}

impl Job {
    fn whole(problem: Problem) -> Self {
        Self {
            partition: None,
            problem,
            constraint_origin: None,
        }
    }
}

impl From<Partition> for Job {
    fn from(partition: Partition) -> Self {
        Self {
            partition: Some(partition.index),
            problem: partition.problem,
            constraint_origin: Some(partition.constraint_origin),
        }
    }
}

struct SolvedJob {
    map: VariableMap,
    result: SolverResult,
    elapsed: Duration,
}

struct Summary {
    mode: SolvingMode,
    backend: String,
    components: usize,
    partitioning_time: Option<Duration>,
}

struct Plan {
    summary: Summary,
    backend: Arc<dyn SolverBackend>,
    backend_config: BackendConfig,
    jobs: Vec<Job>,
}

/// Drives a solve request from a problem to one merged solution
pub struct SolveOrchestrator {
    config: SolverConfig,
    backend: Option<Arc<dyn SolverBackend>>,
}

impl SolveOrchestrator {
    /// Orchestrator that picks its backend from the configured mode
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            backend: None,
        }
    }

    /// Orchestrator that sends every partition to `backend`
    pub fn with_backend(config: SolverConfig, backend: Arc<dyn SolverBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve partitions one at a time in discovery order
    pub fn solve(&self, problem: Problem, cancel: &CancellationToken) -> Result<Solution> {
        with_logger(self.config.logger.as_ref(), || {
            let mut run = Run::new();
            self.solve_sequential(problem, cancel, &mut run)
        })
    }

    /// Solve up to `workers` partitions at a time on blocking tasks
    ///
    /// Results are merged in partition order regardless of completion order, so the
    /// outcome matches [`SolveOrchestrator::solve`]. On the first failure no further
    /// partitions are started, the running ones are cancelled and awaited, and only
    /// then is the error returned.
    pub async fn solve_concurrent(
        &self,
        problem: Problem,
        cancel: &CancellationToken,
    ) -> Result<Solution> {
        let logger = self.config.logger.clone();
        let mut run = Run::new();
        let Plan {
            summary,
            backend,
            backend_config,
            jobs,
        } = with_logger(logger.as_ref(), || self.plan(problem, &mut run))?;

        let total = jobs.len();
        with_logger(logger.as_ref(), || {
            run.advance(SolveStage::Solve {
                partition: 0,
                of: total,
            })
        });

        let workers = self.config.workers.max(1);
        let siblings = cancel.child();
        let mut pending = jobs.into_iter().enumerate();
        let mut running = JoinSet::new();
        let mut solved: Vec<Option<SolvedJob>> = (0..total).map(|_| None).collect();
        let mut failures: Vec<(usize, SolverError)> = Vec::new();

        loop {
            while failures.is_empty() && running.len() < workers {
                let Some((position, job)) = pending.next() else {
                    break;
                };
                let backend = Arc::clone(&backend);
                let config = backend_config.clone();
                let cancel = siblings.clone();
                let logger = logger.clone();
                running.spawn_blocking(move || {
                    let outcome = with_logger(logger.as_ref(), || {
                        run_job(backend.as_ref(), &config, job, &cancel)
                    });
                    (position, outcome)
                });
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            match joined {
                Ok((position, Ok(job))) => solved[position] = Some(job),
                Ok((position, Err(error))) => {
                    siblings.cancel();
                    failures.push((position, error));
                }
                Err(e) => {
                    siblings.cancel();
                    failures.push((
                        total,
                        SolverError::ExecutionFailed {
                            backend: backend.name().to_string(),
                            message: format!("worker task failed: {}", e),
                        },
                    ));
                }
            }
        }

        if let Some(error) = first_failure(failures) {
            return Err(with_logger(logger.as_ref(), || run.fail(error)));
        }

        let solved: Vec<SolvedJob> = solved.into_iter().flatten().collect();
        with_logger(logger.as_ref(), || {
            for (position, job) in solved.iter().enumerate() {
                self.log_partition(position, job);
            }
            self.finish(summary, solved, &mut run)
        })
    }

    fn solve_sequential(
        &self,
        problem: Problem,
        cancel: &CancellationToken,
        run: &mut Run,
    ) -> Result<Solution> {
        let Plan {
            summary,
            backend,
            backend_config,
            jobs,
        } = self.plan(problem, run)?;

        let total = jobs.len();
        let mut solved = Vec::with_capacity(total);
        for (position, job) in jobs.into_iter().enumerate() {
            run.advance(SolveStage::Solve {
                partition: position,
                of: total,
            });
            let job = run_job(backend.as_ref(), &backend_config, job, cancel)
                .map_err(|e| run.fail(e))?;
            self.log_partition(position, &job);
            solved.push(job);
        }

        self.finish(summary, solved, run)
    }

    fn plan(&self, problem: Problem, run: &mut Run) -> Result<Plan> {
        run.advance(SolveStage::Init);
        self.config.validate().map_err(|e| run.fail(e))?;
        problem.validate().map_err(|e| run.fail(e))?;

        let has_objective = problem.objective.as_ref().is_some_and(|o| !o.is_empty());
        if !has_objective && problem.constraints.is_empty() {
            return Err(run.fail(SolverError::EmptyProblem));
        }

        let (mode, integral) = self.resolve_mode(&problem);
        let backend = self.backend_for(mode).map_err(|e| run.fail(e))?;
        if integral && !backend.supports_mip() {
            warn!(
                backend = backend.name(),
                "backend does not branch on integers, integer variables are relaxed"
            );
        }
        if !backend.supports_interruption() && self.verbose(Verbosity::Debug) {
            debug!(
                backend = backend.name(),
                "backend cannot be interrupted mid-solve, cancellation is checked between partitions"
            );
        }
        let backend_config = self.config.backend_config(mode, integral);
        debug!(%mode, integral, backend = backend.name(), "solving mode resolved");

        let (jobs, components, partitioning_time) = if self.config.partition_size > 0 {
            run.advance(SolveStage::Partition);
            let started = Instant::now();
            let partitioning =
                partition(problem, self.config.partition_size).map_err(|e| run.fail(e))?;
            let elapsed = started.elapsed();
            let components = partitioning.components();

            let jobs: Vec<Job> = match partitioning {
                Partitioning::Whole { problem, .. } => vec![Job::whole(problem)],
                Partitioning::Split { partitions, .. } => {
                    partitions.into_iter().map(Job::from).collect()
                }
            };
            if self.verbose(Verbosity::Info) {
                info!(
                    components,
                    partitions = jobs.len(),
                    elapsed = ?elapsed,
                    "problem partitioned"
                );
            }
            (jobs, components, Some(elapsed))
        } else {
            (vec![Job::whole(problem)], 1, None)
        };

        Ok(Plan {
            summary: Summary {
                mode,
                backend: backend.name().to_string(),
                components,
                partitioning_time,
            },
            backend,
            backend_config,
            jobs,
        })
    }

    fn finish(&self, summary: Summary, solved: Vec<SolvedJob>, run: &mut Run) -> Result<Solution> {
        run.advance(SolveStage::Merge);
        let physical_solves = solved.len();
        let partition_times = solved.iter().map(|job| job.elapsed).collect();
        let result =
            merge(solved.into_iter().map(|job| (job.map, job.result))).map_err(|e| run.fail(e))?;

        let statistics = SolverStatistics {
            mode: summary.mode,
            backend: summary.backend,
            components: summary.components,
            physical_solves,
            partition_times,
            partitioning_time: summary.partitioning_time,
            solver_time: result.solving_time,
            total_time: run.started.elapsed(),
        };
        run.advance(SolveStage::Done);

        if self.verbose(Verbosity::Info) {
            info!(
                partitions = statistics.physical_solves,
                variables = result.num_variables(),
                partitioning = ?statistics.partitioning_time,
                solving = ?statistics.solver_time,
                total = ?statistics.total_time,
                "solve finished"
            );
        }

        Ok(Solution { result, statistics })
    }

    fn resolve_mode(&self, problem: &Problem) -> (SolvingMode, bool) {
        match self.config.mode {
            SolvingMode::Auto if problem.has_integral_variables() => (SolvingMode::Mip, true),
            SolvingMode::Auto | SolvingMode::Basic => (SolvingMode::Basic, false),
            SolvingMode::Mip => (SolvingMode::Mip, true),
            SolvingMode::Custom => (SolvingMode::Custom, problem.has_integral_variables()),
        }
    }

    fn backend_for(&self, mode: SolvingMode) -> Result<Arc<dyn SolverBackend>> {
        match &self.backend {
            Some(backend) => Ok(Arc::clone(backend)),
            None => SolverFactory::create_for_mode(mode, self.config.custom_backend),
        }
    }

    fn verbose(&self, level: Verbosity) -> bool {
        self.config.verbosity >= level
    }

    fn log_partition(&self, position: usize, job: &SolvedJob) {
        if self.verbose(Verbosity::Debug) {
            debug!(
                partition = position,
                variables = job.map.len(),
                elapsed = ?job.elapsed,
                "partition solved"
            );
        }
    }
}

/// Compact one job, hand it to the backend and tag any failure with its partition.
/// The job's problem is dropped before this returns.
fn run_job(
    backend: &dyn SolverBackend,
    config: &BackendConfig,
    job: Job,
    cancel: &CancellationToken,
) -> Result<SolvedJob> {
    let Job {
        partition,
        mut problem,
        constraint_origin,
    } = job;
    let started = Instant::now();

    let outcome = cancel.check().and_then(|()| {
        let map = compact(&mut problem)?;
        let result = backend.solve(&problem, config, cancel)?;
        if result.num_variables() != map.len() {
            return Err(SolverError::ExecutionFailed {
                backend: backend.name().to_string(),
                message: format!(
                    "returned {} values for {} variables",
                    result.num_variables(),
                    map.len()
                ),
            });
        }
        Ok((map, result))
    });
    drop(problem);

    let (map, result) = outcome.map_err(|error| {
        let error = match &constraint_origin {
            Some(origin) => error.with_constraint_origin(origin),
            None => error,
        };
        match partition {
            Some(index) => error.in_partition(index),
            None => error,
        }
    })?;

    Ok(SolvedJob {
        map,
        result,
        elapsed: started.elapsed(),
    })
}

/// The failure to report: a real failure beats the cancellations it caused,
/// lower partitions beat higher ones
fn first_failure(mut failures: Vec<(usize, SolverError)>) -> Option<SolverError> {
    failures.sort_by_key(|(position, error)| (error.is_cancelled(), *position));
    failures.into_iter().next().map(|(_, error)| error)
}

fn with_logger<T>(logger: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match logger {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}
