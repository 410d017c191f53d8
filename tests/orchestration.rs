mod common;

use common::{independent, single, RecordingBackend, SharedBuffer};
use splitopt::{
    BackendConfig, CancellationToken, Comparator, Constraint, ErrorKind, LinearExpression,
    Problem, SolveOrchestrator, SolverBackend, SolverConfig, SolverError, SolverResult,
    SolvingMode, VariableType, Verbosity,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn solve(config: SolverConfig, problem: Problem) -> Result<splitopt::Solution, SolverError> {
    SolveOrchestrator::new(config).solve(problem, &CancellationToken::new())
}

#[test]
fn independent_rows_split_into_two_partitions() {
    let problem = Problem::minimize(vec![VariableType::Continuous; 3])
        .with_objective(LinearExpression::from_terms([(1, 1.0), (2, 1.0)]))
        .add_constraint(single(1, Comparator::Ge, 1.0))
        .add_constraint(single(2, Comparator::Ge, 1.0));

    let solution = solve(SolverConfig::default(), problem).unwrap();
    assert_eq!(solution.statistics.components, 2);
    assert_eq!(solution.statistics.physical_solves, 2);
    assert_eq!(solution.statistics.backend, "Simplex");
    assert_eq!(solution.result.indices, vec![1, 2]);
    for value in &solution.result.values {
        assert!((value - 1.0).abs() < 1e-6);
    }
}

#[test]
fn boolean_not_equal_solves_to_the_complement() {
    let problem = Problem::minimize(vec![VariableType::Continuous, VariableType::Boolean])
        .add_constraint(single(1, Comparator::Ne, 1.0));

    let solution = solve(SolverConfig::default(), problem).unwrap();
    assert_eq!(solution.statistics.mode, SolvingMode::Mip);
    assert_eq!(solution.value_of(1), Some(0.0));
}

#[test]
fn strict_integer_rows_tighten_by_one() {
    // minimise x2 - x1 with x1 < 5 and x2 > 5
    let problem = Problem::minimize(vec![VariableType::Integer; 3])
        .with_objective(LinearExpression::from_terms([(1, -1.0), (2, 1.0)]))
        .add_constraint(single(1, Comparator::Lt, 5.0))
        .add_constraint(single(2, Comparator::Gt, 5.0));

    let solution = solve(SolverConfig::default(), problem).unwrap();
    assert_eq!(solution.value_of(1), Some(4.0));
    assert_eq!(solution.value_of(2), Some(6.0));
}

#[test]
fn zero_term_constraint_aborts_before_any_backend_call() {
    let backend = RecordingBackend::new();
    let problem = Problem::minimize(vec![VariableType::Continuous; 3])
        .add_constraint(single(1, Comparator::Ge, 1.0))
        .add_constraint(Constraint::new(LinearExpression::new(), Comparator::Ge, 0.0))
        .add_constraint(single(2, Comparator::Ge, 1.0));

    let err = SolveOrchestrator::with_backend(SolverConfig::default(), backend.clone())
        .solve(problem, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, SolverError::EmptyConstraint { constraint: 1 }));
    assert_eq!(err.kind(), ErrorKind::Specification);
    assert!(backend.sizes().is_empty());
}

#[test]
fn partition_size_two_groups_five_components() {
    let backend = RecordingBackend::new();
    let config = SolverConfig::default().with_partition_size(2);

    let solution = SolveOrchestrator::with_backend(config, backend.clone())
        .solve(independent(5), &CancellationToken::new())
        .unwrap();
    assert_eq!(backend.sizes(), vec![2, 2, 1]);
    assert_eq!(solution.statistics.components, 5);
    assert_eq!(solution.statistics.physical_solves, 3);
    assert_eq!(solution.statistics.partition_times.len(), 3);
    assert_eq!(solution.result.indices, vec![1, 2, 3, 4, 5]);
    assert_eq!(solution.result.values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn every_referenced_variable_is_reported_once() {
    // chain 1-2-3, pair 5-6, singleton 8; 0, 4 and 7 unused
    let pair = |a: usize, b: usize| {
        Constraint::new(
            LinearExpression::from_terms([(a, 1.0), (b, 1.0)]),
            Comparator::Le,
            10.0,
        )
    };
    let problem = Problem::minimize(vec![VariableType::Continuous; 9])
        .add_constraint(pair(1, 2))
        .add_constraint(pair(5, 6))
        .add_constraint(pair(2, 3))
        .add_constraint(single(8, Comparator::Ge, 8.0));
    let backend = RecordingBackend::new();

    let solution = SolveOrchestrator::with_backend(SolverConfig::default(), backend.clone())
        .solve(problem, &CancellationToken::new())
        .unwrap();
    assert_eq!(solution.statistics.components, 3);
    assert_eq!(backend.sizes(), vec![3, 2, 1]);

    let mut indices = solution.result.indices.clone();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2, 3, 5, 6, 8]);
    assert_eq!(solution.value_of(8), Some(8.0));
    assert_eq!(solution.value_of(4), None);
}

#[test]
fn backends_see_resolved_mode_and_arguments() {
    let backend = RecordingBackend::new();
    let config = SolverConfig::default()
        .with_verbosity(Verbosity::Debug)
        .with_arguments("iterations=10");
    let mut problem = independent(1);
    problem.variable_types = vec![VariableType::Continuous, VariableType::Integer].into();

    SolveOrchestrator::with_backend(config, backend.clone())
        .solve(problem, &CancellationToken::new())
        .unwrap();
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls[0].config.mode, SolvingMode::Mip);
    assert!(calls[0].config.integral);
    assert_eq!(calls[0].config.verbosity, Verbosity::Debug);
    assert_eq!(calls[0].config.arguments.as_deref(), Some("iterations=10"));
}

#[test]
fn unbound_objective_variable_is_a_specification_error() {
    let mut problem =
        independent(2).with_objective(LinearExpression::from_terms([(1, 1.0), (3, 1.0)]));
    problem.variable_types = vec![VariableType::Continuous; 4].into();
    problem.variable_count = 4;

    let err = solve(SolverConfig::default(), problem).unwrap_err();
    assert!(matches!(err, SolverError::UnboundVariable { variable: 3 }));
}

#[test]
fn out_of_range_and_empty_problems_are_rejected() {
    let out_of_range = independent(2).add_constraint(single(9, Comparator::Ge, 0.0));
    assert!(matches!(
        solve(SolverConfig::default(), out_of_range),
        Err(SolverError::VariableOutOfRange { variable: 9, .. })
    ));

    let empty = Problem::minimize(vec![VariableType::Continuous; 2]);
    assert!(matches!(
        solve(SolverConfig::default(), empty),
        Err(SolverError::EmptyProblem)
    ));

    let workers = SolverConfig::default().with_workers(0);
    assert!(matches!(
        solve(workers, independent(1)),
        Err(SolverError::InvalidConfig(_))
    ));
}

#[test]
fn infeasible_partition_names_its_number() {
    let problem = independent(2).add_constraint(single(2, Comparator::Le, 0.0));

    let err = solve(SolverConfig::default(), problem).unwrap_err();
    assert_eq!(err.partition(), Some(1));
    assert_eq!(err.kind(), ErrorKind::Infeasibility);
}

#[test]
fn cancellation_between_partitions_stops_the_solve() {
    let cancel = CancellationToken::new();
    let backend = Arc::new(RecordingBackend {
        cancel_on_call: Some((1, cancel.clone())),
        ..Default::default()
    });

    let err = SolveOrchestrator::with_backend(SolverConfig::default(), backend.clone())
        .solve(independent(4), &cancel)
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.partition(), Some(1));
    assert_eq!(backend.sizes(), vec![1, 1]);
}

#[test]
fn explicit_logger_receives_the_run_summary() {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let config = SolverConfig::default()
        .with_verbosity(Verbosity::Debug)
        .with_logger(tracing::Dispatch::new(subscriber));

    SolveOrchestrator::with_backend(config, RecordingBackend::new())
        .solve(independent(2), &CancellationToken::new())
        .unwrap();
    let logs = buffer.contents();
    assert!(logs.contains("problem partitioned"), "{}", logs);
    assert!(logs.contains("partition solved"), "{}", logs);
    assert!(logs.contains("solve finished"), "{}", logs);
    assert!(logs.contains("backend cannot be interrupted"), "{}", logs);
}

#[test]
fn quiet_verbosity_suppresses_the_summary() {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let config = SolverConfig::default().with_logger(tracing::Dispatch::new(subscriber));

    SolveOrchestrator::with_backend(config, RecordingBackend::new())
        .solve(independent(2), &CancellationToken::new())
        .unwrap();
    assert!(!buffer.contents().contains("solve finished"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_solve_merges_in_partition_order() {
    let backend = RecordingBackend::new();
    let config = SolverConfig::default().with_workers(4);
    let orchestrator = SolveOrchestrator::with_backend(config, backend.clone());

    let solution = orchestrator
        .solve_concurrent(independent(12), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(solution.result.indices, (1..=12).collect::<Vec<_>>());
    assert_eq!(
        solution.result.values,
        (1..=12).map(|v| v as f64).collect::<Vec<_>>()
    );
    assert_eq!(backend.sizes().len(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_solve_reports_the_first_failing_partition() {
    let problem = independent(4).add_constraint(single(3, Comparator::Le, 0.0));
    let orchestrator = SolveOrchestrator::new(SolverConfig::default().with_workers(2));

    let err = orchestrator
        .solve_concurrent(problem, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.partition(), Some(2));
}

/// Fails the row `x >= 1` after a short delay; every other row sleeps longer,
/// then records that it finished and whether it saw the cancellation
#[derive(Default)]
struct SlowSiblings {
    finished: AtomicUsize,
    saw_cancel: AtomicUsize,
}

impl SolverBackend for SlowSiblings {
    fn solve(
        &self,
        problem: &Problem,
        _config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult, SolverError> {
        let rhs = problem.constraints[0].value();
        if rhs == 1.0 {
            thread::sleep(Duration::from_millis(100));
            return Err(SolverError::Infeasible {
                backend: self.name().to_string(),
                reason: "rigged".to_string(),
            });
        }
        thread::sleep(Duration::from_millis(400));
        if cancel.is_cancelled() {
            self.saw_cancel.fetch_add(1, Ordering::SeqCst);
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(SolverResult::dense(vec![rhs], Duration::from_millis(400)))
    }

    fn name(&self) -> &str {
        "slow"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_failure_waits_for_running_siblings() {
    let backend = Arc::new(SlowSiblings::default());
    let config = SolverConfig::default().with_workers(3);
    let orchestrator = SolveOrchestrator::with_backend(config, backend.clone());
    let cancel = CancellationToken::new();

    let err = orchestrator
        .solve_concurrent(independent(3), &cancel)
        .await
        .unwrap_err();
    assert_eq!(backend.finished.load(Ordering::SeqCst), 2);
    assert_eq!(backend.saw_cancel.load(Ordering::SeqCst), 2);
    assert_eq!(err.partition(), Some(0));
    assert_eq!(err.kind(), ErrorKind::Infeasibility);
    assert!(!cancel.is_cancelled());
}
