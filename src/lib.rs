// Domain layer: problem model, validation and the backend contract
pub mod domain;

// Application layer: partitioning, compaction, orchestration and merging
pub mod application;

// Solver adapters: concrete implementations of SolverBackend
pub mod solver;

// Infrastructure layer: command-line front end
#[cfg(feature = "cli")]
pub mod infrastructure;

// Re-export commonly used types
pub use domain::{
    BackendConfig, BackendKind, CancellationToken, Comparator, Constraint, ErrorKind,
    LinearExpression, ObjectiveDirection, Problem, Solution, SolverBackend, SolverConfig,
    SolverError, SolverResult, SolverStatistics, SolvingMode, Term, VariableType, Verbosity,
};

pub use application::{SolveOrchestrator, SolveStage};

pub use solver::{BlackBoxSolver, BranchAndBoundSolver, SimplexSolver, SolverFactory};

#[cfg(feature = "highs")]
pub use solver::HighsSolver;

#[cfg(feature = "cli")]
pub use infrastructure::{run, Cli};
