// Domain service interface for solving optimization problems
// Defines the contract that any solver backend must follow

use super::cancellation::CancellationToken;
use super::models::{Problem, SolverResult};
use super::value_objects::{Comparator, ConstraintClass, SolvingMode, Verbosity};

/// Broad category of a [`SolverError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, never retried
    Specification,
    /// The backend found no feasible or optimal solution
    Infeasibility,
    /// Internal fault of the underlying solver library
    Backend,
    /// Externally requested interruption
    Cancellation,
}

/// Error types for the solver
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: variable {variable} in {location} is out of range (variable count {variable_count})")]
    VariableOutOfRange {
        variable: usize,
        variable_count: usize,
        location: String,
    },

    #[error("Invalid problem: variable type table has {actual} entries but the variable count is {expected}")]
    TypeTableMismatch { expected: usize, actual: usize },

    #[error("Invalid problem: constraint {constraint} involves no variables")]
    EmptyConstraint { constraint: usize },

    #[error("Invalid problem: constraint {constraint} uses '{comparator}' on a {class} row; only =, >=, <= are allowed there, < and > need integer rows and != needs boolean rows")]
    UnsupportedComparator {
        constraint: usize,
        comparator: Comparator,
        class: ConstraintClass,
    },

    #[error("Invalid problem: objective variable {variable} does not appear in any constraint")]
    UnboundVariable { variable: usize },

    #[error("Invalid problem: no variables are referenced by the objective or the constraints")]
    EmptyProblem,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No solution found by {backend}: {reason}")]
    Infeasible { backend: String, reason: String },

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed in {backend}: {message}")]
    ExecutionFailed { backend: String, message: String },

    #[error("Solve cancelled")]
    Cancelled,

    #[error("Partition {partition} failed: {source}")]
    Partition {
        partition: usize,
        #[source]
        source: Box<SolverError>,
    },
}

impl SolverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SolverError::VariableOutOfRange { .. }
            | SolverError::TypeTableMismatch { .. }
            | SolverError::EmptyConstraint { .. }
            | SolverError::UnsupportedComparator { .. }
            | SolverError::UnboundVariable { .. }
            | SolverError::EmptyProblem
            | SolverError::InvalidConfig(_) => ErrorKind::Specification,
            SolverError::Infeasible { .. } => ErrorKind::Infeasibility,
            SolverError::SolverNotAvailable(_) | SolverError::ExecutionFailed { .. } => {
                ErrorKind::Backend
            }
            SolverError::Cancelled => ErrorKind::Cancellation,
            SolverError::Partition { source, .. } => source.kind(),
        }
    }

    /// True when the solve was stopped rather than failed
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }

    /// Partition number, when the failure happened inside one
    pub fn partition(&self) -> Option<usize> {
        match self {
            SolverError::Partition { partition, .. } => Some(*partition),
            _ => None,
        }
    }

    /// Rewrites partition-local constraint positions into positions of the original problem.
    pub(crate) fn with_constraint_origin(self, origin: &[usize]) -> Self {
        let remap = |local: usize| origin.get(local).copied().unwrap_or(local);
        match self {
            SolverError::EmptyConstraint { constraint } => SolverError::EmptyConstraint {
                constraint: remap(constraint),
            },
            SolverError::UnsupportedComparator {
                constraint,
                comparator,
                class,
            } => SolverError::UnsupportedComparator {
                constraint: remap(constraint),
                comparator,
                class,
            },
            other => other,
        }
    }

    pub(crate) fn in_partition(self, partition: usize) -> Self {
        match self {
            SolverError::Partition { .. } => self,
            other => SolverError::Partition {
                partition,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Settings handed to a backend for one physical solve
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Resolved mode, never `Auto`
    pub mode: SolvingMode,
    /// Whether integer and boolean variables are branched on
    pub integral: bool,
    pub verbosity: Verbosity,
    /// Backend-specific arguments, forwarded verbatim
    pub arguments: Option<String>,
}

impl BackendConfig {
    pub fn new(mode: SolvingMode, integral: bool) -> Self {
        Self {
            mode,
            integral,
            verbosity: Verbosity::default(),
            arguments: None,
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_arguments(mut self, arguments: Option<String>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Splits the argument string into `key=value` pairs; bare tokens map to an empty value.
    pub fn argument_pairs(&self) -> Vec<(&str, &str)> {
        self.arguments
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|token| token.split_once('=').unwrap_or((token, "")))
            .collect()
    }
}

/// Numeric solver backend
///
/// A backend receives a compacted problem (dense variable indices `0..variable_count`)
/// and returns values in that same local index space. Any model memory it builds
/// must be released before it returns, on success and failure alike.
pub trait SolverBackend: Send + Sync {
    /// Solve a compacted problem
    fn solve(
        &self,
        problem: &Problem,
        config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult>;

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Check if this backend supports integer branching
    fn supports_mip(&self) -> bool;

    /// Check if this backend polls the cancellation token while solving
    fn supports_interruption(&self) -> bool {
        false
    }
}
