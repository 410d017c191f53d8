use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::Dispatch;

use super::solver_service::{BackendConfig, Result, SolverError};
use super::translation;
use super::value_objects::{
    BackendKind, Comparator, ObjectiveDirection, SolvingMode, VariableType, Verbosity,
};

/// One `coefficient * x[variable]` term
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub variable: usize,
    pub coefficient: f64,
}

/// Constant plus an ordered list of terms
///
/// Terms are kept in insertion order and may repeat a variable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearExpression {
    #[serde(default)]
    pub constant: f64,
    #[serde(default)]
    pub terms: Vec<Term>,
}

impl LinearExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_terms(terms: impl IntoIterator<Item = (usize, f64)>) -> Self {
        Self {
            constant: 0.0,
            terms: terms
                .into_iter()
                .map(|(variable, coefficient)| Term {
                    variable,
                    coefficient,
                })
                .collect(),
        }
    }

    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant = constant;
        self
    }

    pub fn term(mut self, variable: usize, coefficient: f64) -> Self {
        self.terms.push(Term {
            variable,
            coefficient,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = usize> + '_ {
        self.terms.iter().map(|t| t.variable)
    }

    /// Value of the expression for `values` indexed by variable number
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().fold(self.constant, |acc, t| {
            acc + t.coefficient * values.get(t.variable).copied().unwrap_or(0.0)
        })
    }
}

/// Linear constraint `expression <comparator> rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub expression: LinearExpression,
    pub comparator: Comparator,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(expression: LinearExpression, comparator: Comparator, rhs: f64) -> Self {
        Self {
            expression,
            comparator,
            rhs,
        }
    }

    /// Right-hand side with the expression constant moved across
    pub fn value(&self) -> f64 {
        self.rhs - self.expression.constant
    }

    pub fn num_terms(&self) -> usize {
        self.expression.terms.len()
    }
}

/// Complete optimization problem
///
/// `variable_types` is shared read-only between the partitions of one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub direction: ObjectiveDirection,
    #[serde(default)]
    pub objective: Option<LinearExpression>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    pub variable_types: Arc<[VariableType]>,
    pub variable_count: usize,
}

impl Problem {
    pub fn new(direction: ObjectiveDirection, variable_types: Vec<VariableType>) -> Self {
        Self {
            direction,
            objective: None,
            constraints: Vec::new(),
            variable_count: variable_types.len(),
            variable_types: variable_types.into(),
        }
    }

    pub fn minimize(variable_types: Vec<VariableType>) -> Self {
        Self::new(ObjectiveDirection::Minimize, variable_types)
    }

    pub fn maximize(variable_types: Vec<VariableType>) -> Self {
        Self::new(ObjectiveDirection::Maximize, variable_types)
    }

    pub fn with_objective(mut self, objective: LinearExpression) -> Self {
        self.objective = Some(objective);
        self
    }

    pub fn add_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn variable_type(&self, variable: usize) -> Option<VariableType> {
        self.variable_types.get(variable).copied()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Sorted, duplicate-free set of variables used by the objective or any constraint
    pub fn referenced_variables(&self) -> Vec<usize> {
        let mut seen = BTreeSet::new();
        if let Some(objective) = &self.objective {
            seen.extend(objective.variables());
        }
        for constraint in &self.constraints {
            seen.extend(constraint.expression.variables());
        }
        seen.into_iter().collect()
    }

    /// True when any referenced variable is integer or boolean
    pub fn has_integral_variables(&self) -> bool {
        let objective = self.objective.iter().flat_map(|o| o.variables());
        let rows = self
            .constraints
            .iter()
            .flat_map(|c| c.expression.variables());
        objective
            .chain(rows)
            .any(|v| self.variable_type(v).is_some_and(VariableType::is_integral))
    }

    /// Check the problem against the builder contract before anything is solved
    pub fn validate(&self) -> Result<()> {
        if self.variable_types.len() != self.variable_count {
            return Err(SolverError::TypeTableMismatch {
                expected: self.variable_count,
                actual: self.variable_types.len(),
            });
        }

        if let Some(objective) = &self.objective {
            self.check_range(objective, "the objective".to_string())?;
        }

        for (position, constraint) in self.constraints.iter().enumerate() {
            self.check_range(&constraint.expression, format!("constraint {}", position))?;
            translation::row_bounds(position, constraint, &self.variable_types)?;
        }

        Ok(())
    }

    fn check_range(&self, expression: &LinearExpression, location: String) -> Result<()> {
        match expression.variables().find(|&v| v >= self.variable_count) {
            Some(variable) => Err(SolverError::VariableOutOfRange {
                variable,
                variable_count: self.variable_count,
                location,
            }),
            None => Ok(()),
        }
    }
}

/// Values found for a set of variables
///
/// `indices[i]` is the variable whose value is `values[i]`. Backends fill it in the
/// partition-local index space; the merged result uses global indices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolverResult {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
    pub solving_time: Duration,
}

impl SolverResult {
    pub fn new(indices: Vec<usize>, values: Vec<f64>, solving_time: Duration) -> Self {
        Self {
            indices,
            values,
            solving_time,
        }
    }

    /// Result for a compacted problem whose variables are `0..values.len()`
    pub fn dense(values: Vec<f64>, solving_time: Duration) -> Self {
        Self {
            indices: (0..values.len()).collect(),
            values,
            solving_time,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.indices.len()
    }

    pub fn value_of(&self, variable: usize) -> Option<f64> {
        self.indices
            .iter()
            .position(|&i| i == variable)
            .and_then(|pos| self.values.get(pos).copied())
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Configuration for a solve request
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub mode: SolvingMode,
    /// Backend used when `mode` is `Custom`
    pub custom_backend: BackendKind,
    pub verbosity: Verbosity,
    /// Components per physical solve; 0 disables partitioning
    pub partition_size: usize,
    /// Opaque backend arguments
    pub arguments: Option<String>,
    /// Upper bound on concurrently solved partitions in `solve_concurrent`
    pub workers: usize,
    /// Subscriber that receives every event of a solve; the ambient one when unset
    pub logger: Option<Dispatch>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: SolvingMode::Auto,
            custom_backend: BackendKind::BlackBox,
            verbosity: Verbosity::Warn,
            partition_size: 1,
            arguments: None,
            workers: 1,
            logger: None,
        }
    }
}

impl SolverConfig {
    pub fn with_mode(mut self, mode: SolvingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_custom_backend(mut self, backend: BackendKind) -> Self {
        self.custom_backend = backend;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_partition_size(mut self, partition_size: usize) -> Self {
        self.partition_size = partition_size;
        self
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SolverError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend settings for a resolved mode
    pub fn backend_config(&self, mode: SolvingMode, integral: bool) -> BackendConfig {
        BackendConfig::new(mode, integral)
            .with_verbosity(self.verbosity)
            .with_arguments(self.arguments.clone())
    }
}

/// Statistics about one solve request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolverStatistics {
    pub mode: SolvingMode,
    pub backend: String,
    /// Connected components found by the partitioner (1 when not partitioned)
    pub components: usize,
    pub physical_solves: usize,
    pub partition_times: Vec<Duration>,
    pub partitioning_time: Option<Duration>,
    /// Sum of backend solving times
    pub solver_time: Duration,
    /// Wall-clock time of the whole request
    pub total_time: Duration,
}

/// Solution to an optimization problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub result: SolverResult,
    pub statistics: SolverStatistics,
}

impl Solution {
    pub fn value_of(&self, variable: usize) -> Option<f64> {
        self.result.value_of(variable)
    }
}
