// HiGHS adapter
// Builds a row-wise HiGHS model from a compacted problem

use crate::domain::translation::row_bounds;
use crate::domain::{
    BackendConfig, CancellationToken, ObjectiveDirection, Problem, Result, SolverBackend,
    SolverError, SolverResult, VariableType, Verbosity,
};
use highs::{Col, HighsModelStatus, Model, RowProblem, Sense};
use std::fmt;
use std::time::Instant;
use tracing::debug;

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }

    fn apply_options(model: &mut Model, config: &BackendConfig) -> Result<()> {
        let output = config.verbosity >= Verbosity::Debug;
        model
            .try_set_option("output_flag", output)
            .map_err(|status| rejected("output_flag", status))?;
        for (key, value) in config.argument_pairs() {
            if key.contains('\0') || value.contains('\0') {
                return Err(SolverError::InvalidConfig(format!(
                    "HiGHS option {:?} contains a NUL byte",
                    key
                )));
            }
            let applied = if let Ok(flag) = value.parse::<bool>() {
                model.try_set_option(key, flag)
            } else if let Ok(number) = value.parse::<i32>() {
                model.try_set_option(key, number)
            } else if let Ok(number) = value.parse::<f64>() {
                model.try_set_option(key, number)
            } else {
                model.try_set_option(key, value)
            };
            applied.map_err(|status| rejected(key, status))?;
        }
        Ok(())
    }
}

fn rejected(key: &str, status: impl fmt::Debug) -> SolverError {
    SolverError::InvalidConfig(format!("HiGHS rejected option {:?}: {:?}", key, status))
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for HighsSolver {
    fn solve(
        &self,
        problem: &Problem,
        config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult> {
        cancel.check()?;
        let started = Instant::now();
        let n = problem.variable_count;

        // Objective coefficients per column, duplicates summed
        let mut costs = vec![0.0; n];
        if let Some(objective) = &problem.objective {
            for term in &objective.terms {
                let cost = costs
                    .get_mut(term.variable)
                    .ok_or(SolverError::VariableOutOfRange {
                        variable: term.variable,
                        variable_count: n,
                        location: "the objective".to_string(),
                    })?;
                *cost += term.coefficient;
            }
        }

        let mut pb = RowProblem::default();
        let columns: Vec<Col> = problem
            .variable_types
            .iter()
            .zip(&costs)
            .map(|(&ty, &cost)| {
                let (lower, upper) = match ty {
                    VariableType::Boolean => (0.0, 1.0),
                    _ => (f64::NEG_INFINITY, f64::INFINITY),
                };
                if config.integral && ty.is_integral() {
                    pb.add_integer_column(cost, lower..=upper)
                } else {
                    pb.add_column(cost, lower..=upper)
                }
            })
            .collect();

        for (position, c) in problem.constraints.iter().enumerate() {
            let bounds = row_bounds(position, c, &problem.variable_types)?;
            let mut factors: Vec<(Col, f64)> = Vec::with_capacity(c.num_terms());
            for term in &c.expression.terms {
                let column = columns.get(term.variable).copied().ok_or_else(|| {
                    SolverError::VariableOutOfRange {
                        variable: term.variable,
                        variable_count: n,
                        location: format!("constraint {}", position),
                    }
                })?;
                factors.push((column, term.coefficient));
            }
            pb.add_row(bounds.lower..=bounds.upper, &factors);
        }

        let sense = match problem.direction {
            ObjectiveDirection::Minimize => Sense::Minimise,
            ObjectiveDirection::Maximize => Sense::Maximise,
        };
        let mut model = pb.optimise(sense);
        Self::apply_options(&mut model, config)?;
        debug!(columns = n, rows = problem.num_constraints(), "HiGHS model built");

        let solved = model.solve();
        match solved.status() {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let values = solution
                    .columns()
                    .iter()
                    .zip(problem.variable_types.iter())
                    .map(|(&value, ty)| {
                        if config.integral && ty.is_integral() {
                            value.round() + 0.0
                        } else {
                            value
                        }
                    })
                    .collect();
                Ok(SolverResult::dense(values, started.elapsed()))
            }
            HighsModelStatus::Infeasible => Err(SolverError::Infeasible {
                backend: self.name().to_string(),
                reason: "no solution satisfies all constraints".to_string(),
            }),
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Err(SolverError::Infeasible {
                    backend: self.name().to_string(),
                    reason: "objective can be improved infinitely".to_string(),
                })
            }
            status => Err(SolverError::ExecutionFailed {
                backend: self.name().to_string(),
                message: format!("HiGHS returned status {:?}", status),
            }),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}
