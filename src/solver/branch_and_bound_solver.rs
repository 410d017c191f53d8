// Branch-and-bound adapter
// Solves compacted mixed-integer problems through good_lp, on microlp by default
// or on CBC with the `coin_cbc` feature

use super::good_lp_model::{self, LpModel};
use crate::domain::{
    BackendConfig, CancellationToken, Problem, Result, SolverBackend, SolverResult,
};
use good_lp::{ResolutionError, SolverModel};
use std::time::Instant;
use tracing::debug;

pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }

    #[cfg(feature = "coin_cbc")]
    fn build(
        &self,
        problem: &Problem,
        config: &BackendConfig,
    ) -> Result<LpModel<impl SolverModel<Error = ResolutionError>>> {
        use crate::domain::Verbosity;
        use good_lp::solvers::coin_cbc::coin_cbc;

        let mut lp = good_lp_model::build(problem, config.integral, coin_cbc)?;
        let log_level = if config.verbosity >= Verbosity::Debug { "1" } else { "0" };
        lp.model.set_parameter("logLevel", log_level);
        for (key, value) in config.argument_pairs() {
            lp.model.set_parameter(key, value);
        }
        Ok(lp)
    }

    #[cfg(not(feature = "coin_cbc"))]
    fn build(
        &self,
        problem: &Problem,
        config: &BackendConfig,
    ) -> Result<LpModel<impl SolverModel<Error = ResolutionError>>> {
        use good_lp::solvers::microlp::microlp;

        if !config.argument_pairs().is_empty() {
            debug!(backend = self.name(), "microlp takes no arguments, ignoring them");
        }
        good_lp_model::build(problem, config.integral, microlp)
    }
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for BranchAndBoundSolver {
    fn solve(
        &self,
        problem: &Problem,
        config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult> {
        cancel.check()?;

        let started = Instant::now();
        let lp = self.build(problem, config)?;
        debug!(
            columns = problem.variable_count,
            rows = problem.num_constraints(),
            integral = config.integral,
            "branch-and-bound model built"
        );
        good_lp_model::solve(lp, self.name(), started)
    }

    fn name(&self) -> &str {
        "Branch-and-Bound"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Comparator, Constraint, LinearExpression, SolvingMode, VariableType};

    fn mip() -> BackendConfig {
        BackendConfig::new(SolvingMode::Mip, true)
    }

    #[test]
    fn strict_integer_bounds_are_tightened() {
        let x = || LinearExpression::new().term(0, 1.0);
        let below = Problem::maximize(vec![VariableType::Integer])
            .with_objective(x())
            .add_constraint(Constraint::new(x(), Comparator::Lt, 5.0));
        let above = Problem::minimize(vec![VariableType::Integer])
            .with_objective(x())
            .add_constraint(Constraint::new(x(), Comparator::Gt, 5.0));

        let solver = BranchAndBoundSolver::new();
        let cancel = CancellationToken::new();
        assert_eq!(solver.solve(&below, &mip(), &cancel).unwrap().values, vec![4.0]);
        assert_eq!(solver.solve(&above, &mip(), &cancel).unwrap().values, vec![6.0]);
    }

    #[test]
    fn boolean_not_equal_fixes_the_complement() {
        let problem = Problem::maximize(vec![VariableType::Boolean])
            .with_objective(LinearExpression::new().term(0, 1.0))
            .add_constraint(Constraint::new(
                LinearExpression::new().term(0, 1.0),
                Comparator::Ne,
                1.0,
            ));

        let result = BranchAndBoundSolver::new()
            .solve(&problem, &mip(), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.values, vec![0.0]);
    }

    #[test]
    fn integer_rows_are_branched() {
        // maximise x + y with 2x + 2y <= 5: relaxation 2.5, integer optimum 2
        let problem = Problem::maximize(vec![VariableType::Integer; 2])
            .with_objective(LinearExpression::from_terms([(0, 1.0), (1, 1.0)]))
            .add_constraint(Constraint::new(
                LinearExpression::from_terms([(0, 2.0), (1, 2.0)]),
                Comparator::Le,
                5.0,
            ))
            .add_constraint(Constraint::new(
                LinearExpression::new().term(0, 1.0),
                Comparator::Ge,
                0.0,
            ))
            .add_constraint(Constraint::new(
                LinearExpression::new().term(1, 1.0),
                Comparator::Ge,
                0.0,
            ));

        let result = BranchAndBoundSolver::new()
            .solve(&problem, &mip(), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.values.iter().sum::<f64>(), 2.0);
    }
}
