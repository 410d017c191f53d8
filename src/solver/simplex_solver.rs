// Simplex adapter
// Solves the linear relaxation of a compacted problem with good_lp's microlp engine

use super::good_lp_model;
use crate::domain::{
    BackendConfig, CancellationToken, Problem, Result, SolverBackend, SolverResult,
};
use good_lp::solvers::microlp::microlp;
use std::time::Instant;
use tracing::{debug, warn};

pub struct SimplexSolver;

impl SimplexSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SimplexSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for SimplexSolver {
    fn solve(
        &self,
        problem: &Problem,
        config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult> {
        cancel.check()?;
        if !config.argument_pairs().is_empty() {
            warn!(backend = self.name(), "backend takes no arguments, ignoring them");
        }

        let started = Instant::now();
        let lp = good_lp_model::build(problem, false, microlp)?;
        debug!(
            columns = problem.variable_count,
            rows = problem.num_constraints(),
            "simplex model built"
        );
        good_lp_model::solve(lp, self.name(), started)
    }

    fn name(&self) -> &str {
        "Simplex"
    }

    fn supports_mip(&self) -> bool {
        false
    }
}
