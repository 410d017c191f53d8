// Black-box adapter
// Derivative-free local unimodal sampling over the box spanned by the
// single-term rows, with multi-term rows folded into a penalty

use crate::domain::translation::{row_bounds, RowBounds};
use crate::domain::{
    BackendConfig, CancellationToken, LinearExpression, ObjectiveDirection, Problem, Result,
    SolverBackend, SolverError, SolverResult, VariableType,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, trace};

/// Search box edge for variables without a finite bound
const SEARCH_LIMIT: f64 = 1e9;
/// Weight of one unit of row violation in the cost
const PENALTY: f64 = 1e6;
/// Row tolerance of the final candidate, relative to the bound
const TOLERANCE: f64 = 1e-6;

/// Sampling parameters read from the backend argument string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingSettings {
    pub iterations: usize,
    pub seed: u64,
    pub runs: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            iterations: 20_000,
            seed: 1,
            runs: 1,
        }
    }
}

impl SamplingSettings {
    /// Parse `iterations=N seed=N runs=N` (also `n=` and `rndseed=`)
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let mut settings = Self::default();
        for (key, value) in config.argument_pairs() {
            match key {
                "iterations" | "n" => settings.iterations = parse(key, value)?,
                "seed" | "rndseed" => settings.seed = parse(key, value)?,
                "runs" => settings.runs = parse(key, value)?,
                other => {
                    return Err(SolverError::InvalidConfig(format!(
                        "unknown black-box argument '{}'",
                        other
                    )))
                }
            }
        }
        if settings.runs == 0 {
            return Err(SolverError::InvalidConfig(
                "black-box runs must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        SolverError::InvalidConfig(format!(
            "black-box argument '{}' expects a non-negative integer, got '{}'",
            key, value
        ))
    })
}

/// A row kept as a penalty term
struct Row {
    expression: LinearExpression,
    bounds: RowBounds,
}

/// Problem reshaped for sampling
struct Landscape {
    lower: Vec<f64>,
    upper: Vec<f64>,
    rounded: Vec<bool>,
    objective: Option<LinearExpression>,
    sign: f64,
    rows: Vec<Row>,
}

impl Landscape {
    fn new(problem: &Problem, backend: &str) -> Result<Self> {
        let n = problem.variable_count;
        let mut lower = vec![-SEARCH_LIMIT; n];
        let mut upper = vec![SEARCH_LIMIT; n];
        let mut rounded = vec![false; n];

        for (v, ty) in problem.variable_types.iter().enumerate().take(n) {
            rounded[v] = ty.is_integral();
            if *ty == VariableType::Boolean {
                lower[v] = 0.0;
                upper[v] = 1.0;
            }
        }

        let mut rows = Vec::new();
        for (position, c) in problem.constraints.iter().enumerate() {
            let bounds = row_bounds(position, c, &problem.variable_types)?;
            let single = match c.expression.terms.as_slice() {
                [term] if term.coefficient != 0.0 && term.variable < n => Some(*term),
                _ => None,
            };

            match single {
                Some(term) => {
                    let (lo, hi) = if term.coefficient > 0.0 {
                        (bounds.lower / term.coefficient, bounds.upper / term.coefficient)
                    } else {
                        (bounds.upper / term.coefficient, bounds.lower / term.coefficient)
                    };
                    lower[term.variable] = lower[term.variable].max(lo);
                    upper[term.variable] = upper[term.variable].min(hi);
                }
                None => rows.push(Row {
                    expression: c.expression.clone(),
                    bounds,
                }),
            }
        }

        for v in 0..n {
            if rounded[v] {
                lower[v] = (lower[v] - TOLERANCE).ceil();
                upper[v] = (upper[v] + TOLERANCE).floor();
            }
            if lower[v] > upper[v] {
                return Err(SolverError::Infeasible {
                    backend: backend.to_string(),
                    reason: format!(
                        "variable {} has an empty range [{}, {}]",
                        v, lower[v], upper[v]
                    ),
                });
            }
        }

        let sign = match problem.direction {
            ObjectiveDirection::Minimize => 1.0,
            ObjectiveDirection::Maximize => -1.0,
        };

        Ok(Self {
            lower,
            upper,
            rounded,
            objective: problem.objective.clone(),
            sign,
            rows,
        })
    }

    fn dimensions(&self) -> usize {
        self.lower.len()
    }

    // Row activity excludes the expression constant, which row_bounds moved to the bound.
    fn activity(expression: &LinearExpression, x: &[f64]) -> f64 {
        expression.evaluate(x) - expression.constant
    }

    fn violation(&self, x: &[f64]) -> f64 {
        self.rows
            .iter()
            .map(|row| row.bounds.violation(Self::activity(&row.expression, x)))
            .sum()
    }

    fn cost(&self, x: &[f64]) -> f64 {
        let objective = self.objective.as_ref().map_or(0.0, |o| o.evaluate(x));
        self.sign * objective + PENALTY * self.violation(x)
    }

    fn feasible(&self, x: &[f64]) -> bool {
        self.rows.iter().all(|row| {
            let activity = Self::activity(&row.expression, x);
            let scale = 1.0 + row.bounds.lower.abs().min(row.bounds.upper.abs());
            row.bounds.violation(activity) <= TOLERANCE * scale
        })
    }

    fn project(&self, v: usize, value: f64) -> f64 {
        let value = if self.rounded[v] { value.round() } else { value };
        // Normalise -0.0
        value.clamp(self.lower[v], self.upper[v]) + 0.0
    }

    fn random_point(&self, rng: &mut StdRng) -> Vec<f64> {
        (0..self.dimensions())
            .map(|v| {
                let value = if self.lower[v] < self.upper[v] {
                    rng.gen_range(self.lower[v]..=self.upper[v])
                } else {
                    self.lower[v]
                };
                self.project(v, value)
            })
            .collect()
    }
}

/// Local unimodal sampling backend
///
/// Variable bounds come from single-term rows, every other row is penalised.
/// The cancellation token is polled once per iteration.
pub struct BlackBoxSolver;

impl BlackBoxSolver {
    pub fn new() -> Self {
        Self
    }

    fn run(
        &self,
        landscape: &Landscape,
        iterations: usize,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<(Vec<f64>, f64)> {
        let n = landscape.dimensions();
        let mut x = landscape.random_point(rng);
        let mut cost = landscape.cost(&x);
        let mut range: Vec<f64> = (0..n)
            .map(|v| landscape.upper[v] - landscape.lower[v])
            .collect();
        // Shrink the sampling range by this factor after every failed step
        let decrease = 0.5_f64.powf(1.0 / (3.0 * n.max(1) as f64));

        let mut candidate = x.clone();
        for _ in 0..iterations {
            cancel.check()?;

            for v in 0..n {
                let step = if range[v] > 0.0 {
                    rng.gen_range(-range[v]..=range[v])
                } else {
                    0.0
                };
                candidate[v] = landscape.project(v, x[v] + step);
            }

            let candidate_cost = landscape.cost(&candidate);
            if candidate_cost < cost {
                x.copy_from_slice(&candidate);
                cost = candidate_cost;
            } else {
                range.iter_mut().for_each(|r| *r *= decrease);
            }
        }

        Ok((x, cost))
    }
}

impl Default for BlackBoxSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverBackend for BlackBoxSolver {
    fn solve(
        &self,
        problem: &Problem,
        config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult> {
        cancel.check()?;
        let settings = SamplingSettings::from_config(config)?;
        let started = Instant::now();

        let landscape = Landscape::new(problem, self.name())?;
        debug!(
            variables = landscape.dimensions(),
            penalised_rows = landscape.rows.len(),
            iterations = settings.iterations,
            runs = settings.runs,
            "black-box search prepared"
        );

        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut best: Option<(Vec<f64>, f64)> = None;
        for run in 0..settings.runs {
            let (x, cost) = self.run(&landscape, settings.iterations, &mut rng, cancel)?;
            trace!(run, cost, "black-box run finished");
            if best.as_ref().map_or(true, |(_, best_cost)| cost < *best_cost) {
                best = Some((x, cost));
            }
        }

        let (x, _) = best.ok_or_else(|| SolverError::ExecutionFailed {
            backend: self.name().to_string(),
            message: "no run was executed".to_string(),
        })?;
        if !landscape.feasible(&x) {
            return Err(SolverError::Infeasible {
                backend: self.name().to_string(),
                reason: format!(
                    "best candidate violates the rows by {}",
                    landscape.violation(&x)
                ),
            });
        }

        Ok(SolverResult::dense(x, started.elapsed()))
    }

    fn name(&self) -> &str {
        "Black-Box"
    }

    fn supports_mip(&self) -> bool {
        false
    }

    fn supports_interruption(&self) -> bool {
        true
    }
}
