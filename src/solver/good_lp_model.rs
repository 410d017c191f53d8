// good_lp model construction shared by the simplex and branch-and-bound adapters
// Translates a compacted problem into columns, objective and bounded rows

use crate::domain::translation::row_bounds;
use crate::domain::{
    LinearExpression, ObjectiveDirection, Problem, Result, SolverError, SolverResult, VariableType,
};
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution as _, Solver,
    SolverModel, Variable,
};
use std::time::Instant;

/// A built good_lp model together with the column of every local variable
pub(crate) struct LpModel<M> {
    pub model: M,
    columns: Vec<Variable>,
    rounded: Vec<bool>,
}

/// Build a model for `problem` on `solver`
///
/// Continuous and integer columns are free, boolean columns are bounded to [0, 1].
/// Integer and boolean columns are only marked integer when `integral` is set.
pub(crate) fn build<S: Solver>(
    problem: &Problem,
    integral: bool,
    solver: S,
) -> Result<LpModel<S::Model>> {
    let mut vars = ProblemVariables::new();
    let mut columns = Vec::with_capacity(problem.variable_count);
    let mut rounded = Vec::with_capacity(problem.variable_count);

    for &ty in problem.variable_types.iter() {
        let mut definition = variable();
        if ty == VariableType::Boolean {
            definition = definition.min(0.0).max(1.0);
        }
        let branch = integral && ty.is_integral();
        if branch {
            definition = definition.integer();
        }
        columns.push(vars.add(definition));
        rounded.push(branch);
    }

    let objective = match &problem.objective {
        Some(objective) => linear(objective, &columns, || "the objective".to_string())?,
        None => Expression::from(0.0),
    };
    let unsolved = match problem.direction {
        ObjectiveDirection::Minimize => vars.minimise(objective),
        ObjectiveDirection::Maximize => vars.maximise(objective),
    };

    let mut model = unsolved.using(solver);
    for (position, c) in problem.constraints.iter().enumerate() {
        let bounds = row_bounds(position, c, &problem.variable_types)?;
        let row = linear(&c.expression, &columns, || format!("constraint {}", position))?;

        if bounds.is_fixed() {
            model = model.with(constraint::eq(row, bounds.lower));
            continue;
        }
        if bounds.has_lower() {
            model = model.with(constraint::geq(row.clone(), bounds.lower));
        }
        if bounds.has_upper() {
            model = model.with(constraint::leq(row, bounds.upper));
        }
    }

    Ok(LpModel {
        model,
        columns,
        rounded,
    })
}

/// Solve a built model and read back one value per column
pub(crate) fn solve<M>(lp: LpModel<M>, backend: &str, started: Instant) -> Result<SolverResult>
where
    M: SolverModel<Error = ResolutionError>,
{
    let LpModel {
        model,
        columns,
        rounded,
    } = lp;

    match model.solve() {
        Ok(solution) => {
            let values = columns
                .iter()
                .zip(&rounded)
                .map(|(&column, &round)| {
                    let value = solution.value(column);
                    if round {
                        value.round() + 0.0
                    } else {
                        value
                    }
                })
                .collect();
            Ok(SolverResult::dense(values, started.elapsed()))
        }
        Err(ResolutionError::Infeasible) => Err(SolverError::Infeasible {
            backend: backend.to_string(),
            reason: "no solution satisfies all constraints".to_string(),
        }),
        Err(ResolutionError::Unbounded) => Err(SolverError::Infeasible {
            backend: backend.to_string(),
            reason: "objective can be improved infinitely".to_string(),
        }),
        Err(e) => Err(SolverError::ExecutionFailed {
            backend: backend.to_string(),
            message: e.to_string(),
        }),
    }
}

fn linear(
    expression: &LinearExpression,
    columns: &[Variable],
    location: impl Fn() -> String,
) -> Result<Expression> {
    let mut sum = Expression::from(0.0);
    for term in &expression.terms {
        let column =
            columns
                .get(term.variable)
                .copied()
                .ok_or_else(|| SolverError::VariableOutOfRange {
                    variable: term.variable,
                    variable_count: columns.len(),
                    location: location(),
                })?;
        sum += term.coefficient * column;
    }
    Ok(sum)
}
