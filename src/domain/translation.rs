// Backend-neutral translation of constraint comparators into row bounds

use super::models::{Constraint, LinearExpression};
use super::solver_service::{Result, SolverError};
use super::value_objects::{Comparator, ConstraintClass, VariableType};

/// Closed interval `lower <= row <= upper`; infinite ends are unbounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBounds {
    pub lower: f64,
    pub upper: f64,
}

impl RowBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn fixed(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    pub fn has_lower(&self) -> bool {
        self.lower.is_finite()
    }

    pub fn has_upper(&self) -> bool {
        self.upper.is_finite()
    }

    /// Distance of `row` outside the interval, 0 when inside
    pub fn violation(&self, row: f64) -> f64 {
        if row < self.lower {
            self.lower - row
        } else if row > self.upper {
            row - self.upper
        } else {
            0.0
        }
    }
}

/// Classify a row by the domains of its variables; `None` for a row without terms
pub fn classify(expression: &LinearExpression, types: &[VariableType]) -> Option<ConstraintClass> {
    let mut class = None;
    for variable in expression.variables() {
        let term_class = match types.get(variable).copied() {
            Some(VariableType::Boolean) => ConstraintClass::Boolean,
            Some(VariableType::Integer) => ConstraintClass::Integer,
            _ => ConstraintClass::Continuous,
        };
        match class {
            None => class = Some(term_class),
            Some(current) if current != term_class => return Some(ConstraintClass::Mixed),
            Some(_) => {}
        }
    }
    class
}

/// Translate constraint `position` into bounds on its row of terms
///
/// The expression constant is moved to the right-hand side. `!=` is only
/// meaningful on boolean rows and becomes a fixed row at `1 - value`; `<` and
/// `>` are only meaningful on integer rows and tighten by one.
pub fn row_bounds(
    position: usize,
    constraint: &Constraint,
    types: &[VariableType],
) -> Result<RowBounds> {
    let class = classify(&constraint.expression, types).ok_or(SolverError::EmptyConstraint {
        constraint: position,
    })?;
    let value = constraint.value();

    let bounds = match (constraint.comparator, class) {
        (Comparator::Eq, _) => RowBounds::fixed(value),
        (Comparator::Ge, _) => RowBounds::new(value, f64::INFINITY),
        (Comparator::Le, ConstraintClass::Boolean) => {
            RowBounds::new(least_boolean_row(&constraint.expression), value)
        }
        (Comparator::Le, _) => RowBounds::new(f64::NEG_INFINITY, value),
        (Comparator::Ne, ConstraintClass::Boolean) => RowBounds::fixed(1.0 - value),
        (Comparator::Lt, ConstraintClass::Integer) => {
            RowBounds::new(f64::NEG_INFINITY, value - 1.0)
        }
        (Comparator::Gt, ConstraintClass::Integer) => RowBounds::new(value + 1.0, f64::INFINITY),
        (comparator, class) => {
            return Err(SolverError::UnsupportedComparator {
                constraint: position,
                comparator,
                class,
            })
        }
    };

    Ok(bounds)
}

// Smallest value a row over {0, 1} variables can take.
fn least_boolean_row(expression: &LinearExpression) -> f64 {
    expression
        .terms
        .iter()
        .map(|t| t.coefficient.min(0.0))
        .sum()
}
