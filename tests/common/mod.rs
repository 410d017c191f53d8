#![allow(dead_code)]

use splitopt::{
    BackendConfig, CancellationToken, Comparator, Constraint, LinearExpression, Problem,
    SolverBackend, SolverError, SolverResult, VariableType,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded backend invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub variables: usize,
    pub constraints: usize,
    pub config: BackendConfig,
}

/// Backend that answers every single-term row `c * x (op) v` with `x = v / c`
/// and remembers what it was asked to solve
#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Mutex<Vec<Call>>,
    /// Cancel this token when the given call starts
    pub cancel_on_call: Option<(usize, CancellationToken)>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.variables).collect()
    }
}

impl SolverBackend for RecordingBackend {
    fn solve(
        &self,
        problem: &Problem,
        config: &BackendConfig,
        cancel: &CancellationToken,
    ) -> Result<SolverResult, SolverError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                variables: problem.variable_count,
                constraints: problem.num_constraints(),
                config: config.clone(),
            });
            calls.len() - 1
        };
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }
        cancel.check()?;

        let mut values = vec![0.0; problem.variable_count];
        for c in &problem.constraints {
            if let [term] = c.expression.terms.as_slice() {
                values[term.variable] = c.value() / term.coefficient;
            }
        }
        Ok(SolverResult::dense(values, Duration::from_millis(2)))
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

pub fn single(variable: usize, comparator: Comparator, rhs: f64) -> Constraint {
    Constraint::new(LinearExpression::new().term(variable, 1.0), comparator, rhs)
}

/// `x_v >= v` for every v in 1..=count, variable 0 unused
pub fn independent(count: usize) -> Problem {
    (1..=count).fold(
        Problem::minimize(vec![VariableType::Continuous; count + 1]),
        |p, v| p.add_constraint(single(v, Comparator::Ge, v as f64)),
    )
}

/// In-memory writer for capturing formatted log output
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
