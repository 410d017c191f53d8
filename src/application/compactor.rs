// Variable compactor
// Re-indexes a (sub-)problem so that backends only see the variables it uses

use std::collections::HashMap;

use crate::domain::{Problem, Result, SolverError};

/// Bijection between the global variable indices of a problem and a dense local range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMap {
    local_to_global: Vec<usize>,
    global_to_local: HashMap<usize, usize>,
}

impl VariableMap {
    fn intern(&mut self, global: usize) -> usize {
        *self.global_to_local.entry(global).or_insert_with(|| {
            self.local_to_global.push(global);
            self.local_to_global.len() - 1
        })
    }

    pub fn len(&self) -> usize {
        self.local_to_global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_to_global.is_empty()
    }

    pub fn to_global(&self, local: usize) -> Option<usize> {
        self.local_to_global.get(local).copied()
    }

    pub fn to_local(&self, global: usize) -> Option<usize> {
        self.global_to_local.get(&global).copied()
    }

    /// Global index of every local variable, in local order
    pub fn globals(&self) -> &[usize] {
        &self.local_to_global
    }
}

/// Compact `problem` in place
///
/// Local indices are handed out in first-seen order: objective terms first, then
/// constraint terms in list order. Every term is rewritten to its local index and
/// the type table and variable count are replaced by their local counterparts.
/// The returned map is the only way back to global indices.
pub fn compact(problem: &mut Problem) -> Result<VariableMap> {
    let mut map = VariableMap::default();

    let objective = problem.objective.iter_mut().flat_map(|o| o.terms.iter_mut());
    let rows = problem
        .constraints
        .iter_mut()
        .flat_map(|c| c.expression.terms.iter_mut());
    for term in objective.chain(rows) {
        term.variable = map.intern(term.variable);
    }

    let local_types = map
        .globals()
        .iter()
        .map(|&global| {
            problem
                .variable_type(global)
                .ok_or_else(|| SolverError::VariableOutOfRange {
                    variable: global,
                    variable_count: problem.variable_count,
                    location: "the compacted problem".to_string(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    problem.variable_count = local_types.len();
    problem.variable_types = local_types.into();

    Ok(map)
}
