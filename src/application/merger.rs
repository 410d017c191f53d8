// Result merger
// Reassembles per-partition results into one result over global variable indices

use std::collections::HashSet;
use std::time::Duration;

use super::compactor::VariableMap;
use crate::domain::{Result, SolverError, SolverResult};

/// Translate a backend result from the local index space of `map` to global indices
pub fn to_global(map: &VariableMap, local: SolverResult) -> Result<SolverResult> {
    if local.indices.len() != local.values.len() {
        return Err(malformed(format!(
            "{} indices but {} values",
            local.indices.len(),
            local.values.len()
        )));
    }

    let indices = local
        .indices
        .iter()
        .map(|&i| {
            map.to_global(i).ok_or_else(|| {
                malformed(format!(
                    "local variable {} outside of the {} mapped variables",
                    i,
                    map.len()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SolverResult::new(indices, local.values, local.solving_time))
}

/// Concatenate partition results in the given order
///
/// Solving time is the sum of the partition solving times. A variable reported by
/// more than one partition means the partitions overlapped and is rejected.
pub fn merge<I>(parts: I) -> Result<SolverResult>
where
    I: IntoIterator<Item = (VariableMap, SolverResult)>,
{
    let mut seen = HashSet::new();
    let mut merged = SolverResult::new(Vec::new(), Vec::new(), Duration::ZERO);

    for (map, local) in parts {
        let part = to_global(&map, local)?;
        for &variable in &part.indices {
            if !seen.insert(variable) {
                return Err(malformed(format!(
                    "variable {} solved by more than one partition",
                    variable
                )));
            }
        }
        merged.indices.extend(part.indices);
        merged.values.extend(part.values);
        merged.solving_time += part.solving_time;
    }

    Ok(merged)
}

fn malformed(message: String) -> SolverError {
    SolverError::ExecutionFailed {
        backend: "result merger".to_string(),
        message,
    }
}
