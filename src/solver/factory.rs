use crate::domain::{BackendKind, Result, SolverBackend, SolvingMode};
use crate::solver::{BlackBoxSolver, BranchAndBoundSolver, SimplexSolver};
use std::sync::Arc;

/// Factory for creating solver backends from configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the backend for a resolved solving mode
    ///
    /// `Auto` behaves like `Basic`; `Custom` defers to `custom`.
    pub fn create_for_mode(
        mode: SolvingMode,
        custom: BackendKind,
    ) -> Result<Arc<dyn SolverBackend>> {
        match mode {
            SolvingMode::Auto | SolvingMode::Basic => Self::create_from_backend(BackendKind::Simplex),
            SolvingMode::Mip => Self::create_from_backend(BackendKind::BranchAndBound),
            SolvingMode::Custom => Self::create_from_backend(custom),
        }
    }

    /// Create a specific backend
    pub fn create_from_backend(backend: BackendKind) -> Result<Arc<dyn SolverBackend>> {
        match backend {
            BackendKind::Simplex => Ok(Arc::new(SimplexSolver::new())),
            BackendKind::BranchAndBound => Ok(Arc::new(BranchAndBoundSolver::new())),
            BackendKind::BlackBox => Ok(Arc::new(BlackBoxSolver::new())),
            #[cfg(feature = "highs")]
            BackendKind::Highs => Ok(Arc::new(crate::solver::HighsSolver::new())),
            #[cfg(not(feature = "highs"))]
            BackendKind::Highs => Err(crate::domain::SolverError::SolverNotAvailable(
                "HiGHS support is not compiled in, enable the `highs` feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_map_to_backends() {
        let name = |mode, custom| {
            SolverFactory::create_for_mode(mode, custom)
                .map(|b| b.name().to_string())
                .unwrap()
        };
        assert_eq!(name(SolvingMode::Basic, BackendKind::BlackBox), "Simplex");
        assert_eq!(name(SolvingMode::Mip, BackendKind::BlackBox), "Branch-and-Bound");
        assert_eq!(name(SolvingMode::Custom, BackendKind::BlackBox), "Black-Box");
        assert_eq!(name(SolvingMode::Custom, BackendKind::Simplex), "Simplex");
    }

    #[cfg(not(feature = "highs"))]
    #[test]
    fn highs_without_the_feature_is_unavailable() {
        use crate::domain::SolverError;

        let err = SolverFactory::create_from_backend(BackendKind::Highs).err();
        assert!(matches!(err, Some(SolverError::SolverNotAvailable(_))));
    }
}
