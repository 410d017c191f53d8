// Solver adapters module

pub mod black_box_solver;
pub mod branch_and_bound_solver;
pub mod factory;
mod good_lp_model;
#[cfg(feature = "highs")]
pub mod highs_solver;
pub mod simplex_solver;

pub use black_box_solver::{BlackBoxSolver, SamplingSettings};
pub use branch_and_bound_solver::BranchAndBoundSolver;
pub use factory::SolverFactory;
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;
pub use simplex_solver::SimplexSolver;
