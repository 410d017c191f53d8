// Domain value objects representing core business concepts

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::level_filters::LevelFilter;

/// Domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Integer number (x ∈ ℤ)
    Integer,
    /// Boolean variable (x ∈ {0, 1})
    Boolean,
}

impl VariableType {
    /// Integer and boolean variables take part in integer branching
    pub fn is_integral(self) -> bool {
        matches!(self, VariableType::Integer | VariableType::Boolean)
    }
}

/// Comparison between a linear expression and its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    /// Equal (=)
    Eq,
    /// Not equal (≠), boolean rows only
    Ne,
    /// Strictly less than (<), integer rows only
    Lt,
    /// Less than or equal (≤)
    Le,
    /// Greater than or equal (≥)
    Ge,
    /// Strictly greater than (>), integer rows only
    Gt,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Eq => write!(f, "="),
            Comparator::Ne => write!(f, "!="),
            Comparator::Lt => write!(f, "<"),
            Comparator::Le => write!(f, "<="),
            Comparator::Ge => write!(f, ">="),
            Comparator::Gt => write!(f, ">"),
        }
    }
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveDirection {
    /// Minimize the objective function
    #[default]
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Classification of a constraint row by the domains of the variables it references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintClass {
    /// Only boolean variables
    Boolean,
    /// Only integer variables
    Integer,
    /// Only continuous variables
    Continuous,
    /// Variables of more than one domain
    Mixed,
}

impl fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintClass::Boolean => write!(f, "boolean"),
            ConstraintClass::Integer => write!(f, "integer"),
            ConstraintClass::Continuous => write!(f, "continuous"),
            ConstraintClass::Mixed => write!(f, "mixed"),
        }
    }
}

/// How a problem is to be solved
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolvingMode {
    /// Pick `Basic` or `Mip` from the referenced variable domains
    #[default]
    Auto,
    /// Linear relaxation, no integer branching
    Basic,
    /// Mixed-integer programming
    Mip,
    /// Hand the problem to the configured custom backend
    Custom,
}

impl fmt::Display for SolvingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolvingMode::Auto => write!(f, "auto"),
            SolvingMode::Basic => write!(f, "basic"),
            SolvingMode::Mip => write!(f, "mip"),
            SolvingMode::Custom => write!(f, "custom"),
        }
    }
}

/// Solver backend to use
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// LP simplex via good_lp
    Simplex,
    /// MIP branch-and-bound via good_lp
    BranchAndBound,
    /// Derivative-free local sampling
    BlackBox,
    /// HiGHS (requires the `highs` feature)
    Highs,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Simplex => write!(f, "Simplex"),
            BackendKind::BranchAndBound => write!(f, "Branch-and-Bound"),
            BackendKind::BlackBox => write!(f, "Black-Box"),
            BackendKind::Highs => write!(f, "HiGHS"),
        }
    }
}

/// Log verbosity forwarded to the orchestrator and the backends
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            Verbosity::Off => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}
