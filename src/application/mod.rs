// Application layer
// Decomposition, re-indexing, dispatch and reassembly of a solve request

pub mod compactor;
pub mod merger;
pub mod orchestrator;
pub mod partitioner;

pub use compactor::{compact, VariableMap};
pub use merger::merge;
pub use orchestrator::{SolveOrchestrator, SolveStage};
pub use partitioner::{partition, Partition, Partitioning, UnionFind};
