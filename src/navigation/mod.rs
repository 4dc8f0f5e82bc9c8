//! Selection movement and solution-path queries over a [`TreeIndex`](crate::tree::TreeIndex).

pub mod engine;
pub mod solution;

pub use solution::{BranchKind, SolutionSummary};
