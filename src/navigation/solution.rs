//! Solution path tracking and failed-branch classification.

use serde::Serialize;

use crate::tree::index::TreeIndex;
use crate::tree::node::{Node, NodeId};

/// How a node relates to the solver's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    /// Flagged `isSolution` by the solver.
    Solution,
    /// On the root-to-solution path but not itself a solution.
    SolutionPath,
    /// A leaf that is neither a solution nor on the solution path.
    Failed,
    /// An interior node off the solution path.
    Open,
}

/// Derived solution facts for one tree, recomputed whenever the index changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSummary {
    pub solveable: bool,
    pub sol_ancestor_ids: Vec<NodeId>,
    pub solution_leaf: Option<NodeId>,
    pub failed_branch_count: usize,
}

impl SolutionSummary {
    #[must_use]
    pub fn from_index(index: &TreeIndex) -> Self {
        Self {
            solveable: index.stats().solveable,
            sol_ancestor_ids: index.sol_ancestor_ids().to_vec(),
            solution_leaf: index.solution_leaf(),
            failed_branch_count: failed_branch_count(index),
        }
    }
}

/// `totalNodeCount - |solAncestorIds|` for solvable trees, otherwise every node.
#[must_use]
pub fn failed_branch_count(index: &TreeIndex) -> usize {
    let stats = index.stats();
    let on_path = if stats.solveable {
        index.sol_ancestor_ids().len()
    } else {
        0
    };
    stats.total_node_count.saturating_sub(on_path)
}

#[must_use]
pub fn is_on_solution_path(index: &TreeIndex, id: NodeId) -> bool {
    index.is_on_solution_path(id)
}

/// Leaf that is not a solution and not on the solution path.
#[must_use]
pub fn is_failed_leaf(index: &TreeIndex, node: &Node) -> bool {
    node.is_leaf() && !node.is_solution && !is_on_solution_path(index, node.id)
}

/// Failed leaves in traversal order.
#[must_use]
pub fn failed_leaves(index: &TreeIndex) -> Vec<NodeId> {
    index
        .iter()
        .filter(|node| is_failed_leaf(index, node))
        .map(|node| node.id)
        .collect()
}

/// Classify one node. `None` when the id is absent.
#[must_use]
pub fn classify(index: &TreeIndex, id: NodeId) -> Option<BranchKind> {
    let node = index.get(id)?;
    let kind = if node.is_solution {
        BranchKind::Solution
    } else if is_on_solution_path(index, id) {
        BranchKind::SolutionPath
    } else if node.is_leaf() {
        BranchKind::Failed
    } else {
        BranchKind::Open
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::index::IndexOptions;
    use crate::tree::node::{Core, FromServerNode};

    fn raw(id: NodeId, parent_id: Option<NodeId>, child_count: u32, sol: bool) -> FromServerNode {
        FromServerNode {
            id,
            parent_id,
            label: String::new(),
            pretty_label: String::new(),
            child_count,
            is_solution: sol,
            is_left_child: false,
            desc_count: u64::from(child_count),
        }
    }

    fn three_node(sol: Vec<NodeId>) -> TreeIndex {
        let core = Core {
            nodes: vec![
                raw(0, None, 2, false),
                raw(1, Some(0), 0, true),
                raw(2, Some(0), 0, false),
            ],
            sol_ancestor_ids: sol,
            id: "three".into(),
        };
        TreeIndex::build(core, &IndexOptions::default()).unwrap()
    }

    #[test]
    fn failed_branch_count_subtracts_solution_path() {
        let index = three_node(vec![0, 1]);
        assert_eq!(failed_branch_count(&index), 1);
        let summary = SolutionSummary::from_index(&index);
        assert!(summary.solveable);
        assert_eq!(summary.solution_leaf, Some(1));
        assert_eq!(summary.failed_branch_count, 1);
    }

    #[test]
    fn unsolvable_tree_counts_every_node() {
        let index = three_node(vec![]);
        assert_eq!(failed_branch_count(&index), 3);
        assert_eq!(SolutionSummary::from_index(&index).solution_leaf, None);
    }

    #[test]
    fn failed_leaves_exclude_solutions() {
        let index = three_node(vec![0, 1]);
        assert_eq!(failed_leaves(&index), vec![2]);
    }

    #[test]
    fn classification_covers_all_kinds() {
        let core = Core {
            nodes: vec![
                raw(0, None, 2, false),
                raw(1, Some(0), 1, false),
                raw(2, Some(0), 1, false),
                raw(3, Some(1), 0, true),
                raw(4, Some(2), 0, false),
            ],
            sol_ancestor_ids: vec![0, 1, 3],
            id: "kinds".into(),
        };
        let index = TreeIndex::build(core, &IndexOptions::default()).unwrap();
        assert_eq!(classify(&index, 0), Some(BranchKind::SolutionPath));
        assert_eq!(classify(&index, 1), Some(BranchKind::SolutionPath));
        assert_eq!(classify(&index, 3), Some(BranchKind::Solution));
        assert_eq!(classify(&index, 2), Some(BranchKind::Open));
        assert_eq!(classify(&index, 4), Some(BranchKind::Failed));
        assert_eq!(classify(&index, 99), None);
    }
}
