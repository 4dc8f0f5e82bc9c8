//! Id → node index for one solver tree, plus the aggregates derived from it.
//!
//! The index is built once per tree identifier. Everything structural (child
//! lists, traversal order, the solution path, aggregates) is computed up front
//! and shared behind an `Arc`; the only mutable state afterwards is each node's
//! `collapsed` flag.
//!
//! **Copy-on-write:** nodes are held as `Arc<Node>`. Cloning an index is a
//! pointer copy per node, and collapsing or expanding clones at most the one
//! node being toggled (only when a snapshot still shares it). Every effective
//! toggle bumps [`TreeIndex::revision`], so consumers detect change by
//! comparing revisions instead of diffing maps.
//!
//! **Sibling order:** the child flagged `isLeftChild` comes first, remaining
//! siblings follow by ascending id. Traversal order is the depth-first
//! pre-order induced by that sibling order.

#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::node::{Core, Node, NodeId, ROOT_ID};
use crate::core::errors::{Result, StxError};

/// `minsize` used when every node carries the same weight.
pub const DEFAULT_MINSIZE_FLOOR: f64 = 1.0;

/// Violated structural invariant of a solver tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("no root: exactly one node must have no parent")]
    MissingRoot,
    #[error("multiple parentless nodes: {ids:?}")]
    MultipleRoots { ids: Vec<NodeId> },
    #[error("root must have id 0, found {id}")]
    RootNotZero { id: NodeId },
    #[error("duplicate node id {id}")]
    DuplicateId { id: NodeId },
    #[error("node {id} references missing parent {parent_id}")]
    DanglingParent { id: NodeId, parent_id: NodeId },
    #[error("node {id} is not reachable from the root (parent cycle)")]
    Unreachable { id: NodeId },
    #[error("solution path references missing node {id}")]
    UnknownAncestor { id: NodeId },
}

/// Knobs for index construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    /// `minsize` when all `descCount` values are equal.
    pub minsize_floor: f64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            minsize_floor: DEFAULT_MINSIZE_FLOOR,
        }
    }
}

/// Linear-scale domain over node weights (`descCount`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleDomain {
    pub min: u64,
    pub max: u64,
}

impl ScaleDomain {
    /// Map a weight onto `[0, 1]`. A degenerate domain maps everything to 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn normalize(&self, weight: u64) -> f64 {
        if self.max <= self.min {
            return 1.0;
        }
        let clamped = weight.clamp(self.min, self.max);
        (clamped - self.min) as f64 / (self.max - self.min) as f64
    }

    /// Map a weight linearly onto `[lo, hi]`.
    #[must_use]
    pub fn scale(&self, weight: u64, lo: f64, hi: f64) -> f64 {
        (hi - lo).mul_add(self.normalize(weight), lo)
    }
}

/// Read-only aggregates computed at construction time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub minsize: f64,
    pub scale: ScaleDomain,
    pub solveable: bool,
    pub total_node_count: usize,
    /// Ids flagged `isSolution`, in traversal order.
    pub sol_node_ids: Vec<NodeId>,
}

#[derive(Debug)]
struct Structure {
    children: HashMap<NodeId, Vec<NodeId>>,
    traversal: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
    sol_ancestor_ids: Vec<NodeId>,
    sol_path: HashSet<NodeId>,
    stats: TreeStats,
}

/// Index of one solver tree instance.
#[derive(Debug, Clone)]
pub struct TreeIndex {
    tree_id: String,
    nodes: HashMap<NodeId, Arc<Node>>,
    structure: Arc<Structure>,
    revision: u64,
}

impl TreeIndex {
    /// Build the index from a solver core.
    ///
    /// Fails with [`StxError::Structural`] naming the first violated invariant;
    /// no partially built index ever escapes.
    pub fn build(core: Core, options: &IndexOptions) -> Result<Self> {
        let Core {
            nodes: raw_nodes,
            sol_ancestor_ids,
            id: tree_id,
        } = core;

        match assemble(raw_nodes, sol_ancestor_ids, options) {
            Ok((nodes, structure)) => Ok(Self {
                tree_id,
                nodes,
                structure: Arc::new(structure),
                revision: 0,
            }),
            Err(source) => Err(StxError::structural(tree_id, source)),
        }
    }

    /// Identifier of the tree this index was built from.
    #[must_use]
    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(AsRef::as_ref)
    }

    /// Shared handle to a node, for consumers that keep snapshots.
    #[must_use]
    pub fn node_handle(&self, id: NodeId) -> Option<Arc<Node>> {
        self.nodes.get(&id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a built index; the root is mandatory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent_id)
    }

    /// Delivered children in sibling order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.structure
            .children
            .get(&id)
            .map_or(&[], Vec::as_slice)
    }

    /// Children reachable by navigation: none while the node is collapsed.
    #[must_use]
    pub fn visible_children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) if !node.collapsed => self.children(id),
            _ => &[],
        }
    }

    /// Full-tree pre-order, ignoring collapsed flags.
    #[must_use]
    pub fn traversal(&self) -> &[NodeId] {
        &self.structure.traversal
    }

    /// Position of `id` in [`traversal`](Self::traversal).
    #[must_use]
    pub fn traversal_position(&self, id: NodeId) -> Option<usize> {
        self.structure.positions.get(&id).copied()
    }

    /// Nodes in traversal order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.structure
            .traversal
            .iter()
            .filter_map(|id| self.get(*id))
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |current| self.parent(*current))
    }

    /// Whether no strict ancestor of `id` is collapsed.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.contains(id)
            && self
                .ancestors(id)
                .all(|ancestor| self.get(ancestor).is_some_and(|node| !node.collapsed))
    }

    /// Solver-supplied root-to-solution path.
    #[must_use]
    pub fn sol_ancestor_ids(&self) -> &[NodeId] {
        &self.structure.sol_ancestor_ids
    }

    /// Whether `id` lies on the solution path.
    #[must_use]
    pub fn is_on_solution_path(&self, id: NodeId) -> bool {
        self.structure.sol_path.contains(&id)
    }

    /// Final node of the solution path, if the tree is solvable.
    #[must_use]
    pub fn solution_leaf(&self) -> Option<NodeId> {
        self.structure.sol_ancestor_ids.last().copied()
    }

    #[must_use]
    pub fn stats(&self) -> &TreeStats {
        &self.structure.stats
    }

    /// Weight domain for normalising `descCount` values.
    #[must_use]
    pub fn scale(&self) -> ScaleDomain {
        self.structure.stats.scale
    }

    /// Counter bumped by every effective collapse/expand.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Collapse `id`. Returns `true` when the flag changed.
    pub fn collapse(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.nodes.get_mut(&id) else {
            return false;
        };
        if slot.is_leaf() || slot.collapsed {
            return false;
        }
        let changed = Arc::make_mut(slot).collapse();
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Expand `id`. Returns `true` when the flag changed.
    pub fn expand(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.nodes.get_mut(&id) else {
            return false;
        };
        if !slot.collapsed {
            return false;
        }
        let changed = Arc::make_mut(slot).expand();
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Expand every collapsed strict ancestor of `id` so it becomes visible.
    pub fn reveal(&mut self, id: NodeId) -> bool {
        let hidden_by: Vec<NodeId> = self
            .ancestors(id)
            .filter(|ancestor| self.get(*ancestor).is_some_and(|node| node.collapsed))
            .collect();
        let mut changed = false;
        for ancestor in hidden_by {
            changed |= self.expand(ancestor);
        }
        changed
    }
}

type Assembled = (HashMap<NodeId, Arc<Node>>, Structure);

fn assemble(
    raw_nodes: Vec<super::node::FromServerNode>,
    sol_ancestor_ids: Vec<NodeId>,
    options: &IndexOptions,
) -> std::result::Result<Assembled, StructuralError> {
    if raw_nodes.is_empty() {
        return Err(StructuralError::MissingRoot);
    }

    // Input order drives every error report so failures are deterministic.
    let order: Vec<NodeId> = raw_nodes.iter().map(|n| n.id).collect();
    let mut nodes: HashMap<NodeId, Arc<Node>> = HashMap::with_capacity(raw_nodes.len());
    for raw in raw_nodes {
        let id = raw.id;
        if nodes.insert(id, Arc::new(Node::from(raw))).is_some() {
            return Err(StructuralError::DuplicateId { id });
        }
    }

    let roots: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|id| nodes[id].parent_id.is_none())
        .collect();
    match roots.as_slice() {
        [] => return Err(StructuralError::MissingRoot),
        [ROOT_ID] => {}
        [other] => return Err(StructuralError::RootNotZero { id: *other }),
        _ => return Err(StructuralError::MultipleRoots { ids: roots }),
    }

    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for id in &order {
        if let Some(parent_id) = nodes[id].parent_id {
            if !nodes.contains_key(&parent_id) {
                return Err(StructuralError::DanglingParent {
                    id: *id,
                    parent_id,
                });
            }
            children.entry(parent_id).or_default().push(*id);
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|id| (!nodes[id].is_left_child, *id));
    }

    let traversal = preorder(&children);
    if traversal.len() != nodes.len() {
        let seen: HashSet<NodeId> = traversal.iter().copied().collect();
        let id = order
            .iter()
            .copied()
            .find(|id| !seen.contains(id))
            .unwrap_or(ROOT_ID);
        return Err(StructuralError::Unreachable { id });
    }
    let positions: HashMap<NodeId, usize> = traversal
        .iter()
        .enumerate()
        .map(|(pos, id)| (*id, pos))
        .collect();

    if let Some(id) = sol_ancestor_ids
        .iter()
        .copied()
        .find(|id| !nodes.contains_key(id))
    {
        return Err(StructuralError::UnknownAncestor { id });
    }

    let stats = compute_stats(&nodes, &traversal, &sol_ancestor_ids, options);
    let sol_path = sol_ancestor_ids.iter().copied().collect();
    Ok((
        nodes,
        Structure {
            children,
            traversal,
            positions,
            sol_ancestor_ids,
            sol_path,
            stats,
        },
    ))
}

/// Depth-first pre-order from the root over the sorted child lists.
fn preorder(children: &HashMap<NodeId, Vec<NodeId>>) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![ROOT_ID];
    while let Some(id) = stack.pop() {
        out.push(id);
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().rev().copied());
        }
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn compute_stats(
    nodes: &HashMap<NodeId, Arc<Node>>,
    traversal: &[NodeId],
    sol_ancestor_ids: &[NodeId],
    options: &IndexOptions,
) -> TreeStats {
    let weights = nodes.values().map(|node| node.desc_count);
    let min = weights.clone().min().unwrap_or(0);
    let max = weights.max().unwrap_or(0);
    let minsize = if min == max {
        options.minsize_floor
    } else {
        min as f64
    };

    TreeStats {
        minsize,
        scale: ScaleDomain { min, max },
        solveable: !sol_ancestor_ids.is_empty(),
        total_node_count: nodes.len(),
        sol_node_ids: traversal
            .iter()
            .copied()
            .filter(|id| nodes[id].is_solution)
            .collect(),
    }
}
