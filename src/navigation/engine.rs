//! Movement algorithms: `(selection, index) → next selection`.
//!
//! Every function here is pure and total. When a command has no valid target,
//! or the selected id is not in the index, the selection comes back unchanged;
//! navigation never fails.
//!
//! Two orders are in play:
//! - **Visible order** (`step_forward`, `go_to_previous`): depth-first
//!   pre-order that does not descend into collapsed nodes or declared leaves.
//! - **Traversal order** (the jump commands): the full-tree pre-order recorded
//!   by [`TreeIndex::traversal`], regardless of collapsed flags.

use crate::navigation::solution::is_failed_leaf;
use crate::tree::index::TreeIndex;
use crate::tree::node::{NodeId, ROOT_ID};

/// Children that descend-first stepping enters: none for declared leaves and
/// collapsed nodes.
fn descendable(index: &TreeIndex, id: NodeId) -> &[NodeId] {
    match index.get(id) {
        Some(node) if !node.is_leaf() => index.visible_children(id),
        _ => &[],
    }
}

fn next_sibling(index: &TreeIndex, id: NodeId) -> Option<NodeId> {
    let parent = index.parent(id)?;
    let siblings = index.children(parent);
    let pos = siblings.iter().position(|sibling| *sibling == id)?;
    siblings.get(pos + 1).copied()
}

fn previous_sibling(index: &TreeIndex, id: NodeId) -> Option<NodeId> {
    let parent = index.parent(id)?;
    let siblings = index.children(parent);
    let pos = siblings.iter().position(|sibling| *sibling == id)?;
    pos.checked_sub(1).and_then(|prev| siblings.get(prev).copied())
}

/// First child in sibling order. No-op on leaves and collapsed nodes.
#[must_use]
pub fn go_left(index: &TreeIndex, selected: NodeId) -> NodeId {
    descendable(index, selected)
        .first()
        .copied()
        .unwrap_or(selected)
}

/// Next sibling. No-op at the last sibling and at the root.
#[must_use]
pub fn go_right(index: &TreeIndex, selected: NodeId) -> NodeId {
    next_sibling(index, selected).unwrap_or(selected)
}

/// Parent. No-op at the root.
#[must_use]
pub fn go_up(index: &TreeIndex, selected: NodeId) -> NodeId {
    index.parent(selected).unwrap_or(selected)
}

/// The root, unconditionally.
#[must_use]
pub fn go_to_root(_index: &TreeIndex, _selected: NodeId) -> NodeId {
    ROOT_ID
}

/// Descend-first stepping: [`go_left`] when it has a target, otherwise the
/// next sibling of the nearest ancestor-or-self that has one. No-op at the end
/// of the visible traversal.
#[must_use]
pub fn step_forward(index: &TreeIndex, selected: NodeId) -> NodeId {
    if !index.contains(selected) {
        return selected;
    }
    if let Some(first) = descendable(index, selected).first() {
        return *first;
    }
    let mut current = selected;
    loop {
        if let Some(next) = next_sibling(index, current) {
            return next;
        }
        match index.parent(current) {
            Some(parent) => current = parent,
            None => return selected,
        }
    }
}

/// Inverse of [`step_forward`]: the parent of a first child, otherwise the
/// deepest last visible descendant of the previous sibling. No-op at the root.
#[must_use]
pub fn go_to_previous(index: &TreeIndex, selected: NodeId) -> NodeId {
    let Some(parent) = index.parent(selected) else {
        return selected;
    };
    let Some(mut current) = previous_sibling(index, selected) else {
        return parent;
    };
    while let Some(last) = descendable(index, current).last() {
        current = *last;
    }
    current
}

fn next_in_traversal(
    index: &TreeIndex,
    selected: NodeId,
    mut candidates: impl Iterator<Item = NodeId>,
) -> NodeId {
    let Some(here) = index.traversal_position(selected) else {
        return selected;
    };
    candidates
        .find(|id| index.traversal_position(*id).is_some_and(|pos| pos > here))
        .unwrap_or(selected)
}

fn previous_in_traversal(
    index: &TreeIndex,
    selected: NodeId,
    candidates: impl Iterator<Item = NodeId>,
) -> NodeId {
    let Some(here) = index.traversal_position(selected) else {
        return selected;
    };
    candidates
        .filter(|id| index.traversal_position(*id).is_some_and(|pos| pos < here))
        .last()
        .unwrap_or(selected)
}

/// Next `isSolution` node in traversal order.
#[must_use]
pub fn next_sol(index: &TreeIndex, selected: NodeId) -> NodeId {
    let sols = index.stats().sol_node_ids.iter().copied();
    next_in_traversal(index, selected, sols)
}

/// Previous `isSolution` node in traversal order.
#[must_use]
pub fn prev_sol(index: &TreeIndex, selected: NodeId) -> NodeId {
    let sols = index.stats().sol_node_ids.iter().copied();
    previous_in_traversal(index, selected, sols)
}

/// Next node on the solver's root-to-solution path.
///
/// From an on-path node this is the following path entry; from an off-path
/// node it is the first path entry after it in traversal order.
#[must_use]
pub fn next_sol_branch(index: &TreeIndex, selected: NodeId) -> NodeId {
    let path = index.sol_ancestor_ids().iter().copied();
    next_in_traversal(index, selected, path)
}

/// Previous node on the solver's root-to-solution path.
#[must_use]
pub fn prev_sol_branch(index: &TreeIndex, selected: NodeId) -> NodeId {
    let path = index.sol_ancestor_ids().iter().copied();
    previous_in_traversal(index, selected, path)
}

fn failed_ids(index: &TreeIndex) -> impl Iterator<Item = NodeId> + '_ {
    index
        .iter()
        .filter(|node| is_failed_leaf(index, node))
        .map(|node| node.id)
}

/// Next failed leaf in traversal order.
#[must_use]
pub fn next_failed(index: &TreeIndex, selected: NodeId) -> NodeId {
    next_in_traversal(index, selected, failed_ids(index))
}

/// Previous failed leaf in traversal order.
#[must_use]
pub fn prev_failed(index: &TreeIndex, selected: NodeId) -> NodeId {
    previous_in_traversal(index, selected, failed_ids(index))
}
