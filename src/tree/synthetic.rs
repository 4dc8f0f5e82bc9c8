//! Seeded synthetic solver trees.
//!
//! Used by `stx generate` and by tests that need trees without a solver. The
//! same options always produce the same [`Core`].

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::node::{Core, FromServerNode, NodeId, ROOT_ID};

/// Generation stops adding children once the tree holds this many nodes.
pub const MAX_NODES: usize = 100_000;

/// Shape of a generated tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Maximum depth below the root.
    pub depth: u32,
    /// Maximum children per node. The root always gets at least one.
    pub branching: u32,
    pub seed: u64,
    /// Whether to mark one leaf as the solution.
    pub solvable: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            depth: 4,
            branching: 3,
            seed: 0,
            solvable: true,
        }
    }
}

/// Generate a tree. Node ids follow breadth-first creation order, so the root
/// is `0` and every parent id is smaller than its children's. Large shapes are
/// truncated at [`MAX_NODES`].
#[must_use]
pub fn generate(options: &GeneratorOptions) -> Core {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut parents: Vec<Option<NodeId>> = vec![None];
    let mut depths: Vec<u32> = vec![0];
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    let mut cursor = 0usize;
    while cursor < parents.len() {
        let id = cursor as NodeId;
        let depth = depths[cursor];
        cursor += 1;
        if depth >= options.depth || options.branching == 0 {
            continue;
        }
        let lower = u32::from(id == ROOT_ID);
        let count = rng.random_range(lower..=options.branching);
        for _ in 0..count {
            if parents.len() >= MAX_NODES {
                break;
            }
            let child = parents.len() as NodeId;
            parents.push(Some(id));
            depths.push(depth + 1);
            children.entry(id).or_default().push(child);
        }
    }

    let leaves: Vec<NodeId> = (0..parents.len() as NodeId)
        .filter(|id| !children.contains_key(id))
        .collect();
    let solution = if options.solvable && !leaves.is_empty() {
        Some(leaves[rng.random_range(0..leaves.len())])
    } else {
        None
    };

    let mut sol_ancestor_ids = Vec::new();
    let mut walk = solution;
    while let Some(id) = walk {
        sol_ancestor_ids.push(id);
        walk = parents[id as usize];
    }
    sol_ancestor_ids.reverse();

    // Children always carry larger ids, so one reverse sweep sums subtrees.
    let mut desc_counts = vec![0u64; parents.len()];
    for id in (1..parents.len()).rev() {
        if let Some(parent) = parents[id] {
            desc_counts[parent as usize] += desc_counts[id] + 1;
        }
    }

    let values: Vec<u32> = (0..parents.len()).map(|_| rng.random_range(0..10)).collect();
    let nodes = parents
        .iter()
        .enumerate()
        .map(|(pos, parent_id)| {
            let id = pos as NodeId;
            let kids = children.get(&id).map_or(0, Vec::len);
            let is_left_child = parent_id
                .and_then(|p| children.get(&p))
                .and_then(|siblings| siblings.first())
                .is_some_and(|first| *first == id);
            let relation = if is_left_child { "=" } else { "!=" };
            FromServerNode {
                id,
                parent_id: *parent_id,
                label: format!("n{id}"),
                pretty_label: format!("x{} {relation} {}", depths[pos], values[pos]),
                child_count: u32::try_from(kids).unwrap_or(u32::MAX),
                is_solution: solution == Some(id),
                is_left_child,
                desc_count: desc_counts[pos],
            }
        })
        .collect();

    Core {
        nodes,
        sol_ancestor_ids,
        id: format!(
            "synthetic-d{}-b{}-s{}",
            options.depth, options.branching, options.seed
        ),
    }
}
