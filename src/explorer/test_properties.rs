//! Property-based tests for explorer invariants.
//!
//! Uses `proptest` to generate arbitrary well-formed solver trees and command
//! sequences, then checks the navigation and playback invariants that must hold
//! for every tree: a single root at id 0, reversible stepping, lossless
//! collapse/expand, exhaustive solution jumps and the failed-branch formula.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use super::commands::Command;
use super::model::{ExplorerCmd, ExplorerModel, ExplorerMsg, ExplorerSettings};
use super::update::update;
use crate::navigation::engine::{go_left, go_to_previous, next_sol, step_forward};
use crate::playback::controller::{Direction, PlaybackOutcome, PlaybackReport};
use crate::tree::index::{IndexOptions, TreeIndex};
use crate::tree::node::{Core, FromServerNode, NodeId, ROOT_ID};

// ──────────────────── strategies ────────────────────

/// Parent choices for nodes `1..n`; node `i` picks a parent below `i`, which
/// rules out cycles by construction.
fn arb_parents() -> impl Strategy<Value = Vec<NodeId>> {
    (1usize..40).prop_flat_map(|n| {
        (1..n)
            .map(|i| (0..i as NodeId).boxed())
            .collect::<Vec<_>>()
    })
}

fn arb_core() -> impl Strategy<Value = Core> {
    (arb_parents(), any::<bool>(), any::<u64>(), prop::collection::vec(any::<bool>(), 40))
        .prop_map(|(parents, solvable, pick, extra_solutions)| {
            build_core(&parents, solvable, pick, &extra_solutions)
        })
}

fn build_core(parents: &[NodeId], solvable: bool, pick: u64, extra_solutions: &[bool]) -> Core {
    let n = parents.len() + 1;
    let parent_of = |id: usize| -> Option<NodeId> { id.checked_sub(1).map(|p| parents[p]) };
    let mut child_counts = vec![0u32; n];
    for parent in parents {
        child_counts[*parent as usize] += 1;
    }
    let leaves: Vec<usize> = (0..n).filter(|id| child_counts[*id] == 0).collect();

    let mut path = Vec::new();
    if solvable {
        let mut walk = Some(leaves[(pick as usize) % leaves.len()] as NodeId);
        while let Some(id) = walk {
            path.push(id);
            walk = parent_of(id as usize);
        }
        path.reverse();
    }
    let solution_leaf = path.last().copied();

    let nodes = (0..n)
        .map(|id| FromServerNode {
            id: id as NodeId,
            parent_id: parent_of(id),
            label: format!("n{id}"),
            pretty_label: format!("n{id}"),
            child_count: child_counts[id],
            is_solution: solution_leaf == Some(id as NodeId)
                || (id > 0 && child_counts[id] == 0 && extra_solutions[id]),
            is_left_child: id % 2 == 1,
            desc_count: u64::from(child_counts[id]),
        })
        .collect();

    Core {
        nodes,
        sol_ancestor_ids: path,
        id: "prop".into(),
    }
}

fn arb_command() -> impl Strategy<Value = Command> {
    (0..Command::all().count()).prop_map(|pos| Command::all().nth(pos).unwrap_or(Command::GoUp))
}

fn index(core: Core) -> TreeIndex {
    TreeIndex::build(core, &IndexOptions::default()).unwrap()
}

/// Nodes reachable from the root by descend-first stepping.
fn reachable(index: &TreeIndex) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::from([ROOT_ID]);
    let mut current = ROOT_ID;
    loop {
        let next = step_forward(index, current);
        if next == current || !seen.insert(next) {
            return seen;
        }
        current = next;
    }
}

fn run_to_end(model: &mut ExplorerModel, direction: Direction) -> PlaybackReport {
    let mut cmd = update(model, ExplorerMsg::StartPlayback(direction));
    loop {
        match cmd {
            ExplorerCmd::SchedulePlaybackStep(_) => {
                cmd = update(model, ExplorerMsg::PlaybackStep);
            }
            ExplorerCmd::PlaybackFinished(report) => return report,
            other => panic!("unexpected command {other:?}"),
        }
    }
}

// ──────────────────── properties ────────────────────

proptest! {
    #[test]
    fn single_root_with_id_zero(core in arb_core()) {
        let index = index(core);
        let roots: Vec<NodeId> = index
            .iter()
            .filter(|node| node.parent_id.is_none())
            .map(|node| node.id)
            .collect();
        prop_assert_eq!(roots, vec![ROOT_ID]);
    }

    #[test]
    fn go_to_previous_inverts_go_left(core in arb_core()) {
        let index = index(core);
        for node in index.iter() {
            let child = go_left(&index, node.id);
            if child != node.id {
                prop_assert_eq!(go_to_previous(&index, child), node.id);
            }
        }
    }

    #[test]
    fn go_to_previous_inverts_step_forward(core in arb_core()) {
        let index = index(core);
        for node in index.iter() {
            let next = step_forward(&index, node.id);
            if next != node.id {
                prop_assert_eq!(go_to_previous(&index, next), node.id);
            }
        }
    }

    #[test]
    fn collapse_then_expand_restores_reachability(core in arb_core(), pick in any::<usize>()) {
        let mut index = index(core);
        let before = reachable(&index);
        let target = index.traversal()[pick % index.len()];
        index.collapse(target);
        index.expand(target);
        prop_assert_eq!(reachable(&index), before);
    }

    #[test]
    fn next_sol_visits_each_solution_once(core in arb_core()) {
        let index = index(core);
        let expected: Vec<NodeId> = index
            .stats()
            .sol_node_ids
            .iter()
            .copied()
            .filter(|id| *id != ROOT_ID)
            .collect();
        let mut visited = Vec::new();
        let mut current = ROOT_ID;
        loop {
            let next = next_sol(&index, current);
            if next == current {
                break;
            }
            visited.push(next);
            current = next;
        }
        let unique: HashSet<&NodeId> = visited.iter().collect();
        prop_assert_eq!(unique.len(), visited.len());
        prop_assert_eq!(visited, expected);
    }

    #[test]
    fn failed_branch_count_formula(core in arb_core()) {
        let path_len = core.sol_ancestor_ids.len();
        let model = ExplorerModel::new(core, ExplorerSettings::default()).unwrap();
        let snap = model.snapshot();
        let expected = if snap.solveable {
            snap.total_node_count - path_len
        } else {
            snap.total_node_count
        };
        prop_assert_eq!(snap.failed_branch_count, expected);
    }

    #[test]
    fn commands_keep_selection_valid(
        core in arb_core(),
        commands in prop::collection::vec(arb_command(), 0..60),
    ) {
        let mut model = ExplorerModel::new(core, ExplorerSettings::default()).unwrap();
        let mut last_revision = model.index.revision();
        for command in commands {
            update(&mut model, ExplorerMsg::Command(command));
            prop_assert!(model.index.contains(model.selected));
            prop_assert!(model.index.is_visible(model.selected));
            let revision = model.index.revision();
            prop_assert!(revision >= last_revision);
            last_revision = revision;
        }
    }

    #[test]
    fn forward_then_reverse_returns_to_root(core in arb_core()) {
        let mut model = ExplorerModel::new(core, ExplorerSettings::default()).unwrap();
        let forward = run_to_end(&mut model, Direction::Forward);
        if model.summary.solveable {
            prop_assert_eq!(forward.outcome, PlaybackOutcome::Completed);
            prop_assert_eq!(Some(model.selected), model.summary.solution_leaf);
        } else {
            prop_assert_ne!(forward.outcome, PlaybackOutcome::Cancelled);
        }
        let reverse = run_to_end(&mut model, Direction::Reverse);
        prop_assert_eq!(reverse.outcome, PlaybackOutcome::Completed);
        prop_assert_eq!(model.selected, ROOT_ID);
        prop_assert_eq!(reverse.steps, forward.steps);
    }
}
