//! Closed command set and its static registry.
//!
//! Every command the key-binding collaborator or the stats bar can issue is a
//! [`Command`] variant. [`COMMANDS`] maps each one to its stable name, default
//! key bindings and a transition function over `(index, selection)`. Names are
//! resolved once, where they enter the system; dispatch itself is an indexed
//! lookup that cannot fail.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::errors::{Result, StxError};
use crate::navigation::engine;
use crate::tree::index::TreeIndex;
use crate::tree::node::NodeId;

/// Transition applied by a command: may toggle collapse flags, returns the
/// next selection.
pub type Transition = fn(&mut TreeIndex, NodeId) -> NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    GoLeft,
    GoRight,
    GoUp,
    GoToRoot,
    GoToPrevious,
    Collapse,
    Expand,
    NextSol,
    PrevSol,
    NextSolBranch,
    PrevSolBranch,
    NextFailed,
    PrevFailed,
}

/// Registry entry for one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub command: Command,
    /// Stable name used by key maps, the CLI and logs.
    pub name: &'static str,
    /// Default key bindings; empty for stats-bar-only commands.
    pub keys: &'static [&'static str],
    pub description: &'static str,
    pub transition: Transition,
}

fn go_left(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    engine::go_left(index, selected)
}

fn go_right(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    engine::go_right(index, selected)
}

fn go_up(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    engine::go_up(index, selected)
}

fn go_to_root(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    engine::go_to_root(index, selected)
}

fn go_to_previous(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    engine::go_to_previous(index, selected)
}

fn collapse(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    index.collapse(selected);
    selected
}

fn expand(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    index.expand(selected);
    selected
}

// Jump targets may sit inside collapsed subtrees; reveal them so the
// selection stays reachable by the stepping commands.
fn jump(index: &mut TreeIndex, target: NodeId) -> NodeId {
    index.reveal(target);
    target
}

fn next_sol(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    let target = engine::next_sol(index, selected);
    jump(index, target)
}

fn prev_sol(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    let target = engine::prev_sol(index, selected);
    jump(index, target)
}

fn next_sol_branch(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    let target = engine::next_sol_branch(index, selected);
    jump(index, target)
}

fn prev_sol_branch(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    let target = engine::prev_sol_branch(index, selected);
    jump(index, target)
}

fn next_failed(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    let target = engine::next_failed(index, selected);
    jump(index, target)
}

fn prev_failed(index: &mut TreeIndex, selected: NodeId) -> NodeId {
    let target = engine::prev_failed(index, selected);
    jump(index, target)
}

/// Registry, in [`Command`] declaration order.
pub static COMMANDS: [CommandSpec; 13] = [
    CommandSpec {
        command: Command::GoLeft,
        name: "goLeft",
        keys: &["left", "s", "a", "down"],
        description: "Move to the first child",
        transition: go_left,
    },
    CommandSpec {
        command: Command::GoRight,
        name: "goRight",
        keys: &["right", "d"],
        description: "Move to the next sibling",
        transition: go_right,
    },
    CommandSpec {
        command: Command::GoUp,
        name: "goUp",
        keys: &["up", "w"],
        description: "Move to the parent",
        transition: go_up,
    },
    CommandSpec {
        command: Command::GoToRoot,
        name: "goToRoot",
        keys: &["r"],
        description: "Select the root",
        transition: go_to_root,
    },
    CommandSpec {
        command: Command::GoToPrevious,
        name: "goToPrevious",
        keys: &["shift"],
        description: "Step back to the previously visited node",
        transition: go_to_previous,
    },
    CommandSpec {
        command: Command::Collapse,
        name: "collapse",
        keys: &["c"],
        description: "Hide the selected subtree",
        transition: collapse,
    },
    CommandSpec {
        command: Command::Expand,
        name: "expand",
        keys: &["e"],
        description: "Show the selected subtree",
        transition: expand,
    },
    CommandSpec {
        command: Command::NextSol,
        name: "nextSol",
        keys: &[],
        description: "Jump to the next solution node",
        transition: next_sol,
    },
    CommandSpec {
        command: Command::PrevSol,
        name: "prevSol",
        keys: &[],
        description: "Jump to the previous solution node",
        transition: prev_sol,
    },
    CommandSpec {
        command: Command::NextSolBranch,
        name: "nextSolBranch",
        keys: &[],
        description: "Step down the solution path",
        transition: next_sol_branch,
    },
    CommandSpec {
        command: Command::PrevSolBranch,
        name: "prevSolBranch",
        keys: &[],
        description: "Step up the solution path",
        transition: prev_sol_branch,
    },
    CommandSpec {
        command: Command::NextFailed,
        name: "nextFailed",
        keys: &[],
        description: "Jump to the next failed leaf",
        transition: next_failed,
    },
    CommandSpec {
        command: Command::PrevFailed,
        name: "prevFailed",
        keys: &[],
        description: "Jump to the previous failed leaf",
        transition: prev_failed,
    },
];

impl Command {
    /// Every command, in registry order.
    pub fn all() -> impl Iterator<Item = Self> {
        COMMANDS.iter().map(|spec| spec.command)
    }

    #[must_use]
    pub fn spec(self) -> &'static CommandSpec {
        &COMMANDS[self as usize]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Apply the command's transition.
    pub fn apply(self, index: &mut TreeIndex, selected: NodeId) -> NodeId {
        (self.spec().transition)(index, selected)
    }

    /// Resolve a command name. Matching ignores case, `-` and `_`, so
    /// `goLeft`, `go-left` and `GO_LEFT` are the same command.
    pub fn from_name(raw: &str) -> Result<Self> {
        let wanted = normalize(raw);
        COMMANDS
            .iter()
            .find(|spec| normalize(spec.name) == wanted)
            .map(|spec| spec.command)
            .ok_or_else(|| StxError::UnknownCommand {
                name: raw.to_string(),
            })
    }

    /// Resolve a default key binding.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        COMMANDS
            .iter()
            .find(|spec| spec.keys.contains(&key.as_str()))
            .map(|spec| spec.command)
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
