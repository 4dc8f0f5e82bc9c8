//! Elm-style state model for one exploration session.
//!
//! All navigation state lives in [`ExplorerModel`]. Commands, clicks, tree
//! replacement and playback control arrive as [`ExplorerMsg`] values; timers
//! and completion signals are represented as [`ExplorerCmd`] values returned
//! from [`super::update::update`].
//!
//! **Design invariant:** the model is deterministic and performs no I/O, and
//! `selected` always names a node present in `index`.

use std::time::Duration;

use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::{Result, StxError};
use crate::navigation::solution::SolutionSummary;
use crate::playback::controller::{
    Direction, MIN_STEP_DURATION, PlaybackController, PlaybackReport,
};
use crate::tree::index::{IndexOptions, ScaleDomain, TreeIndex};
use crate::tree::node::{Core, Node, NodeId, ROOT_ID};

use super::commands::Command;

/// Tunables carried by a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorerSettings {
    /// Pause between playback steps.
    pub step_duration: Duration,
    /// Floor for `step_duration`.
    pub min_step_duration: Duration,
    /// Index construction options for every tree loaded into the session.
    pub index: IndexOptions,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        Self {
            step_duration: Duration::from_millis(500),
            min_step_duration: MIN_STEP_DURATION,
            index: IndexOptions::default(),
        }
    }
}

impl ExplorerSettings {
    /// Derive session settings from the effective configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let min_step_duration = Duration::from_millis(config.playback.min_step_ms);
        Self {
            step_duration: Duration::from_millis(config.playback.step_ms).max(min_step_duration),
            min_step_duration,
            index: IndexOptions {
                minsize_floor: config.layout.minsize_floor,
            },
        }
    }
}

/// Complete navigation state for one tree instance.
#[derive(Debug)]
pub struct ExplorerModel {
    /// Index of the current tree.
    pub index: TreeIndex,
    /// Currently selected node; always present in `index`.
    pub selected: NodeId,
    /// Solution facts for the current tree.
    pub summary: SolutionSummary,
    /// Playback state machine. Survives tree replacement so cancel handles
    /// stay valid.
    pub playback: PlaybackController,
    /// Session tunables.
    pub settings: ExplorerSettings,
    /// Interactive commands applied since the session started.
    pub commands_applied: u64,
}

impl ExplorerModel {
    /// Build a session around a solver core, selecting the root.
    pub fn new(core: Core, settings: ExplorerSettings) -> Result<Self> {
        let index = TreeIndex::build(core, &settings.index)?;
        Ok(Self::from_index(index, settings))
    }

    /// Build a session around an existing index, selecting the root.
    #[must_use]
    pub fn from_index(index: TreeIndex, settings: ExplorerSettings) -> Self {
        let summary = SolutionSummary::from_index(&index);
        Self {
            index,
            selected: ROOT_ID,
            summary,
            playback: PlaybackController::new(),
            settings,
            commands_applied: 0,
        }
    }

    #[must_use]
    pub fn tree_id(&self) -> &str {
        self.index.tree_id()
    }

    #[must_use]
    pub fn selected_node(&self) -> Option<&Node> {
        self.index.get(self.selected)
    }

    /// Swap in a freshly built index for a new tree identifier.
    pub(crate) fn replace_index(&mut self, index: TreeIndex) {
        self.summary = SolutionSummary::from_index(&index);
        self.index = index;
        self.selected = ROOT_ID;
    }

    /// Output record for the rendering collaborator.
    #[must_use]
    pub fn snapshot(&self) -> ExplorerSnapshot {
        let stats = self.index.stats();
        ExplorerSnapshot {
            tree_id: self.index.tree_id().to_string(),
            selected: self.selected,
            revision: self.index.revision(),
            minsize: stats.minsize,
            scale: stats.scale,
            solveable: stats.solveable,
            total_node_count: stats.total_node_count,
            sol_node_ids: stats.sol_node_ids.clone(),
            sol_ancestor_ids: self.summary.sol_ancestor_ids.clone(),
            failed_branch_count: self.summary.failed_branch_count,
            playing: self.playback.is_playing(),
            nodes: self.index.iter().cloned().collect(),
        }
    }
}

/// Serializable view of the session handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerSnapshot {
    pub tree_id: String,
    pub selected: NodeId,
    pub revision: u64,
    pub minsize: f64,
    pub scale: ScaleDomain,
    pub solveable: bool,
    pub total_node_count: usize,
    pub sol_node_ids: Vec<NodeId>,
    pub sol_ancestor_ids: Vec<NodeId>,
    pub failed_branch_count: usize,
    pub playing: bool,
    /// Every node in pre-order, collapsed flags included.
    pub nodes: Vec<Node>,
}

// ──────────────────── messages ────────────────────

/// Events that drive state transitions.
#[derive(Debug, Clone)]
pub enum ExplorerMsg {
    /// A named navigation or collapse command.
    Command(Command),
    /// The renderer reported a click on a node.
    Select(NodeId),
    /// A (possibly new) tree arrived from the solver.
    LoadTree(Box<Core>),
    /// Playing toggled on.
    StartPlayback(Direction),
    /// A scheduled playback pause elapsed.
    PlaybackStep,
    /// Playing toggled off.
    CancelPlayback,
    /// Host changed the step duration (milliseconds, normalized).
    SetStepDuration(i64),
}

// ──────────────────── commands ────────────────────

/// Side-effects returned by the update function for the runtime to execute.
#[derive(Debug)]
pub enum ExplorerCmd {
    /// No side-effect.
    None,
    /// Deliver [`ExplorerMsg::PlaybackStep`] after the given pause. A new
    /// schedule replaces any pending one.
    SchedulePlaybackStep(Duration),
    /// Fire the completion signal for the finished run.
    PlaybackFinished(PlaybackReport),
    /// A tree failed validation; the previous state is untouched.
    TreeRejected(StxError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::FromServerNode;

    fn core(id: &str) -> Core {
        Core {
            nodes: vec![
                FromServerNode {
                    id: 0,
                    parent_id: None,
                    label: String::new(),
                    pretty_label: String::new(),
                    child_count: 1,
                    is_solution: false,
                    is_left_child: false,
                    desc_count: 1,
                },
                FromServerNode {
                    id: 1,
                    parent_id: Some(0),
                    label: String::new(),
                    pretty_label: String::new(),
                    child_count: 0,
                    is_solution: true,
                    is_left_child: true,
                    desc_count: 0,
                },
            ],
            sol_ancestor_ids: vec![0, 1],
            id: id.into(),
        }
    }

    #[test]
    fn new_model_selects_root() {
        let model = ExplorerModel::new(core("a"), ExplorerSettings::default()).unwrap();
        assert_eq!(model.selected, ROOT_ID);
        assert_eq!(model.tree_id(), "a");
        assert!(!model.playback.is_playing());
        assert_eq!(model.commands_applied, 0);
        assert_eq!(model.selected_node().unwrap().id, 0);
    }

    #[test]
    fn snapshot_reports_aggregates() {
        let mut model = ExplorerModel::new(core("a"), ExplorerSettings::default()).unwrap();
        assert!(model.index.collapse(0));
        let snap = model.snapshot();
        let order: Vec<NodeId> = snap.nodes.iter().map(|n| n.id).collect();
        assert_eq!(order, vec![0, 1]);
        assert!(snap.nodes[0].collapsed);
        assert!(!snap.nodes[1].collapsed);

        assert_eq!(snap.tree_id, "a");
        assert_eq!(snap.total_node_count, 2);
        assert_eq!(snap.failed_branch_count, 0);
        assert_eq!(snap.sol_node_ids, vec![1]);
        assert!(snap.solveable);
        assert!(!snap.playing);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["totalNodeCount"], 2);
        assert_eq!(json["scale"]["max"], 1);
        assert_eq!(json["nodes"][0]["collapsed"], true);
        assert_eq!(json["nodes"][1]["parentId"], 0);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.playback.step_ms = 1;
        config.playback.min_step_ms = 20;
        config.layout.minsize_floor = 3.0;
        let settings = ExplorerSettings::from_config(&config);
        assert_eq!(settings.step_duration, Duration::from_millis(20));
        assert_eq!(settings.min_step_duration, Duration::from_millis(20));
        assert!((settings.index.minsize_floor - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_core_is_rejected() {
        let mut bad = core("bad");
        bad.nodes[1].parent_id = Some(9);
        let err = ExplorerModel::new(bad, ExplorerSettings::default()).unwrap_err();
        assert_eq!(err.code(), "STX-2001");
    }
}
