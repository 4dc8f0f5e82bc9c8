//! Tree vertices and the wire records the solver emits.
//!
//! The solver streams a flat list of [`FromServerNode`] records wrapped in a
//! [`Core`]. Structure is never nested in the payload: every record points at
//! its parent by id and the [`TreeIndex`](super::index::TreeIndex) rebuilds
//! the shape from those references.

#![allow(missing_docs)]

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StxError};

/// Solver-assigned node identifier. Unique within one tree; the root is `0`.
pub type NodeId = u64;

/// Id of the root node of every well-formed tree.
pub const ROOT_ID: NodeId = 0;

/// One node as delivered by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromServerNode {
    pub id: NodeId,
    /// `None` (JSON `null` or absent) only for the root.
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub pretty_label: String,
    /// Declared number of children. The solver may deliver fewer.
    #[serde(default)]
    pub child_count: u32,
    #[serde(default)]
    pub is_solution: bool,
    #[serde(default)]
    pub is_left_child: bool,
    /// Total number of descendants, used as the node's weight.
    #[serde(default)]
    pub desc_count: u64,
}

/// A complete solver tree: flat node list, the root-to-solution path and the
/// identifier that distinguishes one tree instance from the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Core {
    pub nodes: Vec<FromServerNode>,
    /// Ordered root-to-solution-leaf id sequence; empty when unsolvable.
    #[serde(default)]
    pub sol_ancestor_ids: Vec<NodeId>,
    pub id: String,
}

impl Core {
    /// Parse a core from its JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parse a core from any reader yielding JSON.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read and parse a core from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| StxError::io(path, source))?;
        Self::from_json_str(&raw)
    }

    /// Serialize back to the solver's JSON shape.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A tree vertex: solver metadata plus the one piece of view state the core
/// owns, the collapsed flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub label: String,
    pub pretty_label: String,
    pub child_count: u32,
    pub desc_count: u64,
    pub is_solution: bool,
    pub is_left_child: bool,
    pub collapsed: bool,
}

impl Node {
    /// Whether the solver declared this node as having no children.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    /// Whether this node is the tree root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Hide this node's subtree. No-op on leaves.
    ///
    /// Returns `true` when the flag changed.
    pub fn collapse(&mut self) -> bool {
        if self.child_count == 0 || self.collapsed {
            return false;
        }
        self.collapsed = true;
        true
    }

    /// Show this node's subtree again. No-op when already expanded.
    ///
    /// Returns `true` when the flag changed.
    pub fn expand(&mut self) -> bool {
        if !self.collapsed {
            return false;
        }
        self.collapsed = false;
        true
    }
}

impl From<FromServerNode> for Node {
    fn from(raw: FromServerNode) -> Self {
        Self {
            id: raw.id,
            parent_id: raw.parent_id,
            label: raw.label,
            pretty_label: raw.pretty_label,
            child_count: raw.child_count,
            desc_count: raw.desc_count,
            is_solution: raw.is_solution,
            is_left_child: raw.is_left_child,
            collapsed: false,
        }
    }
}
