//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use search_tree_explorer::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, StxError};

// Tree
pub use crate::tree::index::{IndexOptions, StructuralError, TreeIndex, TreeStats};
pub use crate::tree::node::{Core, FromServerNode, Node, NodeId, ROOT_ID};

// Navigation
pub use crate::navigation::solution::{BranchKind, SolutionSummary};

// Playback
pub use crate::playback::controller::{
    CancelToken, Direction, PlaybackController, PlaybackOutcome, PlaybackReport,
};
pub use crate::playback::runner::{PlaybackObserver, PlaybackRunner};

// Explorer
pub use crate::explorer::commands::{COMMANDS, Command};
pub use crate::explorer::model::{
    ExplorerCmd, ExplorerModel, ExplorerMsg, ExplorerSettings, ExplorerSnapshot,
};
pub use crate::explorer::shared::SharedExplorer;
pub use crate::explorer::update::update;

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLog};
