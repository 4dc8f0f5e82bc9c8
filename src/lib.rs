#![forbid(unsafe_code)]

//! Search Tree Explorer (stx): navigation and playback engine for
//! constraint-solver search trees.
//!
//! A solver delivers a flat list of nodes (a [`Core`](tree::Core)); this crate
//! indexes it, tracks a single selection, moves that selection with a closed
//! set of named commands, and can step it automatically toward the solution
//! leaf or back to the root with cancellable, timed playback.
//!
//! Layers, bottom-up:
//! 1. [`tree`]: wire records, the id index and its aggregates
//! 2. [`navigation`]: pure movement functions and solution-path queries
//! 3. [`playback`]: the play state machine and its timed driver
//! 4. [`explorer`]: session model, messages, reducer and command registry
//!
//! # Library usage
//!
//! ```rust,no_run
//! use search_tree_explorer::prelude::*;
//!
//! let core = Core::from_json_str(r#"{"id":"t","nodes":[{"id":0}]}"#)?;
//! let mut model = ExplorerModel::new(core, ExplorerSettings::default())?;
//! update(&mut model, ExplorerMsg::Command(Command::GoLeft));
//! # Ok::<(), StxError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod explorer;
pub mod logger;
pub mod navigation;
pub mod playback;
pub mod tree;
