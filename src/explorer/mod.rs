//! Session state for one tree: model, messages, reducer and command registry.
//!
//! Hosts feed [`ExplorerMsg`] values into [`update`] (directly, through
//! [`SharedExplorer`], or through a playback runner inbox) and render from
//! [`ExplorerSnapshot`].

#![allow(missing_docs)]

pub mod commands;
pub mod model;
pub mod shared;
pub mod update;

#[cfg(test)]
mod test_properties;

pub use commands::{COMMANDS, Command, CommandSpec};
pub use model::{ExplorerCmd, ExplorerModel, ExplorerMsg, ExplorerSettings, ExplorerSnapshot};
pub use shared::SharedExplorer;
pub use update::update;
