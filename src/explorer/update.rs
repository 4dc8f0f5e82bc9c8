//! Pure update function for the explorer state machine.
//!
//! `update()` takes the current model and a message, mutates the model, and
//! returns a command describing any side-effects the runtime should execute.
//!
//! **Design invariant:** this module performs zero I/O. All effects are
//! described as [`ExplorerCmd`] values.

use std::time::Duration;

use crate::playback::controller::{PlaybackTick, normalize_step_duration};
use crate::tree::index::TreeIndex;

use super::model::{ExplorerCmd, ExplorerModel, ExplorerMsg};

/// Apply a message to the model and return the next command for the runtime.
///
/// Every state transition goes through this function, which keeps navigation
/// and playback atomic with respect to each other: a message is applied in
/// full before the next one is looked at.
pub fn update(model: &mut ExplorerModel, msg: ExplorerMsg) -> ExplorerCmd {
    match msg {
        ExplorerMsg::Command(command) => {
            model.selected = command.apply(&mut model.index, model.selected);
            model.commands_applied += 1;
            ExplorerCmd::None
        }

        ExplorerMsg::Select(id) => {
            if model.index.contains(id) {
                model.index.reveal(id);
                model.selected = id;
            }
            ExplorerCmd::None
        }

        ExplorerMsg::LoadTree(core) => {
            // Same identifier: the tree is already loaded.
            if core.id == model.index.tree_id() {
                return ExplorerCmd::None;
            }
            match TreeIndex::build(*core, &model.settings.index) {
                Ok(index) => {
                    let aborted = model.playback.abort();
                    model.replace_index(index);
                    aborted.map_or(ExplorerCmd::None, ExplorerCmd::PlaybackFinished)
                }
                Err(error) => ExplorerCmd::TreeRejected(error),
            }
        }

        ExplorerMsg::StartPlayback(direction) => {
            if model.playback.start(direction) {
                // First iteration runs immediately; pauses follow each step.
                ExplorerCmd::SchedulePlaybackStep(Duration::ZERO)
            } else {
                ExplorerCmd::None
            }
        }

        ExplorerMsg::PlaybackStep => match model.playback.advance(&model.index, model.selected) {
            PlaybackTick::Idle => ExplorerCmd::None,
            PlaybackTick::Stepped(next) => {
                model.selected = next;
                ExplorerCmd::SchedulePlaybackStep(model.settings.step_duration)
            }
            PlaybackTick::Finished(report) => ExplorerCmd::PlaybackFinished(report),
        },

        ExplorerMsg::CancelPlayback => {
            // Only an active run can be cancelled.
            if model.playback.is_playing() {
                model.playback.cancel();
            }
            ExplorerCmd::None
        }

        ExplorerMsg::SetStepDuration(millis) => {
            model.settings.step_duration =
                normalize_step_duration(millis, model.settings.min_step_duration);
            ExplorerCmd::None
        }
    }
}
