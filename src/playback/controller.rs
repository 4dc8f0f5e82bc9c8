//! Two-state playback scheduler: `Idle` ⇄ `Playing`.
//!
//! The controller owns no timer. A driver (see [`super::runner`]) calls
//! [`PlaybackController::advance`] once per suspension boundary; each call
//! either commits exactly one navigation step or ends the run. Cancellation is
//! a shared flag ([`CancelToken`]) that is only consulted inside `advance`, so
//! a step in progress always completes before cancellation is honored.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::navigation::engine::{go_to_previous, step_forward};
use crate::tree::index::TreeIndex;
use crate::tree::node::{NodeId, ROOT_ID};

/// Floor applied to every step duration.
pub const MIN_STEP_DURATION: Duration = Duration::from_millis(5);

/// Direction of a play run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward the solution leaf.
    #[default]
    Forward,
    /// Back toward the root.
    Reverse,
}

impl Direction {
    #[must_use]
    pub const fn from_reverse_flag(reverse: bool) -> Self {
        if reverse { Self::Reverse } else { Self::Forward }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing { direction: Direction, steps: u64 },
}

/// Why a play run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackOutcome {
    /// The stop condition was reached.
    Completed,
    /// The cancel flag was observed at a step boundary.
    Cancelled,
    /// A step made no progress (traversal end, or the target is unreachable).
    Stalled,
}

/// Completion record handed to the completion signal, once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    pub direction: Direction,
    pub outcome: PlaybackOutcome,
    pub steps: u64,
}

/// Result of one [`PlaybackController::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTick {
    /// Not playing; nothing happened.
    Idle,
    /// One step was committed; the new selection.
    Stepped(NodeId),
    /// The run ended and the controller is `Idle` again.
    Finished(PlaybackReport),
}

/// Shared cooperative cancellation flag.
///
/// Cloning shares the flag. `Ordering::Relaxed` is enough: the flag is polled
/// at every step boundary and orders nothing else.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the current run.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// The raw flag, for wiring to OS signal handlers.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

/// Playback state machine for one tree instance.
#[derive(Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
    cancel: CancelToken,
    runs: u64,
}

impl PlaybackController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    /// Number of runs started so far.
    #[must_use]
    pub const fn runs(&self) -> u64 {
        self.runs
    }

    /// Handle other parties use to cancel the current run.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation; honored at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// `Idle → Playing`. Returns `false` (and changes nothing) when a run is
    /// already active.
    pub fn start(&mut self, direction: Direction) -> bool {
        if self.is_playing() {
            return false;
        }
        self.cancel.reset();
        self.runs += 1;
        self.state = PlaybackState::Playing {
            direction,
            steps: 0,
        };
        true
    }

    /// Run one iteration of the play loop against the current selection.
    pub fn advance(&mut self, index: &TreeIndex, selected: NodeId) -> PlaybackTick {
        let PlaybackState::Playing { direction, steps } = self.state else {
            return PlaybackTick::Idle;
        };

        if self.cancel.is_cancelled() {
            return self.finish(direction, steps, PlaybackOutcome::Cancelled);
        }
        if reached_stop(index, direction, selected) {
            return self.finish(direction, steps, PlaybackOutcome::Completed);
        }

        let next = playback_step(index, direction, selected);
        if next == selected {
            return self.finish(direction, steps, PlaybackOutcome::Stalled);
        }
        self.state = PlaybackState::Playing {
            direction,
            steps: steps + 1,
        };
        PlaybackTick::Stepped(next)
    }

    /// End the active run immediately (e.g. the tree was replaced).
    ///
    /// Returns the completion report, or `None` when idle.
    pub fn abort(&mut self) -> Option<PlaybackReport> {
        let PlaybackState::Playing { direction, steps } = self.state else {
            return None;
        };
        match self.finish(direction, steps, PlaybackOutcome::Cancelled) {
            PlaybackTick::Finished(report) => Some(report),
            _ => None,
        }
    }

    fn finish(&mut self, direction: Direction, steps: u64, outcome: PlaybackOutcome) -> PlaybackTick {
        self.state = PlaybackState::Idle;
        self.cancel.reset();
        PlaybackTick::Finished(PlaybackReport {
            direction,
            outcome,
            steps,
        })
    }
}

/// Forward stops on the solution leaf, reverse on the root.
#[must_use]
pub fn reached_stop(index: &TreeIndex, direction: Direction, selected: NodeId) -> bool {
    match direction {
        Direction::Forward => index.solution_leaf() == Some(selected),
        Direction::Reverse => selected == ROOT_ID,
    }
}

/// One playback step: `go_left`, continuing descend-first past leaves and
/// collapsed nodes, when moving forward; `go_to_previous` in reverse.
#[must_use]
pub fn playback_step(index: &TreeIndex, direction: Direction, selected: NodeId) -> NodeId {
    match direction {
        Direction::Forward => step_forward(index, selected),
        Direction::Reverse => go_to_previous(index, selected),
    }
}

/// Normalize a host-supplied step duration in milliseconds. Zero, negative and
/// sub-floor values become `floor`.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn normalize_step_duration(millis: i64, floor: Duration) -> Duration {
    if millis <= 0 {
        return floor;
    }
    Duration::from_millis(millis as u64).max(floor)
}
