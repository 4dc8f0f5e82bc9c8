//! Playback driver: turns `SchedulePlaybackStep` commands into real pauses.
//!
//! The runner owns an unbounded crossbeam inbox. While a run is active it
//! blocks on `recv_deadline` until either the next step is due or another
//! party sends a message (a navigation command, a new tree, a cancel). Inbox
//! messages go through the same `update` function as steps, so interactive
//! input and playback never observe each other half-applied.
//!
//! Only one step deadline is pending at a time; a new schedule replaces it.
//! Step timing belongs to the runner alone: `PlaybackStep` messages found in
//! the inbox are dropped, and so are playback controls left over from a run
//! that already ended.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::core::errors::{Result, StxError};
use crate::explorer::model::{ExplorerCmd, ExplorerModel, ExplorerMsg};
use crate::explorer::shared::SharedExplorer;
use crate::explorer::update::update;
use crate::tree::node::NodeId;

use super::controller::{CancelToken, Direction, PlaybackReport};

/// Longest uninterrupted wait. Bounds how long an externally raised cancel
/// flag (e.g. from a signal handler) goes unnoticed.
const CANCEL_POLL_SLICE: Duration = Duration::from_millis(50);

/// Receives playback progress. All methods run on the driver thread.
pub trait PlaybackObserver {
    /// A step committed; `selected` is the new selection.
    fn on_step(&mut self, selected: NodeId);

    /// The run ended. Called exactly once per run.
    fn on_complete(&mut self, report: &PlaybackReport);

    /// A tree delivered through the inbox failed validation.
    fn on_rejected(&mut self, _error: &StxError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl PlaybackObserver for NullObserver {
    fn on_step(&mut self, _selected: NodeId) {}
    fn on_complete(&mut self, _report: &PlaybackReport) {}
}

/// Handle other threads use to talk to a running playback.
#[derive(Debug, Clone)]
pub struct ExplorerHandle {
    sender: Sender<ExplorerMsg>,
    cancel: CancelToken,
}

impl ExplorerHandle {
    /// Queue a message for the driver.
    pub fn send(&self, msg: ExplorerMsg) -> Result<()> {
        self.sender
            .send(msg)
            .map_err(|_| StxError::ChannelClosed {
                component: "playback-runner",
            })
    }

    /// Raise the cancel flag directly; honored at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Deadline-driven playback loop.
#[derive(Debug)]
pub struct PlaybackRunner {
    sender: Sender<ExplorerMsg>,
    inbox: Receiver<ExplorerMsg>,
}

impl Default for PlaybackRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackRunner {
    #[must_use]
    pub fn new() -> Self {
        let (sender, inbox) = unbounded();
        Self { sender, inbox }
    }

    /// Handle bound to this runner's inbox and the given cancel token.
    #[must_use]
    pub fn handle(&self, cancel: CancelToken) -> ExplorerHandle {
        ExplorerHandle {
            sender: self.sender.clone(),
            cancel,
        }
    }

    /// Play `model` in `direction` until the run finishes.
    pub fn run(
        &self,
        model: &mut ExplorerModel,
        direction: Direction,
        observer: &mut dyn PlaybackObserver,
    ) -> Result<PlaybackReport> {
        let cancel = model.playback.cancel_token();
        let mut dispatch = |msg: ExplorerMsg| {
            let cmd = update(model, msg);
            (cmd, model.selected)
        };
        self.drive(&mut dispatch, &cancel, direction, observer)
    }

    /// Play a shared session. The lock is held only while a message is
    /// applied, never across a pause.
    pub fn run_shared(
        &self,
        explorer: &SharedExplorer,
        direction: Direction,
        observer: &mut dyn PlaybackObserver,
    ) -> Result<PlaybackReport> {
        let cancel = explorer.cancel_token();
        let mut dispatch = |msg: ExplorerMsg| {
            explorer.with(|model| {
                let cmd = update(model, msg);
                (cmd, model.selected)
            })
        };
        self.drive(&mut dispatch, &cancel, direction, observer)
    }

    fn drive(
        &self,
        dispatch: &mut dyn FnMut(ExplorerMsg) -> (ExplorerCmd, NodeId),
        cancel: &CancelToken,
        direction: Direction,
        observer: &mut dyn PlaybackObserver,
    ) -> Result<PlaybackReport> {
        self.settle_inbox(dispatch, observer);

        let mut deadline: Option<Instant> = None;
        let (first, _) = dispatch(ExplorerMsg::StartPlayback(direction));
        if let Some(report) = execute(first, &mut deadline, observer) {
            return Ok(report);
        }
        if deadline.is_none() {
            return Err(StxError::Runtime {
                details: "playback already active for this session".to_string(),
            });
        }

        loop {
            let Some(due) = deadline else {
                // Steps are always rescheduled until the run finishes.
                return Err(StxError::Runtime {
                    details: "playback lost its step schedule".to_string(),
                });
            };
            let now = Instant::now();
            let due = if cancel.is_cancelled() { now } else { due };
            let wake = due.min(now + CANCEL_POLL_SLICE);

            let (cmd, selected, stepped) = match self.inbox.recv_deadline(wake) {
                Ok(ExplorerMsg::PlaybackStep) => continue,
                Ok(msg) => {
                    let (cmd, selected) = dispatch(msg);
                    (cmd, selected, false)
                }
                Err(RecvTimeoutError::Timeout) => {
                    if Instant::now() < due && !cancel.is_cancelled() {
                        continue;
                    }
                    deadline = None;
                    let (cmd, selected) = dispatch(ExplorerMsg::PlaybackStep);
                    (cmd, selected, true)
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(StxError::ChannelClosed {
                        component: "playback-runner",
                    });
                }
            };

            if stepped && matches!(cmd, ExplorerCmd::SchedulePlaybackStep(_)) {
                observer.on_step(selected);
            }
            if let Some(report) = execute(cmd, &mut deadline, observer) {
                return Ok(report);
            }
        }
    }

    /// Apply whatever was queued while no run was active. Playback controls
    /// in that backlog addressed an earlier run and are discarded.
    fn settle_inbox(
        &self,
        dispatch: &mut dyn FnMut(ExplorerMsg) -> (ExplorerCmd, NodeId),
        observer: &mut dyn PlaybackObserver,
    ) {
        for msg in self.inbox.try_iter() {
            if matches!(
                msg,
                ExplorerMsg::StartPlayback(_)
                    | ExplorerMsg::PlaybackStep
                    | ExplorerMsg::CancelPlayback
            ) {
                continue;
            }
            // Completions here belong to a run driven elsewhere.
            if let (ExplorerCmd::TreeRejected(error), _) = dispatch(msg) {
                observer.on_rejected(&error);
            }
        }
    }
}

/// Carry out one command. Returns the completion report when the run ended.
fn execute(
    cmd: ExplorerCmd,
    deadline: &mut Option<Instant>,
    observer: &mut dyn PlaybackObserver,
) -> Option<PlaybackReport> {
    match cmd {
        ExplorerCmd::None => None,
        ExplorerCmd::SchedulePlaybackStep(pause) => {
            *deadline = Some(Instant::now() + pause);
            None
        }
        ExplorerCmd::PlaybackFinished(report) => {
            observer.on_complete(&report);
            Some(report)
        }
        ExplorerCmd::TreeRejected(error) => {
            observer.on_rejected(&error);
            None
        }
    }
}
