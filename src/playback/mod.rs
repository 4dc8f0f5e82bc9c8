//! Automatic stepping toward the solution leaf or back to the root.
//!
//! [`controller`] is the pure `Idle`/`Playing` state machine; [`runner`]
//! supplies the timed pauses between steps.

pub mod controller;
pub mod runner;
#[cfg(feature = "cli")]
pub mod signals;

pub use controller::{
    CancelToken, Direction, PlaybackController, PlaybackOutcome, PlaybackReport, PlaybackState,
};
pub use runner::{ExplorerHandle, NullObserver, PlaybackObserver, PlaybackRunner};
