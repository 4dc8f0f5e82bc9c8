//! Thread-safe handle to an explorer session.
//!
//! The host UI thread and a playback driver both mutate the same model. Every
//! message is applied under one lock acquisition, so a navigation command and
//! a playback step never interleave inside each other.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::playback::controller::CancelToken;

use super::model::{ExplorerCmd, ExplorerModel, ExplorerMsg, ExplorerSnapshot};
use super::update::update;

/// Cloneable, lock-protected explorer session.
#[derive(Debug, Clone)]
pub struct SharedExplorer {
    inner: Arc<Mutex<ExplorerModel>>,
}

impl SharedExplorer {
    #[must_use]
    pub fn new(model: ExplorerModel) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    /// Apply one message atomically.
    pub fn dispatch(&self, msg: ExplorerMsg) -> ExplorerCmd {
        update(&mut self.inner.lock(), msg)
    }

    /// Run `f` with exclusive access to the model.
    pub fn with<R>(&self, f: impl FnOnce(&mut ExplorerModel) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Lock the model directly. Hold the guard briefly: playback steps wait on
    /// the same lock.
    pub fn lock(&self) -> MutexGuard<'_, ExplorerModel> {
        self.inner.lock()
    }

    #[must_use]
    pub fn snapshot(&self) -> ExplorerSnapshot {
        self.inner.lock().snapshot()
    }

    /// Cancellation handle for the session's playback controller.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.inner.lock().playback.cancel_token()
    }
}
