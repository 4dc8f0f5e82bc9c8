//! SIGINT/SIGTERM → playback cancellation.
//!
//! Uses `signal-hook` to point both signals at the raw flag inside a
//! [`CancelToken`]. The runner already polls that flag at step boundaries, so
//! Ctrl-C ends a run with `Cancelled` instead of killing the process.

use signal_hook::SigId;
use signal_hook::consts::{SIGINT, SIGTERM};

use super::controller::CancelToken;

/// Registration handle; unregisters both hooks on drop.
#[derive(Debug)]
pub struct SignalCancelGuard {
    ids: Vec<SigId>,
}

impl SignalCancelGuard {
    /// Number of signals actually hooked.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.ids.len()
    }
}

impl Drop for SignalCancelGuard {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

/// Hook SIGINT and SIGTERM to `token`.
///
/// Registration is best-effort; failures are reported on stderr and the run
/// simply stays uncancellable by that signal.
#[must_use]
pub fn cancel_on_signals(token: &CancelToken) -> SignalCancelGuard {
    let mut ids = Vec::with_capacity(2);
    for (signal, name) in [(SIGINT, "SIGINT"), (SIGTERM, "SIGTERM")] {
        match signal_hook::flag::register(signal, token.flag()) {
            Ok(id) => ids.push(id),
            Err(e) => eprintln!("[STX-SIGNAL] failed to register {name}: {e}"),
        }
    }
    SignalCancelGuard { ids }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_signal_sets_the_cancel_flag() {
        let token = CancelToken::new();
        let guard = cancel_on_signals(&token);
        assert_eq!(guard.registered(), 2);
        signal_hook::low_level::raise(SIGTERM).unwrap();
        assert!(token.is_cancelled());
    }
}
