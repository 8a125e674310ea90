//! Edge-triggered signalling between the receive task and command tasks.

use std::sync::Mutex;
use tokio::sync::Notify;

/// A clearable async flag with `set`/`clear`/`wait` semantics.
///
/// This is the signal behind `initialized_received`, `stopped_received` and
/// the session stop signal. It is edge-triggered by design: a `set` that
/// happens before anyone waits is only observable through the flag, so
/// callers that must not miss an edge clear the flag *before* triggering
/// the action that will set it, and wait after.
#[derive(Debug, Default)]
pub(crate) struct Signal {
    set: Mutex<bool>,
    notify: Notify,
}

impl Signal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every current waiter.
    pub(crate) fn set(&self) {
        *self.set.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.notify.notify_waiters();
    }

    /// Lower the flag. Waiters registered after this point only complete on
    /// the next `set`.
    pub(crate) fn clear(&self) {
        *self.set.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }

    pub(crate) fn is_set(&self) -> bool {
        *self.set.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait until the flag is set.
    ///
    /// Returns immediately if it already is.
    pub(crate) async fn wait(&self) {
        loop {
            // Register interest before re-checking the flag, otherwise a
            // set() between the check and the await would be lost.
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}
