//! A cloneable handle for aborting a relay from outside the session.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking the session from UI code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone, Default)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) is_running: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abort the in-flight request, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a relay is currently awaiting the model.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Install a fresh token for the next relay and return it.
    pub(crate) fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        self.is_running.store(true, Ordering::Release);
        token
    }

    pub(crate) fn finish(&self) {
        self.is_running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_reaches_current_token() {
        let handle = SessionHandle::new();
        let token = handle.begin();
        assert!(handle.is_running());

        handle.clone().abort();
        assert!(token.is_cancelled());

        handle.finish();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_begin_resets_cancellation() {
        let handle = SessionHandle::new();
        handle.begin();
        handle.abort();
        let next = handle.begin();
        assert!(!next.is_cancelled());
    }
}
