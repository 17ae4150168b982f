use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-flight token for classifier requests.
///
/// `try_acquire` checks and sets the flag in one atomic step; the flag is
/// cleared when the returned permit is dropped, whether the request
/// succeeded, failed or was aborted.
#[derive(Debug, Clone, Default)]
pub struct InFlightGate {
    busy: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct InFlightPermit {
    busy: Arc<AtomicBool>,
}

impl InFlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<InFlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightPermit {
                busy: Arc::clone(&self.busy),
            })
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
