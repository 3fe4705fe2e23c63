use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "a market refresh is in flight" flag.
///
/// At most one refresh (a scheduler tick or a user-triggered reload) holds
/// the gate at a time. Contenders are turned away, not queued.
#[derive(Debug, Clone, Default)]
pub struct RefreshGate {
    busy: Arc<AtomicBool>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate if it is free. The gate reopens when the permit drops.
    pub fn try_enter(&self) -> Option<RefreshPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of holding the `RefreshGate`.
#[derive(Debug)]
pub struct RefreshPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
