//! Time source for the engine.
//!
//! The engine reads `now` from a `Clock` at the start of each operation and never samples
//! wall time on its own. Tests drive a `ManualClock`; a hosted deployment can use `SystemClock`.

use crate::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Settable clock. Clones share the same time, so a test can keep a handle after moving one
/// into the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start.as_secs())),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.now.store(time.as_secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        let next = self.now().plus_secs(secs);
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = chrono::Utc::now().timestamp();
        Timestamp(u64::try_from(secs).unwrap_or(0))
    }
}
