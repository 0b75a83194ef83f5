// SPDX-License-Identifier: GPL-3.0-only

//! Scan timeout timer
//!
//! At most one countdown is armed at a time. Re-arming or clearing aborts
//! the previous countdown, and a generation counter makes sure a countdown
//! that already woke up but lost the race against `clear()` never runs its
//! expiry action.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
struct TimerShared {
    generation: AtomicU64,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimerShared {
    /// Claim the expiry for `generation`; false if cleared or re-armed since
    fn claim(&self, generation: u64) -> bool {
        let mut handle = self.handle.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        // Dropping our own handle only detaches the task
        handle.take();
        true
    }
}

/// Single-shot countdown on the tokio runtime
#[derive(Clone, Default)]
pub struct ScanTimer {
    shared: Arc<TimerShared>,
}

impl ScanTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown, replacing any armed one
    ///
    /// `on_expire` runs on the timer task once `duration` has elapsed,
    /// unless the timer is cleared or re-armed first.
    pub fn arm<F>(&self, duration: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let mut handle = self.shared.handle.lock();

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = handle.take() {
            previous.abort();
        }

        debug!(timeout_ms = duration.as_millis() as u64, "Scan timeout armed");
        *handle = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if shared.claim(generation) {
                debug!("Scan timeout expired");
                on_expire();
            }
        }));
    }

    /// Disarm the countdown; no-op when nothing is armed
    pub fn clear(&self) {
        let mut handle = self.shared.handle.lock();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = handle.take() {
            debug!("Scan timeout cleared");
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.shared.handle.lock().is_some()
    }
}
