// SPDX-License-Identifier: GPL-3.0-only

//! Task lifecycle management for the frame capture loop
//!
//! The capture loop runs one iteration per rendered video frame. The
//! controller owns the spawned task: dropping it (or calling `stop()`)
//! prevents any further iteration, but work already handed off by an
//! iteration (frame callbacks) keeps running.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Controller for a capture loop running on a tokio task
///
/// # Example
///
/// ```ignore
/// let controller = CaptureLoopController::start("frame-capture", move || {
///     let sink = Arc::clone(&sink);
///     async move {
///         match sink.next_frame().await {
///             Some(frame) => {
///                 deliver(frame);
///                 LoopAction::Continue
///             }
///             None => LoopAction::Stop,
///         }
///     }
/// });
///
/// // Later, stop the loop
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    /// Task handle for aborting
    task_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a new capture loop on the current tokio runtime
    ///
    /// The provided closure is called repeatedly and its future awaited until
    /// it resolves to `LoopAction::Stop` or the controller is stopped.
    pub fn start<F, Fut>(name: &str, mut loop_fn: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = LoopAction> + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        debug!(name = %name, "Starting capture loop");

        let task_handle = tokio::spawn(async move {
            loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                match loop_fn().await {
                    LoopAction::Continue => {}
                    LoopAction::Stop => {
                        debug!(name = %name_clone, "Loop requested stop");
                        break;
                    }
                }
            }

            info!(name = %name_clone, "Capture loop exiting");
        });

        Self {
            task_handle: Some(task_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        !self.stop_signal.load(Ordering::SeqCst)
            && self
                .task_handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the loop immediately
    ///
    /// Aborts the task at its current suspension point, so an iteration
    /// waiting for the next frame never delivers it.
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.task_handle.take() {
            debug!(name = %self.name, "Stopping capture loop");
            handle.abort();
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test]
    async fn test_basic_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while controller.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 11); // 0-10 inclusive
        controller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_iterations() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            }
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        controller.stop();
        let seen = counter.load(Ordering::SeqCst);
        assert!(seen > 0);
        assert!(!controller.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let controller = CaptureLoopController::start("test-drop", move || {
            let counter = Arc::clone(&counter_clone);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            }
        });

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(controller.is_running());
        drop(controller);

        let seen = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }
}
