// SPDX-License-Identifier: GPL-3.0-only

//! Simulated camera stream

use super::BackendState;
use super::devices::VirtualDeviceSpec;
use crate::backends::camera::{MediaStream, TrackCapabilities, TrackEndedHandler};
use crate::errors::{CameraError, CameraResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One open track on a virtual device
pub struct VirtualStream {
    device_id: String,
    capabilities: TrackCapabilities,
    backend: Arc<Mutex<BackendState>>,
    stopped: AtomicBool,
    torch_on: AtomicBool,
    ended_handler: Mutex<Option<TrackEndedHandler>>,
}

impl VirtualStream {
    pub(crate) fn new(spec: &VirtualDeviceSpec, backend: Arc<Mutex<BackendState>>) -> Self {
        Self {
            device_id: spec.device_id.clone(),
            capabilities: spec.capabilities(),
            backend,
            stopped: AtomicBool::new(false),
            torch_on: AtomicBool::new(false),
            ended_handler: Mutex::new(None),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn torch_on(&self) -> bool {
        self.torch_on.load(Ordering::SeqCst)
    }

    /// End the track as if the hardware went away
    pub fn end(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let handler = self.ended_handler.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }
}

#[async_trait]
impl MediaStream for VirtualStream {
    fn capabilities(&self) -> TrackCapabilities {
        self.capabilities.clone()
    }

    async fn apply_torch(&self, enabled: bool) -> CameraResult<()> {
        if self.is_stopped() {
            return Err(CameraError::NoActiveStream(self.device_id.clone()));
        }
        if !self.capabilities.torch || self.backend.lock().failing_torch.contains(&self.device_id) {
            return Err(CameraError::Backend("torch constraint rejected".into()));
        }
        self.torch_on.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        // An explicit stop does not fire the ended handler
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!(device_id = %self.device_id, "Virtual stream stopped");
            self.ended_handler.lock().take();
            self.torch_on.store(false, Ordering::SeqCst);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn set_ended_handler(&self, handler: TrackEndedHandler) {
        *self.ended_handler.lock() = Some(handler);
    }
}
