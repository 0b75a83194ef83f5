// SPDX-License-Identifier: GPL-3.0-only

//! Virtual media capture platform
//!
//! An in-process implementation of the media platform traits. It simulates
//! device enumeration, stream acquisition (including busy devices and
//! permission refusal), torch control, hardware disconnects and a video sink
//! that renders synthetic frames at a fixed rate.
//!
//! # Architecture
//!
//! ```text
//! VirtualDeviceSpec / DeviceProfile
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │ VirtualMediaBackend  │  ← enumerate, open_stream, disconnect
//! └──────────────────────┘
//!        │ VirtualStream
//!        ▼
//! ┌──────────────────────┐
//! │ VirtualVideoSink     │  ← play/pause, one frame per interval
//! └──────────────────────┘
//! ```

mod devices;
mod sink;
mod stream;

pub use devices::{DeviceProfile, VirtualDeviceSpec};
pub use sink::{LEFT_EDGE_MARKER, VirtualVideoSink};
pub use stream::VirtualStream;

use crate::backends::camera::{DeviceInfo, MediaBackend, MediaStream, StreamConstraints};
use crate::errors::{CameraError, CameraResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default)]
pub(crate) struct BackendState {
    devices: Vec<VirtualDeviceSpec>,
    permission_denied: bool,
    busy: HashSet<String>,
    pub(crate) failing_torch: HashSet<String>,
    streams: Vec<Arc<VirtualStream>>,
    open_count: usize,
}

/// Simulated media capture platform
pub struct VirtualMediaBackend {
    state: Arc<Mutex<BackendState>>,
}

impl VirtualMediaBackend {
    /// Create a platform exposing the given devices in enumeration order
    pub fn new(devices: Vec<VirtualDeviceSpec>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                devices,
                ..Default::default()
            })),
        }
    }

    /// Create a platform mimicking a known device
    pub fn from_profile(profile: DeviceProfile) -> Self {
        info!(profile = %profile, "Creating virtual media platform");
        Self::new(profile.devices())
    }

    /// Refuse camera permission from now on
    pub fn set_permission_denied(&self, denied: bool) {
        self.state.lock().permission_denied = denied;
    }

    /// Mark a device as used by another process
    pub fn set_busy(&self, device_id: &str, busy: bool) {
        let mut state = self.state.lock();
        if busy {
            state.busy.insert(device_id.to_string());
        } else {
            state.busy.remove(device_id);
        }
    }

    /// Make torch constraints fail on a device
    pub fn set_torch_failure(&self, device_id: &str, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing_torch.insert(device_id.to_string());
        } else {
            state.failing_torch.remove(device_id);
        }
    }

    /// Reverse the enumeration order
    pub fn reverse_device_order(&self) {
        self.state.lock().devices.reverse();
    }

    /// Plug in a device
    pub fn add_device(&self, spec: VirtualDeviceSpec) {
        self.state.lock().devices.push(spec);
    }

    /// Unplug a device
    ///
    /// The device disappears from enumeration and its active streams end,
    /// firing their track-ended handlers.
    pub fn disconnect(&self, device_id: &str) {
        let ended: Vec<Arc<VirtualStream>> = {
            let mut state = self.state.lock();
            state.devices.retain(|device| device.device_id != device_id);
            state
                .streams
                .iter()
                .filter(|stream| stream.device_id() == device_id && !stream.is_stopped())
                .cloned()
                .collect()
        };

        warn!(device_id, streams = ended.len(), "Virtual device disconnected");

        for stream in ended {
            stream.end();
        }
    }

    /// Number of streams that have not been stopped
    pub fn active_stream_count(&self) -> usize {
        self.state
            .lock()
            .streams
            .iter()
            .filter(|stream| !stream.is_stopped())
            .count()
    }

    /// Number of successful stream acquisitions so far
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }
}

#[async_trait]
impl MediaBackend for VirtualMediaBackend {
    async fn request_permission(&self) -> CameraResult<()> {
        if self.state.lock().permission_denied {
            return Err(CameraError::PermissionDenied);
        }
        Ok(())
    }

    async fn enumerate_devices(&self) -> CameraResult<Vec<DeviceInfo>> {
        let state = self.state.lock();
        if state.permission_denied {
            return Err(CameraError::PermissionDenied);
        }
        Ok(state.devices.iter().map(VirtualDeviceSpec::device_info).collect())
    }

    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> CameraResult<Arc<dyn MediaStream>> {
        let mut state = self.state.lock();

        if state.permission_denied {
            return Err(CameraError::PermissionDenied);
        }

        let spec = match &constraints.device_id {
            Some(id) => state.devices.iter().find(|device| &device.device_id == id),
            None => state
                .devices
                .iter()
                .find(|device| constraints.facing.is_some() && device.reported_facing == constraints.facing)
                .or_else(|| state.devices.first()),
        }
        .cloned()
        .ok_or_else(|| CameraError::DeviceUnavailable("Requested device not found".into()))?;

        if state.busy.contains(&spec.device_id) {
            return Err(CameraError::DeviceUnavailable(format!(
                "{} is in use by another process",
                spec.label
            )));
        }

        debug!(
            device = %spec.label,
            width = constraints.width,
            height = constraints.height,
            "Opening virtual stream"
        );

        let stream = Arc::new(VirtualStream::new(&spec, Arc::clone(&self.state)));
        state.streams.retain(|stream| !stream.is_stopped());
        state.streams.push(Arc::clone(&stream));
        state.open_count += 1;

        Ok(stream)
    }
}
