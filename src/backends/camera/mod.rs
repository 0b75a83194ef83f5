// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! This module provides the trait-based boundary to the media capture
//! platform and the components built on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CaptureSession    │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    CameraManager    │  ← Playback state machine, frame loop
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ Camera + selector   │  ← Per-device stream, best camera pick
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ MediaBackend trait  │  ← Enumeration, stream acquisition
//! └─────────────────────┘
//! ```

pub mod device;
pub mod frame_loop;
pub mod manager;
pub mod names;
pub mod selector;
pub mod store;
pub mod types;

pub use device::{Camera, DeviceEvent, DeviceField, FieldValue};
pub use manager::{CameraManager, CameraManagerState, CameraPreference, StartStreamOptions};
pub use selector::select_best_camera;
pub use types::*;

use crate::errors::CameraResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Handler invoked when a track ends outside of our control
pub type TrackEndedHandler = Box<dyn Fn() + Send + Sync>;

/// Media capture platform
///
/// Implementations provide:
/// - Permission prompt
/// - Device enumeration
/// - Stream acquisition with facing/resolution constraints
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Trigger the platform permission prompt
    ///
    /// # Returns
    /// * `Ok(())` - Permission granted
    /// * `Err(CameraError::PermissionDenied)` - Permission refused
    async fn request_permission(&self) -> CameraResult<()>;

    /// Enumerate video input devices
    async fn enumerate_devices(&self) -> CameraResult<Vec<DeviceInfo>>;

    /// Acquire a stream matching the constraints
    ///
    /// Fails with `CameraError::DeviceUnavailable` when the device is in use
    /// or cannot satisfy the constraints.
    async fn open_stream(&self, constraints: &StreamConstraints)
    -> CameraResult<Arc<dyn MediaStream>>;
}

/// An active camera stream (one video track)
#[async_trait]
pub trait MediaStream: Send + Sync {
    /// Capabilities reported by the video track
    fn capabilities(&self) -> TrackCapabilities;

    /// Apply a torch constraint
    async fn apply_torch(&self, enabled: bool) -> CameraResult<()>;

    /// Stop all tracks of the stream
    fn stop(&self);

    /// Whether the stream has been stopped or ended
    fn is_stopped(&self) -> bool;

    /// Register the handler fired when the track ends (hardware disconnect)
    fn set_ended_handler(&self, handler: TrackEndedHandler);
}

/// Video element the stream is rendered into
///
/// The sink owns frame scheduling: [`VideoSink::next_frame`] resolves once
/// per rendered video frame.
#[async_trait]
pub trait VideoSink: Send + Sync {
    /// Bind a stream (or clear it with `None`)
    fn set_source(&self, stream: Option<Arc<dyn MediaStream>>);

    /// Whether a stream is bound
    fn has_source(&self) -> bool;

    /// Start playing the bound stream
    async fn play(&self) -> CameraResult<()>;

    /// Pause playback
    fn pause(&self);

    /// Wait for the next rendered frame
    ///
    /// Returns `None` once the sink is not playing.
    async fn next_frame(&self) -> Option<CameraFrame>;
}
