// SPDX-License-Identifier: GPL-3.0-only

//! Camera device model
//!
//! A [`Camera`] wraps one physical device and its (optional) active stream.
//! Every field mutation goes through a setter that applies the change and
//! emits a [`DeviceEvent`] to the single registered listener. The stream
//! lifecycle manager relies on this to notice hardware disconnects, which
//! are reported as [`DeviceEvent::TrackEnded`].

use super::names::{is_back_camera_name, is_front_camera_name};
use super::types::{DeviceInfo, FacingMode, StreamConstraints, TrackCapabilities, VideoResolution};
use super::{MediaBackend, MediaStream};
use crate::errors::{CameraError, CameraResult};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Fields of a camera that emit change events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceField {
    FacingMode,
    TorchSupported,
    TorchEnabled,
    SingleShotSupported,
    ActiveStream,
}

/// Old/new value carried by a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Facing(Option<FacingMode>),
}

/// Notification emitted by a camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A field changed value
    Changed {
        device_id: String,
        field: DeviceField,
        old: FieldValue,
        new: FieldValue,
    },
    /// The active track ended outside of our control (TRACK_END)
    TrackEnded { device_id: String },
}

impl DeviceEvent {
    /// Id of the device that emitted the event
    pub fn device_id(&self) -> &str {
        match self {
            DeviceEvent::Changed { device_id, .. } | DeviceEvent::TrackEnded { device_id } => {
                device_id
            }
        }
    }

    /// Whether this is the TRACK_END notification
    pub fn is_track_end(&self) -> bool {
        matches!(self, DeviceEvent::TrackEnded { .. })
    }
}

/// Listener receiving every event of a camera
pub type DeviceListener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

#[derive(Default)]
struct CameraState {
    facing_mode: Option<FacingMode>,
    torch_supported: bool,
    torch_enabled: bool,
    single_shot_supported: bool,
    active_stream: Option<Arc<dyn MediaStream>>,
    stream_capabilities: Option<TrackCapabilities>,
    /// Bumped for every acquired stream so stale end handlers are ignored
    stream_generation: u64,
}

/// A camera device and its active stream
pub struct Camera {
    info: DeviceInfo,
    backend: Arc<dyn MediaBackend>,
    state: Mutex<CameraState>,
    listener: Mutex<Option<DeviceListener>>,
    /// Serializes stream acquisition so concurrent starts share one stream
    stream_lock: tokio::sync::Mutex<()>,
}

impl Camera {
    /// Create a camera from enumerated device info
    ///
    /// The facing is first inferred from the label; it is corrected from the
    /// stream-reported capabilities once a stream exists.
    pub fn new(info: DeviceInfo, backend: Arc<dyn MediaBackend>) -> Arc<Self> {
        let mut facing_mode = None;
        if is_front_camera_name(&info.label) {
            facing_mode = Some(FacingMode::Front);
        }
        if is_back_camera_name(&info.label) {
            facing_mode = Some(FacingMode::Back);
        }

        debug!(camera = %info.label, facing = ?facing_mode, "Created camera");

        Arc::new(Self {
            info,
            backend,
            state: Mutex::new(CameraState {
                facing_mode,
                ..Default::default()
            }),
            listener: Mutex::new(None),
            stream_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn id(&self) -> &str {
        &self.info.device_id
    }

    pub fn name(&self) -> &str {
        &self.info.label
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn facing_mode(&self) -> Option<FacingMode> {
        self.state.lock().facing_mode
    }

    pub fn torch_supported(&self) -> bool {
        self.state.lock().torch_supported
    }

    pub fn torch_enabled(&self) -> bool {
        self.state.lock().torch_enabled
    }

    pub fn single_shot_supported(&self) -> bool {
        self.state.lock().single_shot_supported
    }

    /// The active stream, if one is running
    pub fn active_stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.state.lock().active_stream.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().active_stream.is_some()
    }

    /// Capabilities reported by the active stream
    pub fn stream_capabilities(&self) -> Option<TrackCapabilities> {
        self.state.lock().stream_capabilities.clone()
    }

    /// Register the change listener, replacing any previous one
    pub fn set_listener(&self, listener: DeviceListener) {
        *self.listener.lock() = Some(listener);
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn clear_listener(&self) {
        self.listener.lock().take();
    }

    /// Acquire a stream at the requested resolution
    ///
    /// Returns the existing stream if one is already active. After
    /// acquisition the torch and single-shot focus capabilities are detected
    /// and the facing is reconciled with what the stream reports.
    pub async fn start_stream(
        self: &Arc<Self>,
        resolution: VideoResolution,
    ) -> CameraResult<Arc<dyn MediaStream>> {
        let _guard = self.stream_lock.lock().await;

        if let Some(stream) = self.active_stream() {
            return Ok(stream);
        }

        let constraints =
            StreamConstraints::new(resolution, self.facing_mode(), Some(&self.info.device_id));

        // Can fail if the device is in use by another process
        let stream = self.backend.open_stream(&constraints).await?;
        let capabilities = stream.capabilities();

        info!(camera = %self.info.label, resolution = %resolution, "Started camera stream");

        let generation = {
            let mut state = self.state.lock();
            state.stream_generation += 1;
            state.active_stream = Some(Arc::clone(&stream));
            state.stream_capabilities = Some(capabilities.clone());
            state.stream_generation
        };
        self.emit_changed(
            DeviceField::ActiveStream,
            FieldValue::Bool(false),
            FieldValue::Bool(true),
        );

        if capabilities.torch {
            self.set_torch_supported(true);
        }
        if capabilities.supports_single_shot() {
            self.set_single_shot_supported(true);
        }
        self.reconcile_facing(&capabilities);

        let weak: Weak<Camera> = Arc::downgrade(self);
        stream.set_ended_handler(Box::new(move || {
            if let Some(camera) = weak.upgrade() {
                camera.handle_track_ended(generation);
            }
        }));

        Ok(stream)
    }

    /// Release all tracks and clear stream-derived state
    ///
    /// No-op when no stream is active.
    pub fn stop_stream(&self) {
        let stream = {
            let mut state = self.state.lock();
            let stream = state.active_stream.take();
            if stream.is_some() {
                state.stream_capabilities = None;
            }
            stream
        };

        let Some(stream) = stream else {
            return;
        };

        debug!(camera = %self.info.label, "Stopping active stream");
        stream.stop();

        self.emit_changed(
            DeviceField::ActiveStream,
            FieldValue::Bool(true),
            FieldValue::Bool(false),
        );
        self.set_torch_enabled(false);
    }

    /// Toggle the torch on the active stream
    ///
    /// # Returns
    /// * `Ok(enabled)` - New torch state
    /// * `Err(CameraError::TorchUnsupported)` - No torch was detected
    /// * `Err(CameraError::TorchToggleFailed)` - The hardware call failed; the
    ///   camera is marked as not torch-capable from now on
    pub async fn toggle_torch(&self) -> CameraResult<bool> {
        let Some(stream) = self.active_stream() else {
            warn!(camera = %self.info.label, "No active stream on camera");
            return Err(CameraError::NoActiveStream(self.info.label.clone()));
        };

        if !self.torch_supported() {
            return Err(CameraError::TorchUnsupported);
        }

        let target = !self.torch_enabled();

        match stream.apply_torch(target).await {
            Ok(()) => {
                self.set_torch_enabled(target);
                debug!(camera = %self.info.label, enabled = target, "Torch toggled");
                Ok(target)
            }
            Err(e) => {
                error!(camera = %self.info.label, error = %e, "Failed to toggle torch");
                self.set_torch_enabled(false);
                self.set_torch_supported(false);
                Err(CameraError::TorchToggleFailed(e.to_string()))
            }
        }
    }

    fn reconcile_facing(&self, capabilities: &TrackCapabilities) {
        let reports_back = capabilities.reports_facing(FacingMode::Back);
        let reports_front = capabilities.reports_facing(FacingMode::Front);

        match self.facing_mode() {
            Some(FacingMode::Front) if reports_back => {
                warn!(camera = %self.info.label, "Front camera selected, but facing mode is environment");
                self.set_facing_mode(Some(FacingMode::Back));
            }
            Some(FacingMode::Back) if reports_front => {
                warn!(camera = %self.info.label, "Back camera selected, but facing mode is user");
                self.set_facing_mode(Some(FacingMode::Front));
            }
            None if reports_front => self.set_facing_mode(Some(FacingMode::Front)),
            None if reports_back => self.set_facing_mode(Some(FacingMode::Back)),
            _ => {}
        }
    }

    fn handle_track_ended(&self, generation: u64) {
        if self.state.lock().stream_generation != generation {
            return;
        }

        warn!(camera = %self.info.label, "Camera track ended");
        self.stop_stream();
        self.emit(DeviceEvent::TrackEnded {
            device_id: self.info.device_id.clone(),
        });
    }

    fn set_facing_mode(&self, facing: Option<FacingMode>) {
        let old = std::mem::replace(&mut self.state.lock().facing_mode, facing);
        if old != facing {
            self.emit_changed(
                DeviceField::FacingMode,
                FieldValue::Facing(old),
                FieldValue::Facing(facing),
            );
        }
    }

    fn set_torch_supported(&self, value: bool) {
        let old = std::mem::replace(&mut self.state.lock().torch_supported, value);
        self.emit_bool_change(DeviceField::TorchSupported, old, value);
    }

    fn set_torch_enabled(&self, value: bool) {
        let old = std::mem::replace(&mut self.state.lock().torch_enabled, value);
        self.emit_bool_change(DeviceField::TorchEnabled, old, value);
    }

    fn set_single_shot_supported(&self, value: bool) {
        let old = std::mem::replace(&mut self.state.lock().single_shot_supported, value);
        self.emit_bool_change(DeviceField::SingleShotSupported, old, value);
    }

    fn emit_bool_change(&self, field: DeviceField, old: bool, new: bool) {
        if old != new {
            self.emit_changed(field, FieldValue::Bool(old), FieldValue::Bool(new));
        }
    }

    fn emit_changed(&self, field: DeviceField, old: FieldValue, new: FieldValue) {
        self.emit(DeviceEvent::Changed {
            device_id: self.info.device_id.clone(),
            field,
            old,
            new,
        });
    }

    fn emit(&self, event: DeviceEvent) {
        // Clone out of the lock so the listener may call back into the camera
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(&event);
        }
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Camera")
            .field("id", &self.info.device_id)
            .field("name", &self.info.label)
            .field("facing_mode", &state.facing_mode)
            .field("torch_supported", &state.torch_supported)
            .field("torch_enabled", &state.torch_enabled)
            .field("single_shot_supported", &state.single_shot_supported)
            .field("streaming", &state.active_stream.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::{VirtualDeviceSpec, VirtualMediaBackend};

    fn camera_for(spec: VirtualDeviceSpec) -> (Arc<Camera>, Arc<VirtualMediaBackend>) {
        let info = spec.device_info();
        let backend = Arc::new(VirtualMediaBackend::new(vec![spec]));
        (Camera::new(info, backend.clone()), backend)
    }

    fn recording_listener(camera: &Camera) -> Arc<Mutex<Vec<DeviceEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        camera.set_listener(Arc::new(move |event: &DeviceEvent| {
            sink.lock().push(event.clone());
        }));
        events
    }

    #[test]
    fn test_facing_inferred_from_label() {
        let (front, _) = camera_for(VirtualDeviceSpec::new("Front Camera"));
        let (back, _) = camera_for(VirtualDeviceSpec::new("camera2 0, facing back"));
        let (desk, _) = camera_for(VirtualDeviceSpec::new("Integrated Webcam"));

        assert_eq!(front.facing_mode(), Some(FacingMode::Front));
        assert_eq!(back.facing_mode(), Some(FacingMode::Back));
        assert_eq!(desk.facing_mode(), None);
    }

    #[tokio::test]
    async fn test_start_stream_is_idempotent() {
        let (camera, backend) = camera_for(VirtualDeviceSpec::new("Back Camera"));

        let first = camera.start_stream(VideoResolution::FHD).await.unwrap();
        let second = camera.start_stream(VideoResolution::FHD).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.open_count(), 1);
    }

    #[tokio::test]
    async fn test_capabilities_detected_after_start() {
        let spec = VirtualDeviceSpec::new("Back Camera")
            .reporting(FacingMode::Back)
            .with_torch()
            .with_single_shot();
        let (camera, _) = camera_for(spec);

        assert!(!camera.torch_supported());
        camera.start_stream(VideoResolution::FHD).await.unwrap();
        assert!(camera.torch_supported());
        assert!(camera.single_shot_supported());
    }

    #[tokio::test]
    async fn test_facing_corrected_from_stream_with_notification() {
        let spec = VirtualDeviceSpec::new("Front Camera").reporting(FacingMode::Back);
        let (camera, _) = camera_for(spec);
        let events = recording_listener(&camera);

        camera.start_stream(VideoResolution::HD).await.unwrap();

        assert_eq!(camera.facing_mode(), Some(FacingMode::Back));
        assert!(events.lock().iter().any(|event| matches!(
            event,
            DeviceEvent::Changed {
                field: DeviceField::FacingMode,
                old: FieldValue::Facing(Some(FacingMode::Front)),
                new: FieldValue::Facing(Some(FacingMode::Back)),
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_unknown_facing_filled_from_stream() {
        let spec = VirtualDeviceSpec::new("USB Camera").reporting(FacingMode::Front);
        let (camera, _) = camera_for(spec);

        camera.start_stream(VideoResolution::HD).await.unwrap();
        assert_eq!(camera.facing_mode(), Some(FacingMode::Front));
    }

    #[tokio::test]
    async fn test_device_in_use_is_unavailable() {
        let spec = VirtualDeviceSpec::new("Back Camera");
        let id = spec.device_id.clone();
        let (camera, backend) = camera_for(spec);
        backend.set_busy(&id, true);

        let err = camera.start_stream(VideoResolution::FHD).await.err().expect("expected error");
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
        assert!(!camera.is_streaming());
    }

    #[tokio::test]
    async fn test_stop_stream_is_noop_when_stopped() {
        let (camera, backend) = camera_for(VirtualDeviceSpec::new("Back Camera"));
        camera.stop_stream();

        camera.start_stream(VideoResolution::FHD).await.unwrap();
        assert_eq!(backend.active_stream_count(), 1);

        camera.stop_stream();
        camera.stop_stream();
        assert_eq!(backend.active_stream_count(), 0);
        assert!(camera.stream_capabilities().is_none());
    }

    #[tokio::test]
    async fn test_toggle_torch_without_support() {
        let (camera, _) = camera_for(VirtualDeviceSpec::new("Back Camera"));
        camera.start_stream(VideoResolution::FHD).await.unwrap();

        let err = camera.toggle_torch().await.unwrap_err();
        assert_eq!(err, CameraError::TorchUnsupported);
    }

    #[tokio::test]
    async fn test_toggle_torch_failure_disables_support() {
        let spec = VirtualDeviceSpec::new("Back Camera").with_torch();
        let id = spec.device_id.clone();
        let (camera, backend) = camera_for(spec);
        camera.start_stream(VideoResolution::FHD).await.unwrap();

        assert_eq!(camera.toggle_torch().await, Ok(true));

        backend.set_torch_failure(&id, true);
        let err = camera.toggle_torch().await.unwrap_err();
        assert!(matches!(err, CameraError::TorchToggleFailed(_)));
        assert!(!camera.torch_supported());
        assert!(!camera.torch_enabled());
    }

    #[tokio::test]
    async fn test_track_end_notifies_listener() {
        let spec = VirtualDeviceSpec::new("Back Camera");
        let id = spec.device_id.clone();
        let (camera, backend) = camera_for(spec);
        let events = recording_listener(&camera);

        camera.start_stream(VideoResolution::FHD).await.unwrap();
        backend.disconnect(&id);

        assert!(!camera.is_streaming());
        assert!(events.lock().iter().any(DeviceEvent::is_track_end));
    }
}
