// SPDX-License-Identifier: GPL-3.0-only

//! Stream lifecycle manager
//!
//! The manager provides:
//! - Device enumeration and best camera selection
//! - The `idle` / `playback` / `capturing` state machine
//! - The per-rendered-frame capture loop feeding registered callbacks
//! - A versioned state snapshot with field-level subscriptions
//!
//! Camera swaps and device refreshes are serialized with flags in the
//! snapshot. A request arriving while one is in flight is dropped and the
//! method returns `Ok(false)`.

use super::device::{Camera, DeviceEvent};
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::selector::select_best_camera;
use super::store::StateStore;
use super::types::{CameraFrame, FacingMode, PlaybackState, VideoResolution};
use super::{MediaBackend, VideoSink};
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::errors::{CameraError, CameraResult};
use crate::observers::{SubscriptionToken, Subscribers};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, trace, warn};

/// Callback receiving every captured frame while `capturing`
pub type FrameCaptureCallback = dyn Fn(Arc<CameraFrame>) -> BoxFuture<'static, ()> + Send + Sync;

/// Snapshot of the stream lifecycle
#[derive(Clone, Default)]
pub struct CameraManagerState {
    /// Every enumerated camera
    pub cameras: Vec<Arc<Camera>>,
    pub selected_camera: Option<Arc<Camera>>,
    pub playback_state: PlaybackState,
    /// Mirror the preview and captured frames horizontally
    pub mirror_x: bool,
    /// Acceptable facings; `None` entries match cameras of unknown facing
    pub facing_filter: Option<Vec<Option<FacingMode>>>,
    pub is_swapping_camera: bool,
    pub is_querying_cameras: bool,
    pub video_sink: Option<Arc<dyn VideoSink>>,
    pub error_state: Option<CameraError>,
}

impl CameraManagerState {
    /// Id of the selected camera
    pub fn selected_id(&self) -> Option<&str> {
        self.selected_camera.as_deref().map(Camera::id)
    }

    /// Cameras passing the facing filter
    pub fn filtered_cameras(&self) -> Vec<Arc<Camera>> {
        match &self.facing_filter {
            None => self.cameras.clone(),
            Some(filter) => self
                .cameras
                .iter()
                .filter(|camera| filter.contains(&camera.facing_mode()))
                .cloned()
                .collect(),
        }
    }
}

impl std::fmt::Debug for CameraManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraManagerState")
            .field("cameras", &self.cameras.len())
            .field("selected_camera", &self.selected_id())
            .field("playback_state", &self.playback_state)
            .field("mirror_x", &self.mirror_x)
            .field("facing_filter", &self.facing_filter)
            .field("is_swapping_camera", &self.is_swapping_camera)
            .field("is_querying_cameras", &self.is_querying_cameras)
            .field("video_sink", &self.video_sink.is_some())
            .field("error_state", &self.error_state)
            .finish()
    }
}

/// Which camera `start_camera_stream` should use when none is selected
#[derive(Debug, Clone, Default)]
pub enum CameraPreference {
    /// Select this camera
    Camera(Arc<Camera>),
    /// Pick the best camera with this facing
    Facing(FacingMode),
    /// Pick the best back camera
    #[default]
    Any,
}

/// Options for [`CameraManager::start_camera_stream`]
#[derive(Debug, Clone)]
pub struct StartStreamOptions {
    /// Start playback once the stream is bound
    pub autoplay: bool,
    pub preference: CameraPreference,
}

impl Default for StartStreamOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            preference: CameraPreference::Any,
        }
    }
}

struct ManagerInner {
    backend: Arc<dyn MediaBackend>,
    store: StateStore<CameraManagerState>,
    resolution: Mutex<VideoResolution>,
    /// Mode to restore once an in-flight camera swap completes
    resume_request: Mutex<Option<PlaybackState>>,
    frame_callbacks: Subscribers<FrameCaptureCallback>,
    frame_loop: Mutex<Option<CaptureLoopController>>,
    frames_delivered: AtomicU64,
    /// Whether user-facing cameras get `mirror_x` when their stream starts
    mirror_front_camera: AtomicBool,
}

/// Camera stream lifecycle manager
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct CameraManager {
    inner: Arc<ManagerInner>,
}

impl CameraManager {
    /// Create a manager on top of a media platform
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        info!("Creating camera manager");

        Self {
            inner: Arc::new(ManagerInner {
                backend,
                store: StateStore::new(CameraManagerState::default()),
                resolution: Mutex::new(VideoResolution::default()),
                resume_request: Mutex::new(None),
                frame_callbacks: Subscribers::new(),
                frame_loop: Mutex::new(None),
                frames_delivered: AtomicU64::new(0),
                mirror_front_camera: AtomicBool::new(true),
            }),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> CameraManagerState {
        self.inner.store.get()
    }

    /// Number of writes to the snapshot so far
    pub fn state_version(&self) -> u64 {
        self.inner.store.version()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.inner.store.with(|s| s.playback_state)
    }

    /// True if video is playing or capturing
    pub fn is_active(&self) -> bool {
        self.playback_state() != PlaybackState::Idle
    }

    pub fn resolution(&self) -> VideoResolution {
        *self.inner.resolution.lock()
    }

    /// Change the stream resolution
    ///
    /// An active stream is restarted at the new resolution and the previous
    /// playback mode is restored.
    pub async fn set_resolution(&self, resolution: VideoResolution) -> CameraResult<()> {
        *self.inner.resolution.lock() = resolution;

        let previous = self.playback_state();
        if previous == PlaybackState::Idle {
            return Ok(());
        }

        info!(resolution = %resolution, mode = %previous, "Restarting stream at new resolution");
        self.stop_stream();
        self.start_camera_stream(StartStreamOptions::default())
            .await?;

        if previous == PlaybackState::Capturing {
            self.start_frame_capture().await?;
        }
        Ok(())
    }

    pub fn set_facing_filter(&self, facing_filter: Option<Vec<Option<FacingMode>>>) {
        debug!(filter = ?facing_filter, "Facing filter changed");
        self.inner.store.update(|s| s.facing_filter = facing_filter);
    }

    /// Cameras available to the user, filtered by the facing filter
    pub fn cameras(&self) -> Vec<Arc<Camera>> {
        let state = self.state();
        if state.cameras.is_empty() {
            warn!("No cameras available, try calling refresh_camera_devices first");
        }
        state.filtered_cameras()
    }

    /// Mount the video sink frames are read from
    pub fn attach_video_sink(&self, sink: Arc<dyn VideoSink>) {
        debug!("Video sink attached");
        self.inner.store.update(|s| s.video_sink = Some(sink));
    }

    /// Dismount the video sink, stopping the stream
    pub fn detach_video_sink(&self) {
        self.stop_stream();
        self.inner.store.update(|s| s.video_sink = None);
        debug!("Video sink detached");
    }

    /// React to the host becoming hidden or visible
    ///
    /// Hidden while active stops the stream. Becoming visible restarts it
    /// when a camera has been selected before.
    pub async fn handle_visibility_change(&self, hidden: bool) -> CameraResult<()> {
        if hidden {
            if self.is_active() {
                info!("Host hidden, stopping stream");
                self.stop_stream();
            }
            return Ok(());
        }

        let (has_sink, has_camera) = self
            .inner
            .store
            .with(|s| (s.video_sink.is_some(), s.selected_camera.is_some()));
        if has_sink && has_camera && !self.is_active() {
            info!("Host visible, restarting stream");
            self.start_camera_stream(StartStreamOptions::default())
                .await?;
        }
        Ok(())
    }

    /// Register a frame callback invoked for every frame while capturing
    ///
    /// Callbacks run concurrently and without back-pressure.
    pub fn add_frame_capture_callback<F>(&self, callback: F) -> SubscriptionToken
    where
        F: Fn(Arc<CameraFrame>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.inner.frame_callbacks.add(Arc::new(callback))
    }

    pub fn remove_frame_capture_callback(&self, token: SubscriptionToken) -> bool {
        self.inner.frame_callbacks.remove(token)
    }

    /// Select a camera
    ///
    /// Does not change the playback state: if video was playing or
    /// capturing, the same mode is resumed on the new camera.
    ///
    /// # Returns
    /// * `Ok(true)` - The camera was selected
    /// * `Ok(false)` - Already selected, or another swap is in flight
    pub async fn select_camera(&self, camera: Arc<Camera>) -> CameraResult<bool> {
        let state = self.state();

        if state
            .selected_camera
            .as_ref()
            .is_some_and(|selected| Arc::ptr_eq(selected, &camera))
        {
            debug!(camera = %camera.name(), "Already selected");
            return Ok(false);
        }

        let acquired = self.inner.store.update(|s| {
            if s.is_swapping_camera {
                false
            } else {
                s.is_swapping_camera = true;
                true
            }
        });
        if !acquired {
            debug!(camera = %camera.name(), "Already swapping camera");
            return Ok(false);
        }

        if state.playback_state != PlaybackState::Idle {
            *self.inner.resume_request.lock() = Some(state.playback_state);
        }

        self.stop_frame_loop();

        if let Some(previous) = &state.selected_camera
            && previous.is_streaming()
        {
            debug!(camera = %previous.name(), "Stopping previous stream");
            previous.stop_stream();
        }

        if let Some(sink) = &state.video_sink {
            sink.set_source(None);
        }

        info!(camera = %camera.name(), "Selected camera");
        self.inner.store.update(|s| {
            s.selected_camera = Some(Arc::clone(&camera));
            s.is_swapping_camera = false;
        });

        let resume = *self.inner.resume_request.lock();
        let result = match resume {
            Some(PlaybackState::Playback) => {
                debug!("Resuming playback");
                self.start_playback().await
            }
            Some(PlaybackState::Capturing) => {
                debug!("Resuming frame capture");
                self.start_frame_capture().await
            }
            _ => Ok(()),
        };
        *self.inner.resume_request.lock() = None;

        result.map(|()| true)
    }

    /// Re-enumerate camera devices
    ///
    /// Devices still present keep their [`Camera`] handle and stream.
    /// Vanished devices are stopped and dropped.
    ///
    /// # Returns
    /// * `Ok(true)` - The device list was refreshed
    /// * `Ok(false)` - A refresh or swap is already in flight
    pub async fn refresh_camera_devices(&self) -> CameraResult<bool> {
        let acquired = self.inner.store.update(|s| {
            if s.is_querying_cameras || s.is_swapping_camera {
                false
            } else {
                s.is_querying_cameras = true;
                true
            }
        });
        if !acquired {
            debug!("Already querying cameras");
            return Ok(false);
        }

        match self.query_cameras().await {
            Ok(cameras) => {
                info!(count = cameras.len(), "Camera devices refreshed");
                self.inner.store.update(|s| {
                    s.cameras = cameras;
                    s.is_querying_cameras = false;
                });
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "Failed to enumerate cameras");
                self.inner.store.update(|s| s.is_querying_cameras = false);
                Err(e)
            }
        }
    }

    async fn query_cameras(&self) -> CameraResult<Vec<Arc<Camera>>> {
        self.inner.backend.request_permission().await?;
        let devices = self.inner.backend.enumerate_devices().await?;

        let (existing, selected) = self
            .inner
            .store
            .with(|s| (s.cameras.clone(), s.selected_camera.clone()));

        let cameras: Vec<Arc<Camera>> = devices
            .into_iter()
            .map(|info| {
                existing
                    .iter()
                    .find(|camera| camera.id() == info.device_id)
                    .cloned()
                    .unwrap_or_else(|| Camera::new(info, Arc::clone(&self.inner.backend)))
            })
            .collect();

        for camera in &existing {
            if !cameras.iter().any(|c| Arc::ptr_eq(c, camera)) {
                debug!(camera = %camera.name(), "Camera vanished");
                camera.stop_stream();
                camera.clear_listener();
            }
        }

        if let Some(selected) = selected
            && !cameras.iter().any(|c| Arc::ptr_eq(c, &selected))
        {
            warn!(camera = %selected.name(), "Selected camera vanished");
            self.pause_playback();
            self.inner.store.update(|s| s.selected_camera = None);
        }

        for camera in &cameras {
            // Avoid reassigning listeners
            if camera.has_listener() {
                continue;
            }
            let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
            camera.set_listener(Arc::new(move |event: &DeviceEvent| {
                if let Some(inner) = weak.upgrade() {
                    CameraManager { inner }.handle_device_event(event);
                }
            }));
        }

        Ok(cameras)
    }

    fn handle_device_event(&self, event: &DeviceEvent) {
        let is_selected = self
            .inner
            .store
            .with(|s| s.selected_id() == Some(event.device_id()));

        if is_selected && event.is_track_end() {
            error!(device_id = %event.device_id(), "Camera stream ended unexpectedly");
            self.pause_playback();
            if let Some(sink) = self.inner.store.with(|s| s.video_sink.clone()) {
                sink.set_source(None);
            }
            self.inner
                .store
                .update(|s| s.error_state = Some(CameraError::StreamEnded));
            return;
        }

        trace!(event = ?event, "Camera changed");
        // Camera handles are shared, so a version bump is enough to re-render
        self.inner.store.touch();
    }

    /// Start video playback (`idle -> playback`)
    ///
    /// Acquires a stream on the selected camera if none is active. A sink
    /// that refuses to play leaves the state `idle` and records the error.
    pub async fn start_playback(&self) -> CameraResult<()> {
        let state = self.state();

        if state.playback_state != PlaybackState::Idle
            && self.inner.resume_request.lock().is_none()
        {
            return Ok(());
        }

        let Some(sink) = state.video_sink else {
            warn!("Starting playback - no video sink present");
            return Err(CameraError::NoVideoSink);
        };

        let Some(camera) = state.selected_camera else {
            warn!("Select a camera first");
            return Err(CameraError::NoCameraSelected);
        };

        if !camera.is_streaming() || !sink.has_source() {
            let stream = camera.start_stream(self.resolution()).await?;
            sink.set_source(Some(stream));
        }

        match sink.play().await {
            Ok(()) => {
                self.inner.store.update(|s| {
                    if s.playback_state == PlaybackState::Idle {
                        s.playback_state = PlaybackState::Playback;
                    }
                });
                info!(camera = %camera.name(), "Playback started");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to start playback");
                self.stop_frame_loop();
                self.inner.store.update(|s| {
                    s.playback_state = PlaybackState::Idle;
                    s.error_state = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    /// Start playback and frame capture (`* -> capturing`)
    ///
    /// Idempotent while already capturing: the frame loop is never
    /// scheduled twice.
    pub async fn start_frame_capture(&self) -> CameraResult<()> {
        let state = self.state();
        let resuming = *self.inner.resume_request.lock() == Some(PlaybackState::Capturing);

        if state.playback_state == PlaybackState::Capturing && !resuming {
            return Ok(());
        }

        if state.video_sink.is_none() {
            warn!("Missing video sink");
            return Err(CameraError::NoVideoSink);
        }

        if state.selected_camera.is_none() {
            warn!("No active camera, select a camera first or use start_camera_stream");
            return Err(CameraError::NoCameraSelected);
        }

        self.start_playback().await?;

        self.inner
            .store
            .update(|s| s.playback_state = PlaybackState::Capturing);
        self.start_frame_loop();
        *self.inner.resume_request.lock() = None;

        info!("Frame capture started");
        Ok(())
    }

    /// Start a best-effort camera stream
    ///
    /// Picks a camera automatically if none is selected, binds its stream to
    /// the sink and starts playback when `autoplay` is set. Selection errors
    /// are recorded in `error_state` and returned.
    pub async fn start_camera_stream(&self, options: StartStreamOptions) -> CameraResult<()> {
        let Some(sink) = self.inner.store.with(|s| s.video_sink.clone()) else {
            warn!("Can't start stream without a video sink");
            return Err(CameraError::NoVideoSink);
        };

        if self.is_active() && self.inner.resume_request.lock().is_none() {
            warn!("Already streaming");
            return Ok(());
        }

        let preferred_facing = match options.preference {
            CameraPreference::Camera(camera) => {
                self.select_camera(camera).await?;
                None
            }
            CameraPreference::Facing(facing) => Some(facing),
            CameraPreference::Any => None,
        };

        if self.inner.store.with(|s| s.selected_camera.is_none())
            && let Err(e) = self.select_ideal_camera(preferred_facing).await
        {
            self.inner.store.update(|s| s.error_state = Some(e.clone()));
            return Err(e);
        }

        let Some(camera) = self.inner.store.with(|s| s.selected_camera.clone()) else {
            warn!("No selected camera");
            return Err(CameraError::NoCameraSelected);
        };

        let stream = camera.start_stream(self.resolution()).await?;
        sink.set_source(Some(stream));

        // Desktop cameras report no facing and are assumed to face the user
        let mirror_x = self.inner.mirror_front_camera.load(Ordering::Relaxed)
            && camera.facing_mode() != Some(FacingMode::Back);
        self.inner.store.update(|s| {
            s.mirror_x = mirror_x;
            s.error_state = None;
        });

        if options.autoplay {
            self.start_playback().await?;
        }
        Ok(())
    }

    async fn select_ideal_camera(&self, facing: Option<FacingMode>) -> CameraResult<()> {
        debug!(facing = ?facing, "Searching for the best camera");

        if self.inner.store.with(|s| s.cameras.is_empty()) {
            self.refresh_camera_devices().await?;
        }

        if self.inner.store.with(|s| s.cameras.is_empty()) {
            return Err(CameraError::NoCamerasAvailable);
        }

        let cameras = self.cameras();
        let camera = select_best_camera(&cameras, self.resolution(), facing).await?;
        self.select_camera(camera).await?;
        Ok(())
    }

    /// Pause frame capture while video keeps playing (`capturing -> playback`)
    pub fn stop_frame_capture(&self) {
        self.stop_frame_loop();
        self.inner.store.update(|s| {
            if s.playback_state == PlaybackState::Capturing {
                s.playback_state = PlaybackState::Playback;
            }
        });
        debug!("Frame capture stopped");
    }

    /// Stop playback and capture (`* -> idle`)
    pub fn pause_playback(&self) {
        self.stop_frame_loop();
        self.inner
            .store
            .update(|s| s.playback_state = PlaybackState::Idle);

        if let Some(sink) = self.inner.store.with(|s| s.video_sink.clone()) {
            sink.pause();
        }
        debug!("Playback paused");
    }

    /// Pause playback, release the selected camera's stream and clear the sink
    pub fn stop_stream(&self) {
        self.pause_playback();

        let (camera, sink) = self
            .inner
            .store
            .with(|s| (s.selected_camera.clone(), s.video_sink.clone()));

        if let Some(camera) = camera {
            camera.stop_stream();
        }
        if let Some(sink) = sink {
            sink.set_source(None);
        }
        info!("Stream stopped");
    }

    /// Mirror video and captured frames horizontally
    pub fn set_mirror_x(&self, mirror_x: bool) {
        self.inner.store.update(|s| s.mirror_x = mirror_x);
    }

    /// Mirror user-facing cameras from the next stream start on
    ///
    /// On by default. Turning it off also clears `mirror_x` for the current
    /// stream.
    pub fn set_mirror_front_camera(&self, enabled: bool) {
        self.inner
            .mirror_front_camera
            .store(enabled, Ordering::Relaxed);
        if !enabled {
            self.set_mirror_x(false);
        }
    }

    /// Subscribe to every state write with `(new, old)`
    pub fn subscribe(
        &self,
        listener: impl Fn(&CameraManagerState, &CameraManagerState) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        self.inner.store.subscribe(listener)
    }

    /// Subscribe to playback state changes with `(new, old)`
    pub fn subscribe_playback_state(
        &self,
        listener: impl Fn(PlaybackState, PlaybackState) + Send + Sync + 'static,
    ) -> SubscriptionToken {
        self.inner.store.subscribe_field(
            |s: &CameraManagerState| s.playback_state,
            move |new, old| listener(*new, *old),
        )
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.inner.store.unsubscribe(token)
    }

    /// Reset the manager and stop all streams
    pub fn destroy(&self) {
        info!("Destroying camera manager");
        self.inner.frame_callbacks.clear();
        self.stop_stream();

        for camera in self.inner.store.with(|s| s.cameras.clone()) {
            camera.stop_stream();
            camera.clear_listener();
        }

        *self.inner.resume_request.lock() = None;
        self.inner.store.reset();
        self.inner.store.clear_subscribers();
    }

    fn start_frame_loop(&self) {
        let weak = Arc::downgrade(&self.inner);
        let controller = CaptureLoopController::start("frame-capture", move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.capture_iteration().await,
                    None => LoopAction::Stop,
                }
            }
        });

        let previous = self.inner.frame_loop.lock().replace(controller);
        drop(previous);
    }

    fn stop_frame_loop(&self) {
        let controller = self.inner.frame_loop.lock().take();
        if let Some(mut controller) = controller {
            if !controller.is_running() {
                debug!("Frame loop had already exited");
            }
            controller.stop();
        }
    }
}

impl ManagerInner {
    /// One loop iteration: wait for a rendered frame and fan it out
    async fn capture_iteration(&self) -> LoopAction {
        let (playback_state, sink, mirror_x) = self
            .store
            .with(|s| (s.playback_state, s.video_sink.clone(), s.mirror_x));

        if playback_state != PlaybackState::Capturing {
            return LoopAction::Stop;
        }

        let Some(sink) = sink else {
            error!("Missing video sink");
            return LoopAction::Stop;
        };

        let Some(frame) = sink.next_frame().await else {
            debug!("Video sink stopped delivering frames");
            return LoopAction::Stop;
        };

        // The state may have left capturing while waiting for the frame
        if self.store.with(|s| s.playback_state) != PlaybackState::Capturing {
            return LoopAction::Stop;
        }

        let callbacks = self.frame_callbacks.snapshot();
        if callbacks.is_empty() {
            return LoopAction::Continue;
        }

        let delivered = self.frames_delivered.fetch_add(1, Ordering::Relaxed) + 1;
        if delivered % FRAME_LOG_INTERVAL == 0 {
            debug!(frames = delivered, sequence = frame.sequence, "Delivering frames");
        }

        let frame = Arc::new(if mirror_x { frame.mirrored() } else { frame });
        for callback in callbacks {
            tokio::spawn(callback(Arc::clone(&frame)));
        }
        LoopAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::{DeviceProfile, VirtualMediaBackend, VirtualVideoSink};

    fn manager_with(profile: DeviceProfile) -> (CameraManager, Arc<VirtualMediaBackend>, Arc<VirtualVideoSink>) {
        let backend = Arc::new(VirtualMediaBackend::from_profile(profile));
        let sink = Arc::new(VirtualVideoSink::new());
        let manager = CameraManager::new(backend.clone());
        manager.attach_video_sink(sink.clone());
        (manager, backend, sink)
    }

    #[tokio::test]
    async fn test_refresh_keeps_camera_handles() {
        let (manager, _, _) = manager_with(DeviceProfile::Iphone15);

        assert!(manager.refresh_camera_devices().await.unwrap());
        let first = manager.state().cameras;
        assert!(manager.refresh_camera_devices().await.unwrap());
        let second = manager.state().cameras;

        assert_eq!(first.len(), 4);
        assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
        assert!(!manager.state().is_querying_cameras);
    }

    #[tokio::test]
    async fn test_refresh_error_resets_flag() {
        let (manager, backend, _) = manager_with(DeviceProfile::Desktop);
        backend.set_permission_denied(true);

        let err = manager.refresh_camera_devices().await.unwrap_err();
        assert_eq!(err, CameraError::PermissionDenied);
        assert!(!manager.state().is_querying_cameras);
    }

    #[tokio::test]
    async fn test_facing_filter() {
        let (manager, _, _) = manager_with(DeviceProfile::SamsungS21Fe);
        manager.refresh_camera_devices().await.unwrap();

        manager.set_facing_filter(Some(vec![Some(FacingMode::Front)]));
        assert_eq!(manager.cameras().len(), 2);

        manager.set_facing_filter(None);
        assert_eq!(manager.cameras().len(), 4);
    }

    #[tokio::test]
    async fn test_start_camera_stream_selects_and_plays() {
        let (manager, _, sink) = manager_with(DeviceProfile::Iphone15);

        manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap();

        let state = manager.state();
        assert_eq!(state.playback_state, PlaybackState::Playback);
        assert_eq!(state.selected_id(), Some("iphone15-back-dual-wide"));
        assert!(!state.mirror_x);
        assert!(sink.is_playing());
    }

    #[tokio::test]
    async fn test_front_camera_is_mirrored() {
        let (manager, _, _) = manager_with(DeviceProfile::SamsungS21Fe);

        manager
            .start_camera_stream(StartStreamOptions {
                autoplay: false,
                preference: CameraPreference::Facing(FacingMode::Front),
            })
            .await
            .unwrap();

        let state = manager.state();
        assert!(state.mirror_x);
        assert_eq!(state.playback_state, PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_start_playback_requires_sink_and_camera() {
        let backend = Arc::new(VirtualMediaBackend::from_profile(DeviceProfile::Desktop));
        let manager = CameraManager::new(backend);

        assert_eq!(manager.start_playback().await, Err(CameraError::NoVideoSink));

        manager.attach_video_sink(Arc::new(VirtualVideoSink::new()));
        assert_eq!(
            manager.start_playback().await,
            Err(CameraError::NoCameraSelected)
        );
    }

    #[tokio::test]
    async fn test_rejected_playback_stays_idle() {
        let (manager, _, sink) = manager_with(DeviceProfile::Desktop);
        sink.set_reject_play(true);

        let err = manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CameraError::PlaybackFailed(_)));
        let state = manager.state();
        assert_eq!(state.playback_state, PlaybackState::Idle);
        assert_eq!(state.error_state, Some(err));
    }

    #[tokio::test]
    async fn test_no_cameras_recorded_as_error() {
        let backend = Arc::new(VirtualMediaBackend::new(Vec::new()));
        let manager = CameraManager::new(backend);
        manager.attach_video_sink(Arc::new(VirtualVideoSink::new()));

        let err = manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, CameraError::NoCamerasAvailable);
        assert_eq!(manager.state().error_state, Some(err));
    }

    #[tokio::test]
    async fn test_stop_stream_releases_camera() {
        let (manager, backend, sink) = manager_with(DeviceProfile::Desktop);
        manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap();

        manager.stop_stream();

        assert_eq!(manager.playback_state(), PlaybackState::Idle);
        assert_eq!(backend.active_stream_count(), 0);
        assert!(!sink.has_source());
    }

    #[tokio::test]
    async fn test_select_same_camera_is_noop() {
        let (manager, _, _) = manager_with(DeviceProfile::Desktop);
        manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap();

        let selected = manager.state().selected_camera.unwrap();
        assert!(!manager.select_camera(selected).await.unwrap());
    }

    #[tokio::test]
    async fn test_playback_subscription() {
        let (manager, _, _) = manager_with(DeviceProfile::Desktop);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.subscribe_playback_state(move |new, old| sink.lock().push((old, new)));

        manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap();
        manager.pause_playback();

        assert_eq!(
            *seen.lock(),
            vec![
                (PlaybackState::Idle, PlaybackState::Playback),
                (PlaybackState::Playback, PlaybackState::Idle),
            ]
        );
    }

    #[tokio::test]
    async fn test_destroy_resets_state() {
        let (manager, backend, _) = manager_with(DeviceProfile::Iphone15);
        manager
            .start_camera_stream(StartStreamOptions::default())
            .await
            .unwrap();

        manager.destroy();

        let state = manager.state();
        assert!(state.cameras.is_empty());
        assert!(state.selected_camera.is_none());
        assert!(state.video_sink.is_none());
        assert_eq!(backend.active_stream_count(), 0);
    }
}
